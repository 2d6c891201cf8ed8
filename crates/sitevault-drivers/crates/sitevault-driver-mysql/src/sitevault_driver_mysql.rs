//! MySQL/MariaDB driver implementation

mod connection;
mod driver;
mod params;
mod schema;

pub use connection::{MySqlConnection, MySqlTransaction};
pub use driver::MySqlDriver;
pub use params::{interpolate_params, value_to_mysql_literal};
