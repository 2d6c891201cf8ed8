//! SiteVault Core - shared database abstractions for the backup engine
//!
//! Every other SiteVault crate builds on the traits and types defined here:
//!
//! - `DatabaseDriver` - opens connections from a `ConnectionConfig`
//! - `Connection` / `Transaction` - statement execution against one session
//! - `SchemaIntrospection` - catalog queries (tables, columns)
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod driver;
mod error;
mod schema;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use types::*;
