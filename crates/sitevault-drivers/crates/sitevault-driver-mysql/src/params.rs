//! Client-side parameter binding for the MySQL text protocol

use sitevault_core::{Result, Value, VaultError};

/// Render a value as a MySQL SQL literal
pub fn value_to_mysql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float32(v) if v.is_finite() => v.to_string(),
        Value::Float64(v) if v.is_finite() => v.to_string(),
        Value::Float32(v) => quote_string(&v.to_string()),
        Value::Float64(v) => quote_string(&v.to_string()),
        Value::Decimal(v) => quote_string(v),
        Value::String(v) => quote_string(v),
        Value::Bytes(v) => {
            let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
            format!("X'{}'", hex)
        }
        Value::Json(v) => quote_string(&v.to_string()),
        Value::DateTimeUtc(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Date(v) => format!("'{}'", v),
        Value::Time(v) => format!("'{}'", v),
        Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S%.f")),
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Replace each `?` placeholder outside quoted regions with the matching literal.
///
/// Quoted strings (`'…'`, `"…"`) and backtick identifiers are copied through untouched,
/// so a `?` inside a value or a column name is never treated as a placeholder.
pub fn interpolate_params(sql: &str, params: &[Value]) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut next = params.iter();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' && q != '`' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    // A doubled quote stays inside the literal.
                    if chars.peek() == Some(&q) {
                        if let Some(doubled) = chars.next() {
                            out.push(doubled);
                        }
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    let value = next.next().ok_or_else(|| {
                        VaultError::Query(format!(
                            "Statement has more placeholders than the {} supplied parameters",
                            params.len()
                        ))
                    })?;
                    out.push_str(&value_to_mysql_literal(value));
                }
                _ => out.push(c),
            },
        }
    }

    let unused = next.count();
    if unused > 0 {
        return Err(VaultError::Query(format!(
            "{} parameter(s) were supplied without a matching placeholder",
            unused
        )));
    }
    Ok(out)
}
