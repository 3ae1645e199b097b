//! Environment overrides.
//!
//! `TSDNSPROXY_PROXY__LISTEN_ADDR=:5353` sets `proxy.listen_addr`. Values are
//! read as TOML literals (`10`, `true`, `["a", "b"]`) and otherwise as plain
//! strings.

use super::errors::ConfigError;
use toml::{Table, Value};

pub const ENV_PREFIX: &str = "TSDNSPROXY_";
const NESTING_SEPARATOR: &str = "__";

/// Applies matching variables to a raw config table. Returns how many were applied.
pub fn apply_env_overrides<I, K, V>(table: &mut Table, vars: I) -> Result<usize, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut applied = 0;
    for (key, value) in vars {
        let Some(path) = key.as_ref().strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = path
            .split(NESTING_SEPARATOR)
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(format!(
                "Malformed environment override '{}'",
                key.as_ref()
            )));
        }
        set_path(table, &segments, parse_value(value.as_ref()), key.as_ref())?;
        applied += 1;
    }
    Ok(applied)
}

fn set_path(
    table: &mut Table,
    segments: &[String],
    value: Value,
    var: &str,
) -> Result<(), ConfigError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Table(Table::new()));
        current = match entry {
            Value::Table(t) => t,
            _ => {
                return Err(ConfigError::Validation(format!(
                    "Environment override '{}' descends into non-table key '{}'",
                    var, segment
                )))
            }
        };
    }
    current.insert(last.clone(), value);
    Ok(())
}

fn parse_value(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
