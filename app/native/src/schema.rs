//! JSON Schema for the configuration file.

use crate::config::HinotesConfig;

/// Generates the JSON Schema describing [`HinotesConfig`].
#[must_use]
pub fn generate_schema() -> schemars::Schema { schemars::schema_for!(HinotesConfig) }

/// Returns the schema as pretty-printed JSON.
#[must_use]
pub fn print_schema() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_else(|_| "{}".to_string())
}
