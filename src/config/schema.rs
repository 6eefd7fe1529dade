use super::Config;

/// JSON Schema of the config file, for editors and front ends.
pub fn json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(schema).unwrap_or_default()
}
