//! Schema checks for Scribe JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &["$schema", "vault", "orchestrator", "tools", "context"],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("vault") {
        validate_vault(value, layer, "vault")?;
    }
    if let Some(value) = map.get("orchestrator") {
        validate_orchestrator(value, layer, "orchestrator")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("context") {
        validate_context(value, layer, "context")?;
    }
    Ok(())
}

fn validate_vault(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["root", "protected_prefixes", "tasks_file"], layer, path)?;
    if let Some(value) = map.get("root") {
        expect_string(value, layer, &join_path(path, "root"))?;
    }
    if let Some(value) = map.get("protected_prefixes") {
        validate_string_array(value, layer, &join_path(path, "protected_prefixes"))?;
    }
    if let Some(value) = map.get("tasks_file") {
        expect_string(value, layer, &join_path(path, "tasks_file"))?;
    }
    Ok(())
}

fn validate_orchestrator(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["max_rounds", "system_prompt", "context_limit", "max_tokens_hint"],
        layer,
        path,
    )?;
    for key in ["max_rounds", "context_limit", "max_tokens_hint"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("system_prompt") {
        expect_string(value, layer, &join_path(path, "system_prompt"))?;
    }
    Ok(())
}

fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["policy", "max_result_chars"], layer, path)?;
    if let Some(value) = map.get("policy") {
        let policy_path = join_path(path, "policy");
        let policy = expect_object(value, layer, &policy_path)?;
        ensure_allowed_keys(policy, &["allow", "deny"], layer, &policy_path)?;
        for key in ["allow", "deny"] {
            if let Some(value) = policy.get(key) {
                validate_string_array(value, layer, &join_path(&policy_path, key))?;
            }
        }
    }
    if let Some(value) = map.get("max_result_chars") {
        expect_u64(value, layer, &join_path(path, "max_result_chars"))?;
    }
    Ok(())
}

fn validate_context(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["strategy", "index_queue_capacity"], layer, path)?;
    if let Some(value) = map.get("strategy") {
        let strategy_path = join_path(path, "strategy");
        match value.as_str() {
            Some("keyword") | Some("semantic") => {}
            Some(_) => {
                return Err(invalid_field(
                    layer,
                    &strategy_path,
                    "expected one of: keyword, semantic",
                ));
            }
            None => return Err(invalid_field(layer, &strategy_path, "expected string")),
        }
    }
    if let Some(value) = map.get("index_queue_capacity") {
        expect_u64(value, layer, &join_path(path, "index_queue_capacity"))?;
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(items) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    for (idx, item) in items.iter().enumerate() {
        expect_string(item, layer, &format!("{path}[{idx}]"))?;
    }
    Ok(())
}

/// Reject keys the schema does not know.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
