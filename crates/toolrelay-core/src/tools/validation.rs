//! Descriptor checks applied when the routing table is built

use serde_json::Value;

use crate::types::ToolDescriptor;

/// Longest tool name model services accept
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Check a tool name against `^[A-Za-z0-9_-]{1,64}$`
pub fn validate_tool_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("tool name is empty".to_string());
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        return Err(format!(
            "tool name is {} characters, limit is {}",
            name.len(),
            MAX_TOOL_NAME_LEN
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("tool name contains invalid character {:?}", c));
    }
    Ok(())
}

/// The input schema must be a JSON object, and an object-typed one if it
/// declares a type at all
pub fn validate_input_schema(schema: &Value) -> Result<(), String> {
    let object = schema
        .as_object()
        .ok_or_else(|| "input schema is not a JSON object".to_string())?;

    match object.get("type") {
        None => Ok(()),
        Some(Value::String(t)) if t == "object" => Ok(()),
        Some(other) => Err(format!("input schema type must be \"object\", got {}", other)),
    }
}

/// Validate a whole descriptor, returning the first problem found
pub fn validate_descriptor(tool: &ToolDescriptor) -> Result<(), String> {
    validate_tool_name(&tool.name)?;
    validate_input_schema(&tool.input_schema)
}
