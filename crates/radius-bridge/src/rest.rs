//! FreeRADIUS `rlm_rest` JSON encoding
//!
//! Requests arrive as an object keyed by attribute name, each value either
//! `{"type": "...", "value": [...]}`, a bare scalar, or an array of scalars.
//! Responses use `{"reply:Name": {"op": "+=", "value": [...]}}`, with `op`
//! `:=` for the control list. The HTTP status carries the return code.

use crate::error::{BridgeError, BridgeResult};
use crate::hook::{PhaseResponse, Rcode};
use axum::http::StatusCode;
use radius_proto::AttributeList;
use serde_json::{Map, Value, json};

/// List prefixes whose attributes the bridge reads
const ACCEPTED_LISTS: [&str; 2] = ["request", "control"];

/// Decode an rlm_rest request body into an attribute list
pub fn parse_attributes(body: &[u8]) -> BridgeResult<AttributeList> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(BridgeError::malformed("empty request body"));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| BridgeError::malformed(format!("request body is not JSON: {}", e)))?;
    let Value::Object(object) = value else {
        return Err(BridgeError::malformed("request body is not a JSON object"));
    };

    let mut attributes = AttributeList::new();
    for (key, value) in object {
        let name = match key.split_once(':') {
            Some((list, name)) if ACCEPTED_LISTS.contains(&list) => name,
            Some(_) => continue,
            None => key.as_str(),
        };
        if name.is_empty() {
            return Err(BridgeError::malformed("empty attribute name"));
        }

        let values = match value {
            Value::Object(mut typed) => typed
                .remove("value")
                .ok_or_else(|| BridgeError::malformed(format!("{} has no value", name)))?,
            other => other,
        };

        match values {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar(name, item)? {
                        attributes.push(name, text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar(name, other)? {
                    attributes.push(name, text);
                }
            }
        }
    }

    Ok(attributes)
}

fn scalar(name: &str, value: Value) -> BridgeResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(BridgeError::malformed(format!(
            "{} has a nested value",
            name
        ))),
    }
}

fn append(body: &mut Map<String, Value>, list: &str, op: &str, attributes: &AttributeList) {
    for pair in attributes {
        let entry = body
            .entry(format!("{}:{}", list, pair.name))
            .or_insert_with(|| json!({"op": op, "value": []}));
        if let Some(Value::Array(values)) = entry.get_mut("value") {
            values.push(Value::String(pair.value.clone()));
        }
    }
}

/// Encode the attribute updates of a phase response, `None` when empty
pub fn render(response: &PhaseResponse) -> Option<Value> {
    if !response.has_attributes() {
        return None;
    }

    let mut body = Map::new();
    append(&mut body, "reply", "+=", &response.reply);
    append(&mut body, "control", ":=", &response.control);
    Some(Value::Object(body))
}

/// HTTP status rlm_rest maps back to the module return code
pub fn status_code(response: &PhaseResponse) -> StatusCode {
    match response.rcode {
        Rcode::Ok | Rcode::Updated if response.has_attributes() => StatusCode::OK,
        Rcode::Ok | Rcode::Updated | Rcode::Noop => StatusCode::NO_CONTENT,
        Rcode::Reject => StatusCode::UNAUTHORIZED,
        Rcode::NotFound => StatusCode::NOT_FOUND,
        Rcode::Fail => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
