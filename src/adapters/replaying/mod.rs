//! Replaying adapters that serve recorded interactions.

pub mod llm;

use serde::de::DeserializeOwned;

pub use llm::ReplayingLlmClient;

/// Decode a recorded `{"Ok": v}` / `{"Err": "message"}` output.
///
/// Mirror of `recording::record_result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(err) = output.get("Err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = match output {
        serde_json::Value::Object(mut map) if map.contains_key("Ok") => {
            map.remove("Ok").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}
