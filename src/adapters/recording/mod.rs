//! Recording adapters that capture interactions to cassettes.

pub mod llm;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

pub use llm::RecordingLlmClient;

/// Record a `Result<T, E>` interaction and flush the cassette to disk.
///
/// Convention, mirrored by `replaying::replay_result`:
/// - `Ok(v)` is serialized as `{"Ok": v}`
/// - `Err(e)` is serialized as `{"Err": e.to_string()}`
///
/// Recording is best effort: serialization or write failures are logged and
/// never change the result handed back to the caller.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let input_json = match serde_json::to_value(input) {
        Ok(value) => value,
        Err(e) => {
            warn!(port, method, error = %e, "failed to serialize recording input");
            return;
        }
    };

    let output_json = match result {
        Ok(v) => match serde_json::to_value(v) {
            Ok(inner) => serde_json::json!({ "Ok": inner }),
            Err(e) => {
                warn!(port, method, error = %e, "failed to serialize recording output");
                return;
            }
        },
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };

    let Ok(mut guard) = recorder.lock() else {
        warn!(port, method, "cassette recorder lock poisoned");
        return;
    };
    guard.record(port, method, input_json, output_json);
    if let Err(e) = guard.flush() {
        warn!(path = %guard.path().display(), error = %e, "failed to write cassette");
    }
}
