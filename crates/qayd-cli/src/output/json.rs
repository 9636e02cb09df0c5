use std::io;

use qayd_client::contracts::envelope::failure_from_error;
use qayd_client::{ClientError, SuccessEnvelope};
use serde::Serialize;
use serde_json::{Value, json};

const JSON_VERSION: &str = "v1";

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    let mut value = json!({
        "ok": true,
        "command": success.command,
        "version": JSON_VERSION,
    });
    if let Value::Object(fields) = &mut value {
        if let Some(run_id) = &success.run_id {
            fields.insert("run_id".to_string(), json!(run_id));
        }
        if let Some(snapshot_id) = &success.snapshot_id {
            fields.insert("snapshot_id".to_string(), json!(snapshot_id));
        }
        fields.insert("data".to_string(), success.data.clone());
    }
    serialize_json_pretty(&value)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
