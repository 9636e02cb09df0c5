use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::error::{ClientError, ClientResult};

/// `run_id` and `snapshot_id` mirror the ids found in `data`, when there are any.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub class: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

pub fn success<T>(command: &str, data: T) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    let data = serde_json::to_value(data)
        .map_err(|err| ClientError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        run_id: run_id_of(&data),
        snapshot_id: snapshot_id_of(&data),
        data,
    })
}

pub fn failure_from_error(error: &ClientError) -> FailureEnvelope {
    let data = error.data.as_ref();
    FailureEnvelope {
        ok: false,
        error: ErrorContract {
            code: error.code.clone(),
            class: error.class().as_str().to_string(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        },
        run_id: data.and_then(run_id_of),
        snapshot_id: data.and_then(snapshot_id_of),
        data: error.data.clone(),
    }
}

fn run_id_of(data: &Value) -> Option<String> {
    data.get("run_id").and_then(Value::as_str).map(str::to_string)
}

/// The snapshot a run or rollback refers to: top level first, then the run's backup.
fn snapshot_id_of(data: &Value) -> Option<String> {
    data.get("snapshot_id")
        .or_else(|| data.get("backup").and_then(|backup| backup.get("snapshot_id")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{failure_from_error, success};
    use crate::ClientError;

    #[test]
    fn ingest_success_lifts_run_and_backup_snapshot() {
        let envelope = success(
            "ingest",
            json!({
                "run_id": "run_01J",
                "backup": { "snapshot_id": "20250115T101500_123Z" },
            }),
        );
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            assert_eq!(envelope.run_id.as_deref(), Some("run_01J"));
            assert_eq!(envelope.snapshot_id.as_deref(), Some("20250115T101500_123Z"));
        }
    }

    #[test]
    fn commands_without_ids_leave_them_out() {
        let envelope = success("db init", json!({ "tables": ["transactions"] }));
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            let value = serde_json::to_value(&envelope).unwrap_or_default();
            assert!(value.get("run_id").is_none());
            assert!(value.get("snapshot_id").is_none());
        }
    }

    #[test]
    fn failure_carries_ids_from_error_data() {
        let error = ClientError::verification_failed(json!({
            "run_id": "run_01K",
            "snapshot_id": "20250115T101500_123Z",
        }));
        let envelope = failure_from_error(&error);
        assert_eq!(envelope.run_id.as_deref(), Some("run_01K"));
        assert_eq!(envelope.snapshot_id.as_deref(), Some("20250115T101500_123Z"));
        assert_eq!(envelope.error.code, "verification_failed");
    }
}
