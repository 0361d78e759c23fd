use serde::{Deserialize, Serialize};
use serde_json::Value;
use sparts_ledger::StateRecord;
use sparts_types::{EntityFamily, ErrorKind};

use crate::error::SdkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Stable user-visible result of one operation.
///
/// Failures always carry the error kind; a failure is never reported with a
/// partial result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    pub message: String,
    /// `PartRecord`, `PartList`, `PartHistory`, `EmptyRecord`, ...
    pub result_type: String,
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ResponseEnvelope {
    fn success(message: impl Into<String>, result_type: String, result: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            result_type,
            result,
            error_kind: None,
        }
    }

    pub fn record(record: &StateRecord, message: impl Into<String>) -> Self {
        let result = Value::Object(record.to_json_map());
        Self::success(message, format!("{}Record", record.family), result)
    }

    pub fn list(family: EntityFamily, records: &[StateRecord]) -> Self {
        Self::success(
            format!("{} {} record(s)", records.len(), family),
            format!("{family}List"),
            records_value(records),
        )
    }

    pub fn history(family: EntityFamily, records: &[StateRecord]) -> Self {
        Self::success(
            format!("{} version(s)", records.len()),
            format!("{family}History"),
            records_value(records),
        )
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::success(message, "EmptyRecord".into(), Value::Object(Default::default()))
    }

    pub fn failure(error: &SdkError) -> Self {
        Self {
            status: ResponseStatus::Failed,
            message: error.to_string(),
            result_type: "EmptyRecord".into(),
            result: Value::Object(Default::default()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

fn records_value(records: &[StateRecord]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|r| Value::Object(r.to_json_map()))
            .collect(),
    )
}
