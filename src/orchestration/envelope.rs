use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The uniform `{success, data, error}` reply of every workflow operation.
///
/// Exactly one of `data` and `error` is set: `data` when `success` is true,
/// `error` otherwise. Build values through `success`/`failure` to keep that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Collapse an internal result. The error message keeps the whole
    /// context chain, outermost first.
    pub fn from_result(result: anyhow::Result<Value>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(format!("{:#}", error)),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (true, None, _) => Ok(Value::Null),
            (false, _, error) => Err(error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};
    use serde_json::json;

    #[test]
    fn success_serializes_with_null_error() {
        let envelope = Envelope::success(json!({"headline": "Run faster"}));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "data": {"headline": "Run faster"}, "error": null})
        );
    }

    #[test]
    fn failure_keeps_context_chain() {
        let result: anyhow::Result<Value> = Err(anyhow!("No such file or directory"))
            .context("Failed to read image file /tmp/missing.png");
        let envelope = Envelope::from_result(result);
        assert!(!envelope.success);
        assert_eq!(envelope.data, None);
        assert_eq!(
            envelope.error.as_deref(),
            Some("Failed to read image file /tmp/missing.png: No such file or directory")
        );
    }

    #[test]
    fn into_result_splits_variants() {
        assert_eq!(Envelope::success(json!(1)).into_result(), Ok(json!(1)));
        assert_eq!(
            Envelope::failure("boom").into_result(),
            Err("boom".to_string())
        );
    }
}
