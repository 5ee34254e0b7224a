//! The `{data, error}` response convention

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use spotter_core::RemoteError;

/// Result of a backend call: either `error` is set, or `data` holds the
/// (possibly absent) value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl<T> RemoteResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
        }
    }

    pub fn failure(error: RemoteError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Convert to the `Result` convention. A set `error` wins over `data`.
    pub fn into_result(self) -> Result<Option<T>, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl RemoteResponse<JsonValue> {
    /// Deserialize `data` into `U`; a shape mismatch becomes a remote error
    pub fn decode<U: DeserializeOwned>(self) -> RemoteResponse<U> {
        match self.into_result() {
            Err(error) => RemoteResponse::failure(error),
            Ok(None) => RemoteResponse::empty(),
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(data) => RemoteResponse::success(data),
                Err(e) => RemoteResponse::failure(
                    RemoteError::new(format!("Unexpected response shape: {}", e))
                        .with_code("PARSE_ERROR"),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_result() {
        assert_eq!(RemoteResponse::success(42).into_result(), Ok(Some(42)));
        assert_eq!(RemoteResponse::<i32>::empty().into_result(), Ok(None));

        let response = RemoteResponse::<i32> {
            data: Some(1),
            error: Some(RemoteError::new("denied")),
        };
        assert_eq!(response.into_result(), Err(RemoteError::new("denied")));
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let response: RemoteResponse<Vec<String>> =
            serde_json::from_value(json!({"data": null, "error": {"message": "denied", "code": "42501"}}))
                .unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.message, "denied");
        assert_eq!(error.code.as_deref(), Some("42501"));
    }

    #[test]
    fn test_decode() {
        let response = RemoteResponse::success(json!([{"id": 1}, {"id": 2}]));
        #[derive(Debug, Deserialize, PartialEq)]
        struct Row {
            id: u32,
        }
        let decoded = response.decode::<Vec<Row>>().into_result().unwrap();
        assert_eq!(decoded, Some(vec![Row { id: 1 }, Row { id: 2 }]));

        let bad = RemoteResponse::success(json!("nope")).decode::<Vec<Row>>();
        assert_eq!(
            bad.error.and_then(|e| e.code),
            Some("PARSE_ERROR".to_string())
        );
    }
}
