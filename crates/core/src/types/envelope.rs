use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::Error;

/// Uniform adapter result shape.
///
/// Serialized as `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEnvelope<T> {
    Success(T),
    Failure(String),
}

impl<T> ToolEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self::Success(data)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ToolEnvelope<U> {
        match self {
            Self::Success(data) => ToolEnvelope::Success(f(data)),
            Self::Failure(msg) => ToolEnvelope::Failure(msg),
        }
    }
}

impl<T> From<crate::Result<T>> for ToolEnvelope<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

impl<T> From<Error> for ToolEnvelope<T> {
    fn from(err: Error) -> Self {
        Self::Failure(err.to_string())
    }
}

impl<T: Serialize> Serialize for ToolEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            Self::Failure(error) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_serialization_is_stable() {
        let ok = ToolEnvelope::ok(json!({ "answer": "42" }));
        assert_eq!(
            serde_json::to_value(ok).expect("serialize"),
            json!({ "success": true, "data": { "answer": "42" } })
        );

        let failed: ToolEnvelope<()> = Error::not_configured("Clipdrop API key").into();
        assert_eq!(
            serde_json::to_value(failed).expect("serialize"),
            json!({ "success": false, "error": "Clipdrop API key is not configured" })
        );
    }
}
