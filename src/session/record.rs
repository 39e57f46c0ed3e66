//! Session records and the request-attached session object.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Field holding the session's own identifier inside its data.
pub const SID_FIELD: &str = "sid";

/// Open-ended key/value data stored for a session.
///
/// Serialized as a JSON object. Once persisted it always carries
/// [`SID_FIELD`] equal to the identifier it is stored under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(Map<String, Value>);

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `sid` field, if present and a string.
    pub fn sid(&self) -> Option<&str> {
        self.0.get(SID_FIELD).and_then(Value::as_str)
    }

    pub fn set_sid(&mut self, sid: &str) {
        self.0
            .insert(SID_FIELD.to_string(), Value::String(sid.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Merge every field of `fields` into this record, overwriting on conflict.
    ///
    /// The `sid` field is never overwritten.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            if key != SID_FIELD {
                self.0.insert(key, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub(crate) fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl From<Map<String, Value>> for SessionData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The session attached to a request by the session middleware.
///
/// Handlers extract it directly (rejecting with `401` when the middleware
/// could not attach one) or as `Option<Session>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    sid: String,
    data: SessionData,
}

impl Session {
    pub fn new(sid: impl Into<String>, data: SessionData) -> Self {
        Self {
            sid: sid.into(),
            data,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }

    pub fn into_data(self) -> SessionData {
        self.data
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "no session attached to request"))
    }
}

impl<S> OptionalFromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sid_field() {
        let mut data = SessionData::new();
        assert!(data.sid().is_none());

        data.set_sid("abc123");
        assert_eq!(data.sid(), Some("abc123"));
        assert_eq!(data.get("sid"), Some(&json!("abc123")));
    }

    #[test]
    fn test_json_encoding() {
        let mut data = SessionData::new();
        data.set_sid("abc123");
        data.insert("user", json!({"id": 7, "roles": ["admin"]}));

        let raw = data.to_json().unwrap();
        let decoded = SessionData::from_json(&raw).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(decoded.get("user").unwrap()["roles"][0], "admin");
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(SessionData::from_json("[1, 2, 3]").is_err());
        assert!(SessionData::from_json("\"text\"").is_err());
        assert!(SessionData::from_json("{broken").is_err());
    }

    #[test]
    fn test_merge_keeps_sid() {
        let mut data = SessionData::new();
        data.set_sid("original");
        data.insert("count", 1);

        let patch = json!({"sid": "forged", "count": 2, "name": "x"});
        let Value::Object(fields) = patch else {
            unreachable!()
        };
        data.merge(fields);

        assert_eq!(data.sid(), Some("original"));
        assert_eq!(data.get("count"), Some(&json!(2)));
        assert_eq!(data.get("name"), Some(&json!("x")));
    }

    #[test]
    fn test_remove() {
        let mut data = SessionData::new();
        data.insert("k", "v");
        assert_eq!(data.len(), 1);
        assert_eq!(data.remove("k"), Some(json!("v")));
        assert!(data.is_empty());
    }
}
