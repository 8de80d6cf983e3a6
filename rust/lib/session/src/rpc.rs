//! JSON-RPC 2.0 envelopes exchanged with the server.
//!
//! Every request is `{"jsonrpc": "2.0", "method": "call", "params": ..., "id": N}`.
//! Every response carries exactly one of `result` or `error`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

pub const JSONRPC_VERSION: &str = "2.0";
pub const CALL_METHOD: &str = "call";
pub const OBJECT_SERVICE: &str = "object";

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub jsonrpc: String,
    pub method: String,
    pub params: P,
    pub id: u64,
}

impl<P: Serialize> RpcRequest<P> {
    /// A `"call"` request with the given id.
    pub fn call(id: u64, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: CALL_METHOD.to_string(),
            params,
            id,
        }
    }

    pub fn to_value(&self) -> Result<Value, SessionError> {
        serde_json::to_value(self).map_err(|e| SessionError::Decode(format!("request body: {}", e)))
    }
}

/// Parameters of the authenticate call.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthParams {
    pub db: String,
    pub login: String,
    pub password: String,
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("db", &self.db)
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Parameters of an object call.
///
/// `args` always starts with `[db, uid, session_token, model]`, followed
/// by the caller's positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCallParams {
    pub service: String,
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl ObjectCallParams {
    pub fn new(
        db: &str,
        uid: i64,
        token: &str,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Self {
        let mut full = Vec::with_capacity(args.len() + 4);
        full.push(Value::from(db));
        full.push(Value::from(uid));
        full.push(Value::from(token));
        full.push(Value::from(model));
        full.extend(args);
        Self {
            service: OBJECT_SERVICE.to_string(),
            model: model.to_string(),
            method: method.to_string(),
            args: full,
            kwargs,
        }
    }

    /// The caller-supplied positional arguments, without the session prefix.
    pub fn user_args(&self) -> &[Value] {
        self.args.get(4..).unwrap_or(&[])
    }
}

/// `error` member of a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Inbound response envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// Parse a response body. Anything that isn't a JSON object is a decode error.
    pub fn from_value(body: Value) -> Result<Self, SessionError> {
        if !body.is_object() {
            return Err(SessionError::Decode(format!("expected JSON-RPC object, got {}", body)));
        }
        serde_json::from_value(body).map_err(|e| SessionError::Decode(format!("response body: {}", e)))
    }

    /// `Err(Server)` if the error member is set, else the result verbatim.
    pub fn into_result(self) -> Result<Value, SessionError> {
        if let Some(err) = self.error {
            return Err(SessionError::server(err.message, err.code, err.data));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Monotonic request id source. Ids start at 1 and never repeat within
/// one client.
#[derive(Debug)]
pub struct RequestIds(AtomicU64);

impl RequestIds {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_envelope_shape() {
        let req = RpcRequest::call(
            7,
            AuthParams {
                db: "mycompany".into(),
                login: "admin".into(),
                password: "secret".into(),
            },
        );
        assert_eq!(
            req.to_value().unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "call",
                "params": {"db": "mycompany", "login": "admin", "password": "secret"},
                "id": 7
            })
        );
    }

    #[test]
    fn auth_params_debug_hides_password() {
        let p = AuthParams {
            db: "d".into(),
            login: "u".into(),
            password: "hunter2".into(),
        };
        let dbg = format!("{:?}", p);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn object_args_are_prefixed() {
        let p = ObjectCallParams::new(
            "mycompany",
            7,
            "abc",
            "res.partner",
            "search_count",
            vec![json!([])],
            Map::new(),
        );
        assert_eq!(p.service, "object");
        assert_eq!(p.args, vec![json!("mycompany"), json!(7), json!("abc"), json!("res.partner"), json!([])]);
        assert_eq!(p.user_args(), &[json!([])]);
    }

    #[test]
    fn response_error_wins() {
        let resp = RpcResponse::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 200, "message": "Access Denied", "data": {"name": "odoo.exceptions.AccessDenied"}}
        }))
        .unwrap();
        match resp.into_result() {
            Err(SessionError::Server { message, code, data }) => {
                assert_eq!(message, "Access Denied");
                assert_eq!(code, Some(200));
                assert_eq!(data.unwrap()["name"], "odoo.exceptions.AccessDenied");
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn response_result_is_verbatim() {
        let resp = RpcResponse::from_value(json!({"jsonrpc": "2.0", "id": 3, "result": [{"id": 1}]})).unwrap();
        assert_eq!(resp.into_result().unwrap(), json!([{"id": 1}]));
    }

    #[test]
    fn non_object_body_is_decode_error() {
        let err = RpcResponse::from_value(json!("<html>")).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }

    #[test]
    fn request_ids_are_monotonic() {
        let ids = RequestIds::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert_eq!(a, 1);
        assert!(a < b && b < c);
    }
}
