use std::fmt;

use serde::{Deserialize, Serialize};

/// Token and user id of an authenticated session. Held together so one
/// can never be set without the other.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: i64,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Local view of the association with one database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
    database: Option<String>,
}

impl Session {
    /// Unauthenticated session, optionally bound to a database.
    pub fn new(database: Option<String>) -> Self {
        Self {
            credentials: None,
            database,
        }
    }

    pub fn authenticated(token: impl Into<String>, user_id: i64, database: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials {
                token: token.into(),
                user_id,
            }),
            database: Some(database.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.credentials.as_ref().map(|c| c.user_id)
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Drop the credentials. The database binding stays, so the next
    /// login can default to it.
    pub fn clear(&mut self) {
        self.credentials = None;
    }

    pub fn to_record(&self) -> PersistedSession {
        PersistedSession {
            session_id: self.token().map(str::to_string),
            uid: self.user_id(),
            db: self.database.clone(),
        }
    }

    /// Rebuild from a stored record. A record with only one of token and
    /// uid yields an unauthenticated session.
    pub fn from_record(record: PersistedSession) -> Self {
        let credentials = match (record.session_id, record.uid) {
            (Some(token), Some(user_id)) => Some(Credentials { token, user_id }),
            _ => None,
        };
        Self {
            credentials,
            database: record.db,
        }
    }
}

/// Durable form of a session: `{"sessionId": ..., "uid": ..., "db": ...}`.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default)]
    pub db: Option<String>,
}

impl fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSession")
            .field("session_id", &self.session_id.as_ref().map(|_| "***"))
            .field("uid", &self.uid)
            .field("db", &self.db)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let session = Session::authenticated("abc", 7, "mycompany");
        let json = serde_json::to_value(session.to_record()).unwrap();
        assert_eq!(json, serde_json::json!({"sessionId": "abc", "uid": 7, "db": "mycompany"}));
    }

    #[test]
    fn test_half_record_is_unauthenticated() {
        let record: PersistedSession = serde_json::from_str(r#"{"sessionId": "abc", "uid": null, "db": "x"}"#).unwrap();
        let session = Session::from_record(record);
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert_eq!(session.database(), Some("x"));
    }

    #[test]
    fn test_clear_keeps_database() {
        let mut session = Session::authenticated("abc", 7, "mycompany");
        session.clear();
        assert!(!session.is_authenticated());
        assert_eq!(session.user_id(), None);
        assert_eq!(session.database(), Some("mycompany"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::authenticated("topsecret", 1, "db");
        assert!(!format!("{:?}", session).contains("topsecret"));
        assert!(!format!("{:?}", session.to_record()).contains("topsecret"));
    }
}
