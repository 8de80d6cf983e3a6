//! Scripted transport and a broken store for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{SessionError, StoreError};
use crate::session::PersistedSession;
use crate::store::SessionStore;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Replays queued replies in order and records every request it sees.
/// An empty queue answers with a transport error.
#[derive(Default)]
pub struct RecordingTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, SessionError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, body: Value) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            body,
            session_cookie: None,
        }));
        self
    }

    pub fn reply_with_cookie(&self, body: Value, cookie: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            body,
            session_cookie: Some(cookie.to_string()),
        }));
        self
    }

    pub fn fail(&self, err: SessionError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Value {
        self.requests.lock().unwrap().last().map(|r| r.body.clone()).unwrap_or(Value::Null)
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, req: TransportRequest) -> Result<TransportResponse, SessionError> {
        self.requests.lock().unwrap().push(req);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SessionError::Transport("no scripted reply".to_string())))
    }
}

/// Store whose every operation fails, as on a full or read-only disk.
pub struct FailingStore;

impl SessionStore for FailingStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        Err(StoreError::Storage("disk unavailable".to_string()))
    }

    fn save(&self, _record: &PersistedSession) -> Result<(), StoreError> {
        Err(StoreError::Storage("disk unavailable".to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Storage("disk unavailable".to_string()))
    }
}
