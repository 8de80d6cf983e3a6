//! The session client: authenticate, persist the session, forward
//! object calls.
//!
//! A [`SessionClient`] is an ordinary value. Create one per database
//! connection and pass it (or an [`AuthContext`](crate::AuthContext)
//! wrapping it) to whatever needs it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, ConfigOverride};
use crate::error::SessionError;
use crate::retry::{retry_read, RetryPolicy};
use crate::rpc::{AuthParams, ObjectCallParams, RequestIds, RpcRequest, RpcResponse};
use crate::session::Session;
use crate::store::SessionStore;
use crate::transport::{HttpTransport, Transport, TransportRequest, TransportResponse, SESSION_HEADER};

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: i64,
    pub database: String,
}

/// `result` of the authenticate call. Older servers send `uid: false`
/// on failure, so uid is read loosely.
#[derive(Debug, Deserialize)]
struct AuthResult {
    #[serde(default)]
    uid: Value,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    db: Option<String>,
}

/// Arguments of `search_read`. Defaults: empty domain, all fields,
/// offset 0, the configured page size, server ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRead {
    pub domain: Value,
    pub fields: Vec<String>,
    pub offset: u64,
    pub limit: Option<u64>,
    pub order: String,
}

impl Default for SearchRead {
    fn default() -> Self {
        Self {
            domain: json!([]),
            fields: Vec::new(),
            offset: 0,
            limit: None,
            order: String::new(),
        }
    }
}

impl SearchRead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: Value) -> Self {
        self.domain = domain;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    /// Positional args `[domain, fields, offset, limit, order]`.
    pub fn to_args(&self, page_size: u64) -> Vec<Value> {
        vec![
            self.domain.clone(),
            json!(self.fields),
            json!(self.offset),
            json!(self.limit.unwrap_or(page_size)),
            json!(self.order),
        ]
    }
}

/// Session-aware JSON-RPC client for one server.
pub struct SessionClient {
    defaults: ApiConfig,
    config: ApiConfig,
    session: Session,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    ids: RequestIds,
}

impl SessionClient {
    /// Client with an unauthenticated session. Call [`initialize`](Self::initialize)
    /// to apply overrides and restore a stored session.
    pub fn new(config: ApiConfig, transport: Arc<dyn Transport>, store: Arc<dyn SessionStore>) -> Self {
        let session = Session::new(config.database.clone());
        Self {
            defaults: config.clone(),
            config,
            session,
            transport,
            store,
            ids: RequestIds::new(),
        }
    }

    /// Client talking HTTP through `reqwest`.
    pub fn http(config: ApiConfig, store: Arc<dyn SessionStore>) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()), store)
    }

    /// Apply `ov` over the configured defaults, then restore the stored
    /// session if there is one. Never fails: an unreadable record leaves
    /// the client unauthenticated.
    pub async fn initialize(&mut self, ov: &ConfigOverride) {
        self.config = self.defaults.merged(ov);
        if let Some(db) = &self.config.database {
            self.session = Session::new(Some(db.clone()));
        }

        match self.store.load() {
            Ok(Some(record)) => {
                let fallback_db = self.session.database().map(str::to_string);
                let mut restored = Session::from_record(record);
                if restored.database().is_none() {
                    restored = match (restored.credentials().cloned(), fallback_db) {
                        (Some(c), Some(db)) => Session::authenticated(c.token, c.user_id, db),
                        (None, db) => Session::new(db),
                        (Some(_), None) => {
                            warn!("stored session has no database, ignoring credentials");
                            Session::new(None)
                        }
                    };
                }
                info!(
                    authenticated = restored.is_authenticated(),
                    db = restored.database().unwrap_or("-"),
                    "restored stored session"
                );
                self.session = restored;
            }
            Ok(None) => {
                debug!("no stored session");
            }
            Err(e) => {
                warn!(error = %e, "failed to restore stored session");
                self.session.clear();
            }
        }
    }

    /// Authenticate against `database` (or the current/configured one).
    ///
    /// On success the session is replaced and persisted. On any failure
    /// the session is left exactly as it was.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        database: Option<&str>,
    ) -> Result<LoginOutcome, SessionError> {
        let db = database
            .or(self.session.database())
            .or(self.config.database.as_deref())
            .map(str::to_string)
            .ok_or_else(|| SessionError::AuthenticationRejected("no database selected".to_string()))?;

        let id = self.ids.next();
        let body = RpcRequest::call(
            id,
            AuthParams {
                db: db.clone(),
                login: username.to_string(),
                password: password.to_string(),
            },
        )
        .to_value()?;

        debug!(id, db = %db, login = username, "authenticate");
        let reply = self.send(self.config.authenticate_url(), Vec::new(), body).await?;

        let result = match RpcResponse::from_value(reply.body)?.into_result() {
            Ok(result) => result,
            Err(SessionError::Server { message, .. }) => {
                return Err(SessionError::AuthenticationRejected(message));
            }
            Err(e) => return Err(e),
        };
        if !result.is_object() {
            return Err(SessionError::AuthenticationRejected("Authentication failed".to_string()));
        }
        let auth: AuthResult = serde_json::from_value(result)
            .map_err(|e| SessionError::Decode(format!("authenticate result: {}", e)))?;

        let user_id = auth
            .uid
            .as_i64()
            .ok_or_else(|| SessionError::AuthenticationRejected("Authentication failed".to_string()))?;
        let token = auth
            .session_id
            .filter(|s| !s.is_empty())
            .or(reply.session_cookie)
            .ok_or_else(|| SessionError::AuthenticationRejected("no session id in response".to_string()))?;
        let database = auth.db.unwrap_or(db);

        let session = Session::authenticated(token, user_id, database.clone());
        self.store.save(&session.to_record())?;
        self.session = session;

        info!(uid = user_id, db = %database, "logged in");
        Ok(LoginOutcome { user_id, database })
    }

    /// End the session. The remote call is best effort; local state and
    /// the stored record are always cleared.
    pub async fn logout(&mut self) {
        if let Some(token) = self.session.token().map(str::to_string) {
            let id = self.ids.next();
            let sent = match RpcRequest::call(id, json!({})).to_value() {
                Ok(body) => {
                    self.send(
                        self.config.logout_url(),
                        vec![(SESSION_HEADER.to_string(), token)],
                        body,
                    )
                    .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                warn!(error = %e, "remote logout failed");
            }
        }

        self.session.clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to delete stored session");
        }
        info!("logged out");
    }

    /// True iff both session token and user id are set.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// `(user_id, database)` of the logged-in user.
    pub fn user(&self) -> Option<(i64, Option<&str>)> {
        self.session.user_id().map(|uid| (uid, self.session.database()))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Invoke `method` on `model`. Fails with `NotAuthenticated` before
    /// touching the network if there is no session.
    pub async fn call(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, SessionError> {
        let creds = self.session.credentials().ok_or(SessionError::NotAuthenticated)?;
        let db = self
            .session
            .database()
            .or(self.config.database.as_deref())
            .ok_or(SessionError::NotAuthenticated)?;

        let id = self.ids.next();
        let params = ObjectCallParams::new(db, creds.user_id, &creds.token, model, method, args, kwargs);
        let body = RpcRequest::call(id, params).to_value()?;

        let mut headers: Vec<(String, String)> = self
            .config
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.push((SESSION_HEADER.to_string(), creds.token.clone()));

        debug!(id, model, method, "object call");
        let reply = self.send(self.config.object_url(), headers, body).await?;
        RpcResponse::from_value(reply.body)?.into_result()
    }

    /// [`call`](Self::call), decoding the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<T, SessionError> {
        let value = self.call(model, method, args, kwargs).await?;
        serde_json::from_value(value).map_err(|e| SessionError::Decode(format!("{}.{} result: {}", model, method, e)))
    }

    pub async fn search_read(&self, model: &str, query: SearchRead) -> Result<Value, SessionError> {
        let args = query.to_args(self.config.page_size);
        retry_read(self.retry_policy(), "search_read", || {
            self.call(model, "search_read", args.clone(), Map::new())
        })
        .await
    }

    pub async fn search_count(&self, model: &str, domain: Value) -> Result<Value, SessionError> {
        let args = vec![domain];
        retry_read(self.retry_policy(), "search_count", || {
            self.call(model, "search_count", args.clone(), Map::new())
        })
        .await
    }

    pub async fn create(&self, model: &str, data: Value) -> Result<Value, SessionError> {
        self.call(model, "create", vec![data], Map::new()).await
    }

    pub async fn write(&self, model: &str, id: i64, data: Value) -> Result<Value, SessionError> {
        self.call(model, "write", vec![json!([id]), data], Map::new()).await
    }

    pub async fn unlink(&self, model: &str, id: i64) -> Result<Value, SessionError> {
        self.call(model, "unlink", vec![json!([id])], Map::new()).await
    }

    /// Arbitrary model method.
    pub async fn execute(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, SessionError> {
        self.call(model, method, args, kwargs).await
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    async fn send(
        &self,
        url: String,
        headers: Vec<(String, String)>,
        body: Value,
    ) -> Result<TransportResponse, SessionError> {
        self.transport
            .post(TransportRequest {
                url,
                headers,
                body,
                timeout: self.config.timeout(),
            })
            .await
    }
}
