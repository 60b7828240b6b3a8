pub mod cors;
pub mod env;
pub mod logger;
pub mod session;
pub mod system;

pub use self::{
    cors::CorsPolicy,
    env::Env,
    session::{find_session, Session, TokenVerifier},
    system::AppError,
};

use self::system::User;
use crate::db::ConnectionRepository;
use axum::{async_trait, extract, http::request::Parts};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::{net::SocketAddr, sync::Arc};
use ulid::Ulid;

/// アプリケーション全体での共有する状態. DBコネクションなどを持たせる.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<dyn ConnectionRepository>,
    pub verifier: Arc<TokenVerifier>,
    pub cors: Arc<CorsPolicy>,
}

impl AppState {
    pub fn new(env: &Env, connections: Arc<dyn ConnectionRepository>) -> Result<Self, AppError> {
        let cors = CorsPolicy::new(&env.allowed_origins)?.with_max_age(env.cors_max_age);

        Ok(Self {
            connections,
            verifier: Arc::new(TokenVerifier::new(&env.jwt_secret, &env.jwt_audience)),
            cors: Arc::new(cors),
        })
    }
}

/// リクエストごとに分離された状態.
#[derive(Clone, Debug)]
pub struct ReqScopedState {
    pub ts: DateTime<Utc>,
    pub req_id: Ulid,
    pub session: Option<Session>,
    pub log_member: Map<String, Value>,
}

impl ReqScopedState {
    pub fn new(
        req_id: Ulid,
        session: Option<Session>,
        req: &extract::Request,
        remote_addr: Option<&SocketAddr>,
    ) -> Self {
        let method = req.method();
        let uri = req.uri();

        let ts = DateTime::from_timestamp_millis(req_id.timestamp_ms() as i64)
            .unwrap_or_else(Utc::now);
        let mut pairs = vec![
            ("req_id", req_id.to_string()),
            ("timestamp", ts.to_rfc3339()),
            ("uri", uri.to_string()),
            ("method", method.to_string()),
        ];

        if let Some(addr) = remote_addr {
            pairs.push(("remote_addr", addr.to_string()));
        }

        // Authorization は載せない
        let header_keys = ["user-agent", "origin"];

        for key in header_keys {
            if let Some(v) = req.headers().get(key) {
                pairs.push((key, v.to_str().unwrap_or("parse error").to_string()));
            }
        }

        Self {
            req_id,
            session,
            ts,
            log_member: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect(),
        }
    }

    pub fn user(&self) -> User {
        match &self.session {
            Some(session) => User::Authenticated(session.user.clone()),
            None => User::Anonymous,
        }
    }
}

#[async_trait]
impl<S> extract::FromRequestParts<S> for ReqScopedState
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ReqScopedState>()
            .cloned()
            .ok_or_else(|| AppError::Config("request scoped state is not set up".into()))
    }
}

impl ReqScopedState {
    pub fn logger(&self) -> logger::Logger<'_> {
        logger::Logger(self)
    }
}
