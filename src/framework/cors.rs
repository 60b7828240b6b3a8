//! リクエストごとに CORS ヘッダーを決める.
//!
//! 許可リストに一致した origin だけをそのまま返し, credentials を許可する.
//! 一致しない origin は拒否もエラーもせず `Access-Control-Allow-Origin` を付けない.
//! 実際のブロックはブラウザが行う.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::settings::{CORS_ALLOWED_HEADERS, CORS_ALLOWED_METHODS};

use super::system::AppError;

/// 許可された origin の一覧
#[derive(Clone, Debug, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    max_age: Option<Duration>,
}

impl CorsPolicy {
    /// `scheme://host[:port]` 形式でない要素があれば設定エラー.
    pub fn new<I, S>(allowed_origins: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_origins = allowed_origins
            .into_iter()
            .map(|origin| normalize_origin(origin.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowed_origins,
            max_age: None,
        })
    }

    /// プリフライト結果のキャッシュ時間
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// origin ヘッダーから返すべきヘッダーを決める. 無い, もしくは壊れた origin は不一致扱い.
    pub fn decide(&self, origin: Option<&HeaderValue>) -> CorsDecision {
        let allow_origin = origin
            .and_then(|v| v.to_str().ok())
            .filter(|origin| self.allowed_origins.iter().any(|a| a == origin))
            .and_then(|origin| HeaderValue::from_str(origin).ok());

        CorsDecision {
            allow_origin,
            max_age: self.max_age,
        }
    }
}

fn normalize_origin(origin: &str) -> Result<String, AppError> {
    let trimmed = origin.trim().trim_end_matches('/');
    let invalid = || AppError::Config(format!("invalid CORS origin '{origin}'"));

    let (scheme, host) = trimmed.split_once("://").ok_or_else(invalid)?;

    let scheme_ok = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let host_ok = !host.is_empty()
        && !host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '*'));

    // ブラウザは scheme と host を小文字で送る
    if scheme_ok && host_ok {
        Ok(format!(
            "{}://{}",
            scheme.to_ascii_lowercase(),
            host.to_ascii_lowercase()
        ))
    } else {
        Err(invalid())
    }
}

/// 1リクエスト分の CORS の判定結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsDecision {
    allow_origin: Option<HeaderValue>,
    max_age: Option<Duration>,
}

impl CorsDecision {
    pub fn allow_origin(&self) -> Option<&HeaderValue> {
        self.allow_origin.as_ref()
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_origin.is_some()
    }

    /// 通常のレスポンスにヘッダーを付ける
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOWED_HEADERS),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));

        if let Some(origin) = &self.allow_origin {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        } else {
            headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
            headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
        }
    }

    /// プリフライト (`OPTIONS`) のレスポンスにヘッダーを付ける
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        self.apply(headers);
        if let Some(max_age) = self.max_age {
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from(max_age.as_secs()),
            );
        }
    }
}

/// CORS ミドルウェア. `OPTIONS` はここで 204 を返し, それ以外は後続のレスポンスにヘッダーを付ける.
pub async fn cors(State(policy): State<Arc<CorsPolicy>>, req: Request, next: Next) -> Response {
    let decision = policy.decide(req.headers().get(header::ORIGIN));

    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        decision.apply_preflight(resp.headers_mut());
        return resp;
    }

    let mut resp = next.run(req).await;
    decision.apply(resp.headers_mut());
    resp
}
