//! クライアント側のセッションストレージに置くアクセストークンとキャッシュ.
//!
//! ストレージは [`SessionStorage`] として差し替えられる. ブラウザの session storage と同じく
//! 値は JSON で, 1つのクライアントコンテキストからしか書き込まれない.

use std::{collections::HashMap, fmt};

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::settings::{
    ACCESS_TOKEN_KEY, CACHED_CONNECTIONS_KEY, CONNECTIONS_CACHE_TIMESTAMP_KEY, SESSION_KEYS,
};

/// ストレージ層のエラー. 呼び出し元へそのまま返す.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("storage permission denied: {0}")]
    PermissionDenied(String),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// キーと JSON 値のストレージ
pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError>;

    /// 複数キーを1回で消す. 途中まで消えた状態は見えない.
    fn remove(&mut self, keys: &[&str]) -> Result<(), StorageError>;
}

/// メモリ上のストレージ. `with_quota` で容量制限をかけられる.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, Value>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> Result<usize, StorageError> {
        let mut used = 0;
        for (k, v) in self.entries.iter().filter(|(k, _)| k.as_str() != key) {
            used += k.len() + serde_json::to_vec(v)?.len();
        }
        Ok(used)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let needed =
                self.used_bytes_without(key)? + key.len() + serde_json::to_vec(&value)?.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{needed} bytes needed, quota is {quota}"
                )));
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

/// 外部認証で得たアクセストークン. `Debug` では値を出さない.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` ヘッダーの値. トークンにヘッダーで使えない文字があれば `None`.
    pub fn bearer_header(&self) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// キャッシュされたつながり一覧. 中身は解釈しない.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedConnections {
    pub payload: Value,
    pub cached_at: DateTime<Utc>,
}

/// トークンストア
#[derive(Debug)]
pub struct TokenStore<S> {
    storage: S,
}

impl<S: SessionStorage> TokenStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// 保存されたトークンを読む. 無ければ警告を出して `Ok(None)`.
    pub fn get_stored_token(&self) -> Result<Option<SessionToken>, StorageError> {
        let token = match self.storage.get(ACCESS_TOKEN_KEY)? {
            Some(Value::String(token)) if !token.is_empty() => Some(SessionToken(token)),
            _ => None,
        };

        if token.is_none() {
            tracing::warn!(key = ACCESS_TOKEN_KEY, "no access token in session storage");
        }
        Ok(token)
    }

    /// 既存の値は上書きする
    pub fn set_stored_token(&mut self, token: &SessionToken) -> Result<(), StorageError> {
        self.storage
            .set(ACCESS_TOKEN_KEY, Value::String(token.0.clone()))
    }

    /// トークンとキャッシュ ([`SESSION_KEYS`]) を1回の操作で消す
    pub fn clear_stored_token(&mut self) -> Result<(), StorageError> {
        self.storage.remove(&SESSION_KEYS)
    }

    /// 付けるべき `Authorization` ヘッダー. トークンが無ければ `None`.
    pub fn authorization_header(&self) -> Result<Option<HeaderValue>, StorageError> {
        Ok(self
            .get_stored_token()?
            .and_then(|token| token.bearer_header()))
    }

    /// 失敗したときはキャッシュの2キーとも残さない
    pub fn cache_connections(
        &mut self,
        payload: Value,
        cached_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let cache_keys = [CACHED_CONNECTIONS_KEY, CONNECTIONS_CACHE_TIMESTAMP_KEY];

        let written = self
            .storage
            .set(CACHED_CONNECTIONS_KEY, payload)
            .and_then(|()| {
                self.storage.set(
                    CONNECTIONS_CACHE_TIMESTAMP_KEY,
                    Value::from(cached_at.timestamp_millis()),
                )
            });

        if let Err(e) = written {
            self.storage.remove(&cache_keys)?;
            return Err(e);
        }
        Ok(())
    }

    /// 時刻が読めないキャッシュは無いものとして扱う
    pub fn cached_connections(&self) -> Result<Option<CachedConnections>, StorageError> {
        let Some(payload) = self.storage.get(CACHED_CONNECTIONS_KEY)? else {
            return Ok(None);
        };

        let millis = match self.storage.get(CONNECTIONS_CACHE_TIMESTAMP_KEY)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        Ok(millis
            .and_then(DateTime::from_timestamp_millis)
            .map(|cached_at| CachedConnections { payload, cached_at }))
    }
}
