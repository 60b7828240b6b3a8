pub const ACCESS_TOKEN_KEY: &str = "supabaseAccessToken";
pub const CACHED_CONNECTIONS_KEY: &str = "cachedConnections";
pub const CONNECTIONS_CACHE_TIMESTAMP_KEY: &str = "connectionsCacheTimestamp";

/// セッションストレージ上でトークンストアが所有するキー. ログアウト時にまとめて消す.
pub const SESSION_KEYS: [&str; 3] = [
    ACCESS_TOKEN_KEY,
    CACHED_CONNECTIONS_KEY,
    CONNECTIONS_CACHE_TIMESTAMP_KEY,
];

pub const CORS_ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";
pub const CORS_ALLOWED_HEADERS: &str = "Content-Type, Authorization";
pub const CORS_MAX_AGE_SECS: u64 = 600;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_JWT_AUDIENCE: &str = "authenticated";

pub const TIMEOUT_DURATION: u64 = 30;
