use std::{net::SocketAddr, time::Duration};

use crate::settings::{CORS_MAX_AGE_SECS, DEFAULT_BIND_ADDR, DEFAULT_JWT_AUDIENCE, TIMEOUT_DURATION};

use super::system::AppError;

/// 環境変数から読み込む設定
#[derive(Clone, Debug)]
pub struct Env {
    pub bind_addr: SocketAddr,
    pub db_url: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub cors_max_age: Duration,
}

impl Env {
    /// プロセスの環境変数から読み込む.
    ///
    /// 必須: `DB_URL`, `SUPABASE_JWT_SECRET`
    ///
    /// 任意: `SUPABASE_JWT_AUDIENCE`, `ALLOWED_ORIGINS` (カンマ区切り), `BIND_ADDR`,
    /// `REQUEST_TIMEOUT_SECS`, `CORS_MAX_AGE_SECS`
    pub fn from_env() -> Result<Env, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Env, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} is required")))
        };

        let db_url = required("DB_URL")?;
        let jwt_secret = required("SUPABASE_JWT_SECRET")?;
        let jwt_audience =
            lookup("SUPABASE_JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR: {e}")))?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let request_timeout = Duration::from_secs(parse_secs(
            lookup("REQUEST_TIMEOUT_SECS"),
            "REQUEST_TIMEOUT_SECS",
            TIMEOUT_DURATION,
        )?);
        let cors_max_age = Duration::from_secs(parse_secs(
            lookup("CORS_MAX_AGE_SECS"),
            "CORS_MAX_AGE_SECS",
            CORS_MAX_AGE_SECS,
        )?);

        Ok(Env {
            bind_addr,
            db_url,
            jwt_secret,
            jwt_audience,
            allowed_origins,
            request_timeout,
            cors_max_age,
        })
    }
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64, AppError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let env = Env::from_lookup(lookup_from(&[
            ("DB_URL", "postgres://localhost/crm"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(env.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(env.jwt_audience, "authenticated");
        assert!(env.allowed_origins.is_empty());
        assert_eq!(env.request_timeout, Duration::from_secs(30));
        assert_eq!(env.cors_max_age, Duration::from_secs(600));
    }

    #[test]
    fn allowed_origins_are_split_and_trimmed() {
        let env = Env::from_lookup(lookup_from(&[
            ("DB_URL", "postgres://localhost/crm"),
            ("SUPABASE_JWT_SECRET", "secret"),
            (
                "ALLOWED_ORIGINS",
                " https://app.example.com , ,chrome-extension://abcdef",
            ),
        ]))
        .unwrap();

        assert_eq!(
            env.allowed_origins,
            vec!["https://app.example.com", "chrome-extension://abcdef"]
        );
    }

    #[test]
    fn missing_required_var_is_config_error() {
        let err = Env::from_lookup(lookup_from(&[("DB_URL", "postgres://localhost/crm")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("SUPABASE_JWT_SECRET")));
    }

    #[test]
    fn invalid_timeout_is_config_error() {
        let err = Env::from_lookup(lookup_from(&[
            ("DB_URL", "postgres://localhost/crm"),
            ("SUPABASE_JWT_SECRET", "secret"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.starts_with("REQUEST_TIMEOUT_SECS")));
    }
}
