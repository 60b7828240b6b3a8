use axum::{
    async_trait, extract,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::token_store::SessionToken;

use super::system::{AppError, AuthenticatedUser, Role};

/// セッション
#[derive(Clone, Debug)]
pub struct Session {
    pub token: SessionToken,
    pub user: AuthenticatedUser,
}

// ハンドラの引数で指定できるようにするための処理
#[async_trait]
impl<S> extract::FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Unauthorized(None))
    }
}

/// `Authorization: Bearer <token>` からトークンを取り出す.
pub fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(SessionToken::new(token))
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    email: Option<String>,
    role: Option<String>,
}

/// 外部の認証サービスが発行したアクセストークン (HS256 JWT) を検証する
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// 署名, 有効期限, audience を確認してユーザーを返す.
    pub fn verify(&self, token: &SessionToken) -> Result<AuthenticatedUser, AppError> {
        let data = decode::<Claims>(token.as_str(), &self.key, &self.validation)
            .map_err(|e| AppError::Unauthorized(Some(e.to_string())))?;

        let claims = data.claims;
        Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
            roles: vec![Role::from_claim(claims.role.as_deref())],
        })
    }
}

/// sessionを探す
pub fn find_session(verifier: &TokenVerifier, token: SessionToken) -> Result<Session, AppError> {
    let user = verifier.verify(&token)?;
    Ok(Session { token, user })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    pub(crate) const SECRET: &str = "test-jwt-secret";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        email: &'a str,
        role: &'a str,
        aud: &'a str,
        exp: i64,
    }

    pub(crate) fn sign(sub: &str, aud: &str, exp_offset_secs: i64) -> String {
        let claims = TestClaims {
            sub,
            email: "someone@example.com",
            role: "authenticated",
            aud,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, "authenticated")
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers).unwrap().as_str(), "abc.def.ghi");
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn valid_token_resolves_user() {
        let token = SessionToken::new(sign("user-1", "authenticated", 3600));
        let session = find_session(&verifier(), token).unwrap();

        assert_eq!(session.user.id, "user-1");
        assert_eq!(session.user.email.as_deref(), Some("someone@example.com"));
        assert_eq!(session.user.roles, vec![Role::General]);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = SessionToken::new(sign("user-1", "authenticated", -3600));
        assert!(matches!(
            verifier().verify(&token),
            Err(AppError::Unauthorized(Some(_)))
        ));
    }

    #[test]
    fn wrong_audience_or_secret_is_unauthorized() {
        let token = SessionToken::new(sign("user-1", "anon", 3600));
        assert!(verifier().verify(&token).is_err());

        let token = SessionToken::new(sign("user-1", "authenticated", 3600));
        let other = TokenVerifier::new("another-secret", "authenticated");
        assert!(other.verify(&token).is_err());
    }
}
