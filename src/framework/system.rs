use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// アプリケーション全体のエラー
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Unauthorized: {}", .0.as_deref().unwrap_or("no message"))]
    Unauthorized(Option<String>),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Database(_) | AppError::Config(_) | AppError::Io(_) => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// ユーザー
#[derive(Clone, Debug)]
pub enum User {
    /// 認証済みユーザー
    Authenticated(AuthenticatedUser),
    /// 認証されていないユーザー
    Anonymous,
}

/// 認証済みユーザー
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
}

/// 役割
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    General,
    Admin,
}

impl Role {
    /// トークンの `role` クレームから役割を決める. 不明な値は一般扱い.
    pub fn from_claim(role: Option<&str>) -> Role {
        match role {
            Some("service_role") => Role::Admin,
            _ => Role::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401_with_message() {
        let resp = AppError::Unauthorized(Some("token expired".into())).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await,
            json!({ "error": "Unauthorized: token expired" })
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let resp = AppError::Database(sea_orm::DbErr::Custom("password=secret".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({ "error": "internal error" }));
    }

    #[test]
    fn role_from_claim() {
        assert_eq!(Role::from_claim(Some("service_role")), Role::Admin);
        assert_eq!(Role::from_claim(Some("authenticated")), Role::General);
        assert_eq!(Role::from_claim(None), Role::General);
    }
}
