use crate::framework::{system::AuthenticatedUser, AppState, Session};
use axum::{response, routing, Router};

/// パス
pub const PATH: &str = "/session";

pub fn mk_router() -> Router<AppState> {
    Router::new().route("/", routing::get(handler))
}

/// トークンの持ち主
async fn handler(Session { user, .. }: Session) -> response::Json<AuthenticatedUser> {
    response::Json(user)
}
