use crate::{
    db::connections::{ConnectionPatch, Model},
    framework::{logger::LoggerInterface, AppError, AppState, ReqScopedState, Session},
};
use axum::{extract, http::StatusCode, response};

/// パス
pub const PATH: &str = "/:id";

pub async fn show(
    extract::State(state): extract::State<AppState>,
    Session { user, .. }: Session,
    extract::Path(id): extract::Path<String>,
) -> Result<response::Json<Model>, AppError> {
    state
        .connections
        .find(&user.id, &id)
        .await?
        .map(response::Json)
        .ok_or(AppError::NotFound)
}

pub async fn update(
    extract::State(state): extract::State<AppState>,
    Session { user, .. }: Session,
    ctx: ReqScopedState,
    extract::Path(id): extract::Path<String>,
    extract::Json(patch): extract::Json<ConnectionPatch>,
) -> Result<response::Json<Model>, AppError> {
    let patch = patch.validate()?;
    let row = state
        .connections
        .update(&user.id, &id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    ctx.logger().info(&format!("updated connection {id}"));

    Ok(response::Json(row))
}

pub async fn delete(
    extract::State(state): extract::State<AppState>,
    Session { user, .. }: Session,
    ctx: ReqScopedState,
    extract::Path(id): extract::Path<String>,
) -> Result<StatusCode, AppError> {
    if state.connections.delete(&user.id, &id).await? {
        ctx.logger().info(&format!("deleted connection {id}"));
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
