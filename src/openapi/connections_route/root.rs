use crate::{
    db::connections::{Model, NewConnection},
    framework::{logger::LoggerInterface, AppError, AppState, ReqScopedState, Session},
};
use axum::{extract, http::StatusCode, response};

/// パス
pub const PATH: &str = "/";

/// 自分のつながり一覧. 更新が新しい順.
pub async fn list(
    extract::State(state): extract::State<AppState>,
    Session { user, .. }: Session,
    ctx: ReqScopedState,
) -> Result<response::Json<Vec<Model>>, AppError> {
    let rows = state.connections.list(&user.id).await?;
    ctx.logger()
        .debug(&format!("listed {} connections", rows.len()));

    Ok(response::Json(rows))
}

pub async fn create(
    extract::State(state): extract::State<AppState>,
    Session { user, .. }: Session,
    ctx: ReqScopedState,
    extract::Json(input): extract::Json<NewConnection>,
) -> Result<(StatusCode, response::Json<Model>), AppError> {
    let input = input.validate()?;
    let row = state.connections.create(&user.id, input).await?;
    ctx.logger().info(&format!("created connection {}", row.id));

    Ok((StatusCode::CREATED, response::Json(row)))
}
