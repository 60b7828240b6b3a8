use crate::framework::AppState;
use axum::{routing, Router};

mod item;
mod root;

/// パス
pub const PATH: &str = "/connections";

pub fn mk_router() -> Router<AppState> {
    Router::new()
        .route(root::PATH, routing::get(root::list).post(root::create))
        .route(
            item::PATH,
            routing::get(item::show)
                .patch(item::update)
                .delete(item::delete),
        )
}
