use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{self, ConnectInfo},
    http::StatusCode,
    middleware,
    response::Response,
    routing, Router,
};
use chrono::Utc;
use tower_http::timeout::TimeoutLayer;
use ulid::Ulid;

use crate::{
    framework::{
        self, cors::cors, logger::LoggerInterface, session::bearer_token, system::User, AppError,
        AppState, ReqScopedState,
    },
    openapi::{connections_route, session_route},
};

pub fn mk_router(shared_state: AppState, timeout: Duration) -> Router {
    let cors_policy = shared_state.cors.clone();

    Router::new()
        .nest(
            connections_route::PATH,
            connections_route::mk_router().route_layer(middleware::from_fn(auth)),
        )
        .nest(
            session_route::PATH,
            session_route::mk_router().route_layer(middleware::from_fn(auth)),
        )
        .route("/health", routing::get(|| async { StatusCode::NO_CONTENT }))
        .layer(middleware::from_fn(log))
        .layer(middleware::from_fn_with_state(shared_state.clone(), setup))
        .layer(TimeoutLayer::new(timeout))
        // 認証エラーやタイムアウトのレスポンスにも CORS ヘッダーを付けるため一番外側
        .layer(middleware::from_fn_with_state(cors_policy, cors))
        .with_state(shared_state)
}

async fn setup(
    extract::State(state): extract::State<AppState>,
    mut req: extract::Request,
    next: middleware::Next,
) -> Response {
    let req_id: Ulid = Ulid::new();
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let mut req_scoped_state = ReqScopedState::new(req_id, None, &req, remote_addr.as_ref());

    if let Some(token) = bearer_token(req.headers()) {
        match framework::find_session(&state.verifier, token) {
            Ok(session) => {
                req.extensions_mut().insert(session.clone());
                req_scoped_state.session = Some(session);
            }
            Err(e) => req_scoped_state
                .logger()
                .warning(&format!("access token rejected: {e}")),
        }
    }

    req.extensions_mut().insert(req_scoped_state);

    next.run(req).await
}

async fn log(req: extract::Request, next: middleware::Next) -> Result<Response, AppError> {
    let item = req
        .extensions()
        .get::<ReqScopedState>()
        .cloned()
        .ok_or_else(|| AppError::Config("request scoped state is not set up".into()))?;

    let caller = match item.user() {
        User::Authenticated(user) => user.id,
        User::Anonymous => "anonymous".to_string(),
    };
    item.logger().info(&format!("request started by {caller}"));

    let r = next.run(req).await;

    let elapsed = Utc::now() - item.ts;
    item.logger().info(&format!(
        "request finished with {} in {}ms",
        r.status(),
        elapsed.num_milliseconds()
    ));
    Ok(r)
}

async fn auth(req: extract::Request, next: middleware::Next) -> Result<Response, AppError> {
    let authenticated = req
        .extensions()
        .get::<ReqScopedState>()
        .map(|item| item.session.is_some());

    match authenticated {
        Some(true) => Ok(next.run(req).await),
        Some(false) => Err(AppError::Unauthorized(Some(
            "missing or invalid bearer token".into(),
        ))),
        None => Err(AppError::Config("request scoped state is not set up".into())),
    }
}
