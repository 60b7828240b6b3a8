pub mod connections_route;
pub mod session_route;
