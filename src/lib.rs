pub mod db;
pub mod framework;
pub mod openapi;
pub mod router;
pub mod settings;
pub mod token_store;
