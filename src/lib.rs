pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod storage;

pub use app::app;
pub use state::AppState;
