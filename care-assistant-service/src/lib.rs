pub mod analysis;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod scratch;
pub mod service;
pub mod storage;

pub use config::Config;
pub use service::{AppState, build_router, create_app};
pub use models::*;
