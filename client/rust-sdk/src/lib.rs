pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod scoring;
pub mod storage;
pub mod stores;
pub mod utils;

pub use app::App;
pub use config::ClientConfig;
pub use error::ClientError;
