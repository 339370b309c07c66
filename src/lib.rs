pub mod adjustment;
pub mod api;
pub mod config;
pub mod decision;
pub mod detection;
pub mod error;
pub mod http_client;
pub mod notify;
pub mod persist;
pub mod pitch;
pub mod progress;
pub mod provider;
pub mod state;
pub mod upload;
