pub mod config;
pub mod error;
pub mod query;
pub mod render;
pub mod time;
