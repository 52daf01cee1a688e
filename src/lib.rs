pub mod api;
pub mod category;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod search;
pub mod state;
