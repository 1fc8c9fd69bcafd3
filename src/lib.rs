pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
