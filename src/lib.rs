// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod learning;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::create_router;
