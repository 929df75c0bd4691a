pub mod achievements;
pub mod config;
pub mod constants;
pub mod engine;
pub mod render;
pub mod rng;
pub mod score_store;
pub mod session_registry;
pub mod shop;
pub mod store_io;
pub mod types;
pub mod world;
