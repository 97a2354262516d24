//! PostgreSQL persistence for wayfarer: row models, embedded migrations,
//! connection pooling, and per-table query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
