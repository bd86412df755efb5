//! Bilingual restaurant catalog with keyword and semantic search, user
//! reviews and favorites.

pub mod aggregation;
pub mod api;
pub mod config;
pub mod embedding;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
