//! Infrastructure layer: providers, caches, routing, and services

pub mod cache;
pub mod llm;
pub mod logging;
pub mod retry;
pub mod router;
pub mod services;
