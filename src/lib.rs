//! Low-latency sales response engine.
//!
//! Accepts customer messages over HTTP and produces persuasion-informed
//! replies with aggressive latency controls: a two-tier response cache
//! (exact and embedding-similarity), parallel slot extraction and situation
//! classification with a conditional reconcile pass, and multi-provider LLM
//! racing with loser cancellation and tiered model selection.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
