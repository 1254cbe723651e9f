//! # tasq-rs
//!
//! A basic task queue service. Named queues accept opaque payloads; each
//! repeated submission of the same payload raises its score by one, and
//! consumers always take the highest-scored payload, removing it atomically.
//!
//! Provides the queue engine, pluggable score stores (Redis, Postgres,
//! in-memory), an HTTP gateway (axum), and OpenTelemetry observability.

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod model;
pub mod store;
pub mod telemetry;
