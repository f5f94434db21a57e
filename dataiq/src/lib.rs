//! DataIQ - data catalog quality scoring and lineage discovery
//!
//! This library provides the engine, catalog store and admin surface of the DataIQ server.

pub mod api;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod entity;
pub mod error;
pub mod jobs;
pub mod lineage;
pub mod quality;
pub mod source;
pub mod store;
