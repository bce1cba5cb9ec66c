//! pawtrack: a pet-care record keeper with local-first storage and
//! optional remote synchronization.
//!
//! Records live in an embedded SQLite document store and are mirrored to a
//! remote collection store when one is configured. The [`sync`] module holds
//! the engine, change queue, fingerprinting, and status reporting; [`db`]
//! the local document store; [`server`] the remote store's HTTP service.

pub mod config;
pub mod db;
pub mod models;
pub mod server;
pub mod sync;
