//! Library exports for nowplaying-proxy, shared between the binary and tests.

pub mod config;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod spotify;
pub mod startup;
pub mod state;
pub mod utils;
