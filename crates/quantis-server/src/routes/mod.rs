//! Route modules for the Quantis API server.

pub mod health;
pub mod plan;
