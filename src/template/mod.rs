//! Read-only template catalogue endpoints.

pub mod handlers;
pub mod models;
