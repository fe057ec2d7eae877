//! Contract archive and authenticity verification.

pub mod handlers;
pub mod models;
