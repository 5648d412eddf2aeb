//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Bearer token verification against Supabase, with lazy identity mapping
//! - Locally issued access/refresh JWTs for password login
//! - AuthedUser / AdminUser extractors for protected routes

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod tokens;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::{AdminUser, AuthedUser};
pub use middleware::auth_middleware;
pub use routes::auth_routes;
