//! # Identity Module
//!
//! Local users, the mapping records that link them to remote identity-provider
//! users, and the mapper that reconciles the two on login.

pub mod mapper;
pub mod models;
pub mod repository;


pub use mapper::IdentityMapper;
pub use models::{LocalUser, MappingError, UserMapping};
