// src/services/mod.rs
//
// Clients for external services used across domain modules

pub mod supabase;

// Re-export commonly used types for convenience
pub use supabase::{IdentityProvider, RemoteUser, SupabaseClient, SupabaseError};
