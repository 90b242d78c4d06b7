//! Secret storage
//!
//! - `SecretStore` trait for looking up API keys and required environment values
//! - `EnvSecretStore` reads the process environment (and `.env` values loaded into it)
//! - `MemorySecretStore` for tests

mod traits;
mod env_store;
mod memory_store;

pub use traits::SecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
