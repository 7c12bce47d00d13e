//! # stevedore_vault
//!
//! Secret store access for stevedore.
//!
//! Environment variables marked `IN_VAULT` are read from the secret store of
//! the region being resolved. This crate defines the [`SecretStore`] seam and
//! two implementations:
//!
//! - **VaultClient**: HTTP client for a Vault KV engine (`reqwest`)
//! - **MemoryStore**: in-memory store, loadable from a YAML file, that records
//!   every lookup
//!
//! # Example
//!
//! ```rust,no_run
//! use stevedore_vault::{SecretLocation, SecretStore, VaultClient, VaultConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VaultClient::new(&VaultConfig::from_env().timeout(5))?;
//!
//!     let location = SecretLocation::new("https://vault.example.com", "dev-uk", "webapp", "DATABASE_URL");
//!     let value = client.read(&location).await?;
//!     println!("{} bytes", value.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod store;
pub mod vault;

pub use config::{VaultConfig, VAULT_TOKEN_ENV};
pub use error::{VaultError, VaultResult};
pub use memory::MemoryStore;
pub use store::{SecretLocation, SecretStore};
pub use vault::{parse_secret_response, VaultClient};
