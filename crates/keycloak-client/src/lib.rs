//! Keycloak Admin REST API Client
//!
//! A Rust client for the subset of the Keycloak admin API the Grafana projects plugin
//! relies on: group lookup, group tree maintenance and group memberships.
//!
//! # Example
//!
//! ```no_run
//! use keycloak_client::{KeycloakClient, KeycloakClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Authenticate with the admin-cli password grant
//! let client = KeycloakClient::connect(
//!     "https://keycloak.example.com",
//!     "dso",
//!     "admin",
//!     "admin-password",
//! ).await?;
//!
//! // Resolve a project group and create a child under it
//! let groups = client.find_groups_by_name("acme-shop").await?;
//! if let Some(project) = groups.iter().find(|g| g.name == "acme-shop") {
//!     let grafana = client.create_child_group(&project.id, "grafana").await?;
//!     client.add_user_to_group("user-id", &grafana.id).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Groups**: search by name, fetch with subgroups, create children, delete
//! - **Memberships**: add/remove a user to/from a group
//! - **Mocking**: `MockKeycloakClient` (feature `test-util`) keeps an in-memory group tree

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod keycloak_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KeycloakClient;
pub use error::KeycloakError;
pub use models::*;
pub use keycloak_trait::KeycloakClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockKeycloakClient;
