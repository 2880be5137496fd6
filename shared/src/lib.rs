//! Shared types and rules for the Depot distribution platform
//!
//! This crate contains the domain models and the pure allocation rules shared
//! between the backend, the browser client (via WASM), and tests.

pub mod allocation;
pub mod models;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use types::*;
pub use validation::*;
