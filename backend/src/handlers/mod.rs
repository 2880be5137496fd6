//! HTTP handlers for the Depot distribution platform

pub mod catalog;
pub mod health;
pub mod orders;
pub mod shortage;
pub mod stock;

pub use catalog::*;
pub use health::*;
pub use orders::*;
pub use shortage::*;
pub use stock::*;
