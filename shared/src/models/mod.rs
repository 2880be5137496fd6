//! Domain models for the Depot distribution platform

mod catalog;
mod order;
mod stock;

pub use catalog::*;
pub use order::*;
pub use stock::*;
