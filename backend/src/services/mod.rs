//! Business logic services for the Depot distribution platform

pub mod catalog;
pub mod ledger;
pub mod orders;
pub mod shortage;

pub use catalog::CatalogService;
pub use ledger::{ConsumedBatch, StockLedger};
pub use orders::{OrderCoordinator, OrderView};
pub use shortage::ShortageReporter;
