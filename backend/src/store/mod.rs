//! Storage seam for the Depot distribution platform
//!
//! [`Store`] serves reads and single-row catalog writes. Anything that must
//! change several rows at once goes through a [`StoreTx`]: the caller opens
//! one with [`Store::begin`], locks and reads the rows it needs, writes, and
//! calls [`StoreTx::commit`]. Dropping a transaction without committing rolls
//! it back, so an early `?` return never leaves partial writes behind.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateProductInput, Customer,
    CustomerQuery, OrderDetail, OrderItemBatch, OrderStatus, OrderSummary, PendingDemand, Product,
    SalesOrder, SalesOrderItem, StockBatch, StockRecord, StockVariant, StockWithBatches, Supplier,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Reads and catalog writes
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Check that the backing store answers
    async fn ping(&self) -> AppResult<()>;

    // Catalog
    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>>;
    async fn create_supplier(&self, name: &str) -> AppResult<Supplier>;
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    async fn create_product(&self, input: &CreateProductInput) -> AppResult<Product>;
    async fn list_bottle_sizes(&self) -> AppResult<Vec<BottleSize>>;
    async fn create_bottle_size(&self, input: &CreateBottleSizeInput) -> AppResult<BottleSize>;
    /// Matching retailers for the requested page, and the total match count
    async fn list_customers(&self, query: &CustomerQuery) -> AppResult<(Vec<Customer>, u64)>;
    async fn create_customer(&self, input: &CreateCustomerInput) -> AppResult<Customer>;
    /// Returns false when no such retailer exists
    async fn delete_customer(&self, customer_id: Uuid) -> AppResult<bool>;

    // Stock
    async fn list_stock(&self, include_empty: bool) -> AppResult<Vec<StockWithBatches>>;
    async fn find_stock(&self, stock_id: Uuid) -> AppResult<Option<StockRecord>>;
    /// Batches of a stock record with remaining quantity, oldest first
    async fn available_batches(&self, stock_id: Uuid) -> AppResult<Vec<StockBatch>>;
    async fn product_variants(&self, product_id: Uuid) -> AppResult<Vec<StockVariant>>;

    // Orders
    async fn list_orders(&self, status: Option<OrderStatus>) -> AppResult<Vec<OrderSummary>>;
    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<OrderDetail>>;
    /// One row per line of every pending order, with the line's current stock
    async fn pending_demand(&self) -> AppResult<Vec<PendingDemand>>;
}

/// Row-level operations inside one transaction.
///
/// `lock_*` methods read a row and hold it against concurrent writers until
/// the transaction ends. Callers lock a stock record before any of its
/// batches.
#[async_trait]
pub trait StoreTx: Send {
    async fn product_exists(&mut self, product_id: Uuid) -> AppResult<bool>;
    async fn bottle_size_exists(&mut self, size_id: Uuid) -> AppResult<bool>;
    async fn customer_exists(&mut self, customer_id: Uuid) -> AppResult<bool>;

    // Stock
    async fn lock_stock(&mut self, stock_id: Uuid) -> AppResult<Option<StockRecord>>;
    /// Lock the stock record of a (product, size) pair, creating it empty
    /// on first use
    async fn ensure_stock(&mut self, product_id: Uuid, size_id: Uuid) -> AppResult<StockRecord>;
    async fn set_stock_quantity(&mut self, stock_id: Uuid, quantity: i32) -> AppResult<()>;
    /// Read a batch without locking it
    async fn find_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>>;
    async fn lock_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>>;
    async fn insert_batch(&mut self, stock_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<StockBatch>;
    async fn update_batch(&mut self, batch_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<()>;
    async fn delete_batch(&mut self, batch_id: Uuid) -> AppResult<()>;

    // Orders
    async fn insert_order(&mut self, customer_id: Uuid) -> AppResult<SalesOrder>;
    async fn insert_order_item(
        &mut self,
        order_id: Uuid,
        stock_id: Uuid,
        quantity_ordered: i32,
    ) -> AppResult<SalesOrderItem>;
    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<SalesOrder>>;
    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<SalesOrderItem>>;
    async fn insert_order_item_batch(
        &mut self,
        item_id: Uuid,
        batch_id: Uuid,
        batch_code: &str,
        quantity: i32,
    ) -> AppResult<OrderItemBatch>;
    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()>;
    /// Delete every line of an order (and their batch records); returns the
    /// number of lines removed
    async fn delete_order_items(&mut self, order_id: Uuid) -> AppResult<u64>;
    async fn delete_order(&mut self, order_id: Uuid) -> AppResult<u64>;

    /// Make every write of this transaction visible at once
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
