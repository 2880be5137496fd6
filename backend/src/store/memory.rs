//! In-process store
//!
//! All data sits behind one `tokio::sync::Mutex`. A transaction owns the lock
//! for its whole lifetime and edits a private copy of the state, which only
//! replaces the shared state on commit. Transactions are therefore fully
//! serialized, and an abandoned transaction leaves no trace.
//!
//! Code holding a [`StoreTx`] from this store must not call [`Store`] reads
//! on the same store before the transaction ends; they wait for the same lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::error::{AppError, AppResult};
use crate::models::{
    BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateProductInput, Customer,
    CustomerQuery, OrderDetail, OrderItemBatch, OrderLineDetail, OrderStatus, OrderSummary,
    PendingDemand, Product, SalesOrder, SalesOrderItem, StockBatch, StockRecord, StockVariant,
    StockWithBatches, Supplier,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    suppliers: Vec<Supplier>,
    products: Vec<Product>,
    sizes: Vec<BottleSize>,
    customers: Vec<Customer>,
    stock: HashMap<Uuid, StockRecord>,
    batches: HashMap<Uuid, StockBatch>,
    orders: HashMap<Uuid, SalesOrder>,
    items: HashMap<Uuid, SalesOrderItem>,
    item_batches: HashMap<Uuid, OrderItemBatch>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps keep "newest first" orderings stable
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn size(&self, id: Uuid) -> Option<&BottleSize> {
        self.sizes.iter().find(|s| s.id == id)
    }

    fn customer(&self, id: Uuid) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    fn batches_of(&self, stock_id: Uuid) -> Vec<StockBatch> {
        let mut batches: Vec<StockBatch> = self
            .batches
            .values()
            .filter(|b| b.product_stock_id == stock_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        batches
    }

    fn items_of(&self, order_id: Uuid) -> Vec<SalesOrderItem> {
        let mut items: Vec<SalesOrderItem> = self
            .items
            .values()
            .filter(|i| i.sales_order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.created_at);
        items
    }

    /// Product name and size of a stock record
    fn variant_labels(&self, stock: &StockRecord) -> (String, i32) {
        let product_name = self
            .product(stock.product_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let size_ml = self.size(stock.size_id).map(|s| s.size_ml).unwrap_or_default();
        (product_name, size_ml)
    }
}

/// Store keeping everything in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let state = self.state.lock().await;
        let mut suppliers = state.suppliers.clone();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn create_supplier(&self, name: &str) -> AppResult<Supplier> {
        let mut state = self.state.lock().await;
        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: state.now(),
        };
        state.suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products = state.products.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn create_product(&self, input: &CreateProductInput) -> AppResult<Product> {
        let mut state = self.state.lock().await;
        if !state.suppliers.iter().any(|s| s.id == input.supplier_id) {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        let product = Product {
            id: Uuid::new_v4(),
            supplier_id: input.supplier_id,
            name: input.name.clone(),
            short_name: input.short_name.clone(),
            created_at: state.now(),
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn list_bottle_sizes(&self) -> AppResult<Vec<BottleSize>> {
        let state = self.state.lock().await;
        let mut sizes = state.sizes.clone();
        sizes.sort_by_key(|s| s.size_ml);
        Ok(sizes)
    }

    async fn create_bottle_size(&self, input: &CreateBottleSizeInput) -> AppResult<BottleSize> {
        let mut state = self.state.lock().await;
        let size = BottleSize {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            size_ml: input.size_ml,
            weight_kg: input.weight_kg,
            created_at: state.now(),
        };
        state.sizes.push(size.clone());
        Ok(size)
    }

    async fn list_customers(&self, query: &CustomerQuery) -> AppResult<(Vec<Customer>, u64)> {
        let state = self.state.lock().await;
        let needle = query.search_term().map(str::to_lowercase);
        let mut matching: Vec<Customer> = state
            .customers
            .iter()
            .filter(|c| match &needle {
                Some(n) => c.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let pagination = query.pagination();
        let page = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn create_customer(&self, input: &CreateCustomerInput) -> AppResult<Customer> {
        let mut state = self.state.lock().await;
        let customer = Customer {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            address: input.address.clone(),
            license_number: input.license_number.clone(),
            route_number: input.route_number.clone(),
            user_id: input.user_id,
            created_at: state.now(),
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn delete_customer(&self, customer_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.orders.values().any(|o| o.customer_id == customer_id) {
            return Err(AppError::Conflict(
                "Retailer still has orders and cannot be deleted".to_string(),
            ));
        }
        let before = state.customers.len();
        state.customers.retain(|c| c.id != customer_id);
        Ok(state.customers.len() != before)
    }

    async fn list_stock(&self, include_empty: bool) -> AppResult<Vec<StockWithBatches>> {
        let state = self.state.lock().await;
        let mut rows: Vec<StockWithBatches> = state
            .stock
            .values()
            .filter(|s| include_empty || s.quantity != 0)
            .filter_map(|s| {
                let product = state.product(s.product_id)?;
                let size = state.size(s.size_id)?;
                Some(StockWithBatches {
                    id: s.id,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    product_short_name: product.short_name.clone(),
                    size_id: size.id,
                    size_name: size.name.clone(),
                    size_ml: size.size_ml,
                    quantity: s.quantity,
                    batches: state.batches_of(s.id),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.product_name
                .cmp(&b.product_name)
                .then(a.size_ml.cmp(&b.size_ml))
        });
        Ok(rows)
    }

    async fn find_stock(&self, stock_id: Uuid) -> AppResult<Option<StockRecord>> {
        let state = self.state.lock().await;
        Ok(state.stock.get(&stock_id).cloned())
    }

    async fn available_batches(&self, stock_id: Uuid) -> AppResult<Vec<StockBatch>> {
        let state = self.state.lock().await;
        let mut batches: Vec<StockBatch> = state
            .batches_of(stock_id)
            .into_iter()
            .filter(|b| b.quantity > 0)
            .collect();
        batches.reverse();
        Ok(batches)
    }

    async fn product_variants(&self, product_id: Uuid) -> AppResult<Vec<StockVariant>> {
        let state = self.state.lock().await;
        let mut variants: Vec<StockVariant> = state
            .stock
            .values()
            .filter(|s| s.product_id == product_id)
            .filter_map(|s| {
                let size = state.size(s.size_id)?;
                Some(StockVariant {
                    stock_id: s.id,
                    size_id: size.id,
                    size_ml: size.size_ml,
                    size_name: size.name.clone(),
                    quantity: s.quantity,
                })
            })
            .collect();
        variants.sort_by_key(|v| v.size_ml);
        Ok(variants)
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> AppResult<Vec<OrderSummary>> {
        let state = self.state.lock().await;
        let mut orders: Vec<OrderSummary> = state
            .orders
            .values()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .map(|o| OrderSummary {
                id: o.id,
                customer_id: o.customer_id,
                customer_name: state
                    .customer(o.customer_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                status: o.status,
                item_count: state.items.values().filter(|i| i.sales_order_id == o.id).count() as i64,
                created_at: o.created_at,
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<OrderDetail>> {
        let state = self.state.lock().await;
        let Some(order) = state.orders.get(&order_id).cloned() else {
            return Ok(None);
        };

        let lines = state
            .items_of(order_id)
            .into_iter()
            .map(|item| {
                let stock = state.stock.get(&item.product_stock_id);
                let (product_name, size_ml) =
                    stock.map(|s| state.variant_labels(s)).unwrap_or_default();
                let mut allocations: Vec<OrderItemBatch> = state
                    .item_batches
                    .values()
                    .filter(|b| b.sales_order_item_id == item.id)
                    .cloned()
                    .collect();
                allocations.sort_by_key(|b| b.created_at);
                OrderLineDetail {
                    product_id: stock.map(|s| s.product_id).unwrap_or_default(),
                    product_name,
                    size_ml,
                    stock_quantity: stock.map(|s| s.quantity).unwrap_or_default(),
                    allocations,
                    item,
                }
            })
            .collect();

        Ok(Some(OrderDetail {
            customer_name: state
                .customer(order.customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            order,
            lines,
        }))
    }

    async fn pending_demand(&self) -> AppResult<Vec<PendingDemand>> {
        let state = self.state.lock().await;
        let demand = state
            .items
            .values()
            .filter(|item| {
                state
                    .orders
                    .get(&item.sales_order_id)
                    .is_some_and(|o| o.status == OrderStatus::Pending)
            })
            .filter_map(|item| {
                let stock = state.stock.get(&item.product_stock_id)?;
                let (product_name, size_ml) = state.variant_labels(stock);
                Some(PendingDemand {
                    product_stock_id: stock.id,
                    product_name,
                    size_ml,
                    quantity_ordered: item.quantity_ordered,
                    available: stock.quantity,
                })
            })
            .collect();
        Ok(demand)
    }
}

/// Transaction over a private copy of the state
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn product_exists(&mut self, product_id: Uuid) -> AppResult<bool> {
        Ok(self.working.product(product_id).is_some())
    }

    async fn bottle_size_exists(&mut self, size_id: Uuid) -> AppResult<bool> {
        Ok(self.working.size(size_id).is_some())
    }

    async fn customer_exists(&mut self, customer_id: Uuid) -> AppResult<bool> {
        Ok(self.working.customer(customer_id).is_some())
    }

    async fn lock_stock(&mut self, stock_id: Uuid) -> AppResult<Option<StockRecord>> {
        Ok(self.working.stock.get(&stock_id).cloned())
    }

    async fn ensure_stock(&mut self, product_id: Uuid, size_id: Uuid) -> AppResult<StockRecord> {
        if let Some(existing) = self
            .working
            .stock
            .values()
            .find(|s| s.product_id == product_id && s.size_id == size_id)
        {
            return Ok(existing.clone());
        }
        let record = StockRecord {
            id: Uuid::new_v4(),
            product_id,
            size_id,
            quantity: 0,
            created_at: self.working.now(),
        };
        self.working.stock.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_stock_quantity(&mut self, stock_id: Uuid, quantity: i32) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::InvariantViolation(
                "Stock quantity cannot be negative".to_string(),
            ));
        }
        let record = self
            .working
            .stock
            .get_mut(&stock_id)
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;
        record.quantity = quantity;
        Ok(())
    }

    async fn find_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>> {
        Ok(self.working.batches.get(&batch_id).cloned())
    }

    async fn lock_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>> {
        Ok(self.working.batches.get(&batch_id).cloned())
    }

    async fn insert_batch(&mut self, stock_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<StockBatch> {
        if !self.working.stock.contains_key(&stock_id) {
            return Err(AppError::NotFound("Stock".to_string()));
        }
        let batch = StockBatch {
            id: Uuid::new_v4(),
            product_stock_id: stock_id,
            batch_code: batch_code.to_string(),
            quantity,
            created_at: self.working.now(),
        };
        self.working.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn update_batch(&mut self, batch_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::InvariantViolation(
                "Batch quantity cannot be negative".to_string(),
            ));
        }
        let batch = self
            .working
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;
        batch.batch_code = batch_code.to_string();
        batch.quantity = quantity;
        Ok(())
    }

    async fn delete_batch(&mut self, batch_id: Uuid) -> AppResult<()> {
        if self.working.batches.remove(&batch_id).is_none() {
            return Err(AppError::NotFound("Stock batch".to_string()));
        }
        for record in self.working.item_batches.values_mut() {
            if record.stock_batch_id == Some(batch_id) {
                record.stock_batch_id = None;
            }
        }
        Ok(())
    }

    async fn insert_order(&mut self, customer_id: Uuid) -> AppResult<SalesOrder> {
        let order = SalesOrder {
            id: Uuid::new_v4(),
            customer_id,
            status: OrderStatus::Pending,
            created_at: self.working.now(),
            completed_at: None,
        };
        self.working.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_order_item(
        &mut self,
        order_id: Uuid,
        stock_id: Uuid,
        quantity_ordered: i32,
    ) -> AppResult<SalesOrderItem> {
        if !self.working.stock.contains_key(&stock_id) {
            return Err(AppError::NotFound("Stock".to_string()));
        }
        let item = SalesOrderItem {
            id: Uuid::new_v4(),
            sales_order_id: order_id,
            product_stock_id: stock_id,
            quantity_ordered,
            created_at: self.working.now(),
        };
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<SalesOrder>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<SalesOrderItem>> {
        Ok(self.working.items_of(order_id))
    }

    async fn insert_order_item_batch(
        &mut self,
        item_id: Uuid,
        batch_id: Uuid,
        batch_code: &str,
        quantity: i32,
    ) -> AppResult<OrderItemBatch> {
        let record = OrderItemBatch {
            id: Uuid::new_v4(),
            sales_order_item_id: item_id,
            stock_batch_id: Some(batch_id),
            batch_code: batch_code.to_string(),
            quantity,
            created_at: self.working.now(),
        };
        self.working.item_batches.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let now = self.working.now();
        let order = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        order.status = status;
        order.completed_at = (status == OrderStatus::Completed).then_some(now);
        Ok(())
    }

    async fn delete_order_items(&mut self, order_id: Uuid) -> AppResult<u64> {
        let item_ids: Vec<Uuid> = self
            .working
            .items
            .values()
            .filter(|i| i.sales_order_id == order_id)
            .map(|i| i.id)
            .collect();
        self.working
            .item_batches
            .retain(|_, b| !item_ids.contains(&b.sales_order_item_id));
        for id in &item_ids {
            self.working.items.remove(id);
        }
        Ok(item_ids.len() as u64)
    }

    async fn delete_order(&mut self, order_id: Uuid) -> AppResult<u64> {
        Ok(u64::from(self.working.orders.remove(&order_id).is_some()))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
