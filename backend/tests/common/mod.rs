//! Shared fixtures for the backend integration tests

#![allow(dead_code)]

use std::sync::Arc;

use depot_backend::config::{
    Config, DatabaseConfig, LoggingConfig, ServerConfig, StorageBackend, StorageConfig,
};
use depot_backend::models::{
    BatchAllocation, BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateOrderInput,
    CreateProductInput, CreateSupplierInput, Customer, OrderItemInput, Product, PurchaseInput,
    StockBatch, StockRecord, StockWithBatches,
};
use depot_backend::services::{
    CatalogService, OrderCoordinator, OrderView, ShortageReporter, StockLedger,
};
use depot_backend::store::{MemoryStore, Store};
use uuid::Uuid;

/// Configuration for an in-memory test server
pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 0,
        },
        logging: LoggingConfig {
            filter: "warn".to_string(),
            json: false,
        },
    }
}

/// Services over one fresh in-memory store, with a supplier and a retailer
pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub catalog: CatalogService,
    pub ledger: StockLedger,
    pub orders: OrderCoordinator,
    pub shortages: ShortageReporter,
    pub supplier_id: Uuid,
    pub customer: Customer,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(store: Arc<dyn Store>) -> Self {
        let catalog = CatalogService::new(store.clone());

        let supplier = catalog
            .create_supplier(&CreateSupplierInput {
                name: "Northern Spirits".to_string(),
            })
            .await
            .unwrap();
        let customer = catalog
            .create_customer(&CreateCustomerInput {
                name: "Corner Liquor".to_string(),
                address: Some("12 Main St".to_string()),
                license_number: Some("LIC-001".to_string()),
                route_number: Some("R1".to_string()),
                user_id: None,
            })
            .await
            .unwrap();

        Self {
            ledger: StockLedger::new(store.clone()),
            orders: OrderCoordinator::new(store.clone()),
            shortages: ShortageReporter::new(store.clone()),
            supplier_id: supplier.id,
            catalog,
            store,
            customer,
        }
    }

    pub async fn product(&self, name: &str) -> Product {
        self.catalog
            .create_product(&CreateProductInput {
                supplier_id: self.supplier_id,
                name: name.to_string(),
                short_name: None,
            })
            .await
            .unwrap()
    }

    pub async fn size(&self, size_ml: i32) -> BottleSize {
        self.catalog
            .create_bottle_size(&CreateBottleSizeInput {
                name: Some(format!("{} ml", size_ml)),
                size_ml,
                weight_kg: None,
            })
            .await
            .unwrap()
    }

    pub async fn purchase(&self, product: &Product, size: &BottleSize, quantity: i32, code: &str) -> StockBatch {
        self.ledger
            .purchase(&PurchaseInput {
                product_id: product.id,
                size_id: size.id,
                quantity,
                batch_code: code.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn stock(&self, stock_id: Uuid) -> StockRecord {
        self.store.find_stock(stock_id).await.unwrap().unwrap()
    }

    pub async fn stock_listing(&self, stock_id: Uuid) -> StockWithBatches {
        self.ledger
            .list_stock(true)
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.id == stock_id)
            .unwrap()
    }

    pub async fn batch(&self, batch_id: Uuid) -> Option<StockBatch> {
        self.ledger
            .list_stock(true)
            .await
            .unwrap()
            .into_iter()
            .flat_map(|s| s.batches)
            .find(|b| b.id == batch_id)
    }

    pub async fn order(&self, lines: &[(Uuid, i32)]) -> OrderView {
        self.orders
            .create_order(&CreateOrderInput {
                customer_id: self.customer.id,
                items: lines
                    .iter()
                    .map(|&(product_stock_id, quantity)| OrderItemInput {
                        product_stock_id,
                        quantity,
                    })
                    .collect(),
            })
            .await
            .unwrap()
    }
}

/// Allocation entry for the given line of an order
pub fn alloc(line_id: Uuid, batch: &StockBatch, quantity: i32) -> BatchAllocation {
    BatchAllocation {
        sales_order_item_id: line_id,
        stock_batch_id: batch.id,
        quantity,
    }
}
