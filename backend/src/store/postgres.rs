//! PostgreSQL store
//!
//! Transactions map onto database transactions; `lock_*` reads use
//! `SELECT ... FOR UPDATE`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::error::{AppError, AppResult};
use crate::models::{
    BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateProductInput, Customer,
    CustomerQuery, OrderDetail, OrderItemBatch, OrderLineDetail, OrderStatus, OrderSummary,
    PendingDemand, Product, SalesOrder, SalesOrderItem, StockBatch, StockRecord, StockVariant,
    StockWithBatches, Supplier,
};

const STOCK_COLUMNS: &str = "id, product_id, size_id, quantity, created_at";
const BATCH_COLUMNS: &str = "id, product_stock_id, batch_code, quantity, created_at";
const ORDER_COLUMNS: &str = "id, customer_id, status, created_at, completed_at";
const ITEM_COLUMNS: &str = "id, sales_order_id, product_stock_id, quantity_ordered, created_at";
const ITEM_BATCH_COLUMNS: &str =
    "id, sales_order_item_id, stock_batch_id, batch_code, quantity, created_at";

// Row types. Shared models stay free of sqlx, so rows convert into them here.

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    supplier_id: Uuid,
    name: String,
    short_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            supplier_id: row.supplier_id,
            name: row.name,
            short_name: row.short_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BottleSizeRow {
    id: Uuid,
    name: Option<String>,
    size_ml: i32,
    weight_kg: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl From<BottleSizeRow> for BottleSize {
    fn from(row: BottleSizeRow) -> Self {
        BottleSize {
            id: row.id,
            name: row.name,
            size_ml: row.size_ml,
            weight_kg: row.weight_kg,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    license_number: Option<String>,
    route_number: Option<String>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            address: row.address,
            license_number: row.license_number,
            route_number: row.route_number,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    product_id: Uuid,
    size_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<StockRow> for StockRecord {
    fn from(row: StockRow) -> Self {
        StockRecord {
            id: row.id,
            product_id: row.product_id,
            size_id: row.size_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    product_stock_id: Uuid,
    batch_code: String,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for StockBatch {
    fn from(row: BatchRow) -> Self {
        StockBatch {
            id: row.id,
            product_stock_id: row.product_stock_id,
            batch_code: row.batch_code,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

/// Stock listing row before its batches are attached
#[derive(Debug, FromRow)]
struct StockListRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_short_name: Option<String>,
    size_id: Uuid,
    size_name: Option<String>,
    size_ml: i32,
    quantity: i32,
}

#[derive(Debug, FromRow)]
struct VariantRow {
    stock_id: Uuid,
    size_id: Uuid,
    size_ml: i32,
    size_name: Option<String>,
    quantity: i32,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

fn parse_status(status: &str) -> AppResult<OrderStatus> {
    OrderStatus::from_str(status)
        .ok_or_else(|| AppError::Internal(format!("Unknown order status '{}'", status)))
}

impl TryFrom<OrderRow> for SalesOrder {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        Ok(SalesOrder {
            id: row.id,
            customer_id: row.customer_id,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderSummaryRow {
    id: Uuid,
    customer_id: Uuid,
    customer_name: String,
    status: String,
    item_count: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    sales_order_id: Uuid,
    product_stock_id: Uuid,
    quantity_ordered: i32,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for SalesOrderItem {
    fn from(row: ItemRow) -> Self {
        SalesOrderItem {
            id: row.id,
            sales_order_id: row.sales_order_id,
            product_stock_id: row.product_stock_id,
            quantity_ordered: row.quantity_ordered,
            created_at: row.created_at,
        }
    }
}

/// Order line joined with its stock record and product
#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    sales_order_id: Uuid,
    product_stock_id: Uuid,
    quantity_ordered: i32,
    created_at: DateTime<Utc>,
    product_id: Uuid,
    product_name: String,
    size_ml: i32,
    stock_quantity: i32,
}

#[derive(Debug, FromRow)]
struct ItemBatchRow {
    id: Uuid,
    sales_order_item_id: Uuid,
    stock_batch_id: Option<Uuid>,
    batch_code: String,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<ItemBatchRow> for OrderItemBatch {
    fn from(row: ItemBatchRow) -> Self {
        OrderItemBatch {
            id: row.id,
            sales_order_item_id: row.sales_order_item_id,
            stock_batch_id: row.stock_batch_id,
            batch_code: row.batch_code,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DemandRow {
    product_stock_id: Uuid,
    product_name: String,
    size_ml: i32,
    quantity_ordered: i32,
    available: i32,
}

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, created_at FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    async fn create_supplier(&self, name: &str) -> AppResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(
            "INSERT INTO suppliers (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, supplier_id, name, short_name, created_at FROM products ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(&self, input: &CreateProductInput) -> AppResult<Product> {
        let supplier_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(input.supplier_id)
                .fetch_one(&self.db)
                .await?;
        if !supplier_exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (supplier_id, name, short_name)
            VALUES ($1, $2, $3)
            RETURNING id, supplier_id, name, short_name, created_at
            "#,
        )
        .bind(input.supplier_id)
        .bind(&input.name)
        .bind(&input.short_name)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list_bottle_sizes(&self) -> AppResult<Vec<BottleSize>> {
        let rows = sqlx::query_as::<_, BottleSizeRow>(
            "SELECT id, name, size_ml, weight_kg, created_at FROM bottle_sizes ORDER BY size_ml",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(BottleSize::from).collect())
    }

    async fn create_bottle_size(&self, input: &CreateBottleSizeInput) -> AppResult<BottleSize> {
        let row = sqlx::query_as::<_, BottleSizeRow>(
            r#"
            INSERT INTO bottle_sizes (name, size_ml, weight_kg)
            VALUES ($1, $2, $3)
            RETURNING id, name, size_ml, weight_kg, created_at
            "#,
        )
        .bind(&input.name)
        .bind(input.size_ml)
        .bind(input.weight_kg)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn list_customers(&self, query: &CustomerQuery) -> AppResult<(Vec<Customer>, u64)> {
        let pagination = query.pagination();
        let search = query.search_term();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')",
        )
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, address, license_number, route_number, user_id, created_at
            FROM customers
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(i64::from(pagination.per_page))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        Ok((rows.into_iter().map(Customer::from).collect(), total.max(0) as u64))
    }

    async fn create_customer(&self, input: &CreateCustomerInput) -> AppResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (name, address, license_number, route_number, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, address, license_number, route_number, user_id, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.license_number)
        .bind(&input.route_number)
        .bind(input.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn delete_customer(&self, customer_id: Uuid) -> AppResult<bool> {
        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales_orders WHERE customer_id = $1)")
                .bind(customer_id)
                .fetch_one(&self.db)
                .await?;
        if has_orders {
            return Err(AppError::Conflict(
                "Retailer still has orders and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_stock(&self, include_empty: bool) -> AppResult<Vec<StockWithBatches>> {
        let rows = sqlx::query_as::<_, StockListRow>(
            r#"
            SELECT ps.id, p.id AS product_id, p.name AS product_name,
                   p.short_name AS product_short_name, s.id AS size_id,
                   s.name AS size_name, s.size_ml, ps.quantity
            FROM product_stock ps
            JOIN products p ON p.id = ps.product_id
            JOIN bottle_sizes s ON s.id = ps.size_id
            WHERE $1 OR ps.quantity <> 0
            ORDER BY p.name, s.size_ml
            "#,
        )
        .bind(include_empty)
        .fetch_all(&self.db)
        .await?;

        let stock_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let batch_rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches WHERE product_stock_id = ANY($1) ORDER BY created_at DESC",
            BATCH_COLUMNS
        ))
        .bind(&stock_ids)
        .fetch_all(&self.db)
        .await?;

        let mut batches: HashMap<Uuid, Vec<StockBatch>> = HashMap::new();
        for row in batch_rows {
            batches.entry(row.product_stock_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| StockWithBatches {
                batches: batches.remove(&row.id).unwrap_or_default(),
                id: row.id,
                product_id: row.product_id,
                product_name: row.product_name,
                product_short_name: row.product_short_name,
                size_id: row.size_id,
                size_name: row.size_name,
                size_ml: row.size_ml,
                quantity: row.quantity,
            })
            .collect())
    }

    async fn find_stock(&self, stock_id: Uuid) -> AppResult<Option<StockRecord>> {
        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {} FROM product_stock WHERE id = $1",
            STOCK_COLUMNS
        ))
        .bind(stock_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StockRecord::from))
    }

    async fn available_batches(&self, stock_id: Uuid) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches WHERE product_stock_id = $1 AND quantity > 0 ORDER BY created_at",
            BATCH_COLUMNS
        ))
        .bind(stock_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(StockBatch::from).collect())
    }

    async fn product_variants(&self, product_id: Uuid) -> AppResult<Vec<StockVariant>> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT ps.id AS stock_id, s.id AS size_id, s.size_ml, s.name AS size_name, ps.quantity
            FROM product_stock ps
            JOIN bottle_sizes s ON s.id = ps.size_id
            WHERE ps.product_id = $1
            ORDER BY s.size_ml
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StockVariant {
                stock_id: row.stock_id,
                size_id: row.size_id,
                size_ml: row.size_ml,
                size_name: row.size_name,
                quantity: row.quantity,
            })
            .collect())
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> AppResult<Vec<OrderSummary>> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r#"
            SELECT o.id, o.customer_id, c.name AS customer_name, o.status,
                   (SELECT COUNT(*) FROM sales_order_items i WHERE i.sales_order_id = o.id) AS item_count,
                   o.created_at
            FROM sales_orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE ($1::text IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    id: row.id,
                    customer_id: row.customer_id,
                    customer_name: row.customer_name,
                    status: parse_status(&row.status)?,
                    item_count: row.item_count,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn order_detail(&self, order_id: Uuid) -> AppResult<Option<OrderDetail>> {
        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM sales_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?;
        let Some(order) = order else {
            return Ok(None);
        };
        let order = SalesOrder::try_from(order)?;

        let customer_name: String = sqlx::query_scalar("SELECT name FROM customers WHERE id = $1")
            .bind(order.customer_id)
            .fetch_optional(&self.db)
            .await?
            .unwrap_or_default();

        let line_rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT i.id, i.sales_order_id, i.product_stock_id, i.quantity_ordered, i.created_at,
                   p.id AS product_id, p.name AS product_name, s.size_ml,
                   ps.quantity AS stock_quantity
            FROM sales_order_items i
            JOIN product_stock ps ON ps.id = i.product_stock_id
            JOIN products p ON p.id = ps.product_id
            JOIN bottle_sizes s ON s.id = ps.size_id
            WHERE i.sales_order_id = $1
            ORDER BY i.created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let item_ids: Vec<Uuid> = line_rows.iter().map(|r| r.id).collect();
        let batch_rows = sqlx::query_as::<_, ItemBatchRow>(&format!(
            "SELECT {} FROM order_item_batches WHERE sales_order_item_id = ANY($1) ORDER BY created_at",
            ITEM_BATCH_COLUMNS
        ))
        .bind(&item_ids)
        .fetch_all(&self.db)
        .await?;

        let mut allocations: HashMap<Uuid, Vec<OrderItemBatch>> = HashMap::new();
        for row in batch_rows {
            allocations
                .entry(row.sales_order_item_id)
                .or_default()
                .push(row.into());
        }

        let lines = line_rows
            .into_iter()
            .map(|row| OrderLineDetail {
                allocations: allocations.remove(&row.id).unwrap_or_default(),
                item: SalesOrderItem {
                    id: row.id,
                    sales_order_id: row.sales_order_id,
                    product_stock_id: row.product_stock_id,
                    quantity_ordered: row.quantity_ordered,
                    created_at: row.created_at,
                },
                product_id: row.product_id,
                product_name: row.product_name,
                size_ml: row.size_ml,
                stock_quantity: row.stock_quantity,
            })
            .collect();

        Ok(Some(OrderDetail {
            order,
            customer_name,
            lines,
        }))
    }

    async fn pending_demand(&self) -> AppResult<Vec<PendingDemand>> {
        let rows = sqlx::query_as::<_, DemandRow>(
            r#"
            SELECT ps.id AS product_stock_id, p.name AS product_name, s.size_ml,
                   i.quantity_ordered, ps.quantity AS available
            FROM sales_order_items i
            JOIN sales_orders o ON o.id = i.sales_order_id
            JOIN product_stock ps ON ps.id = i.product_stock_id
            JOIN products p ON p.id = ps.product_id
            JOIN bottle_sizes s ON s.id = ps.size_id
            WHERE o.status = 'pending'
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PendingDemand {
                product_stock_id: row.product_stock_id,
                product_name: row.product_name,
                size_ml: row.size_ml,
                quantity_ordered: row.quantity_ordered,
                available: row.available,
            })
            .collect())
    }
}

/// An open database transaction; rolled back by sqlx when dropped
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn exists(&mut self, sql: &str, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn product_exists(&mut self, product_id: Uuid) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id)
            .await
    }

    async fn bottle_size_exists(&mut self, size_id: Uuid) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM bottle_sizes WHERE id = $1)", size_id)
            .await
    }

    async fn customer_exists(&mut self, customer_id: Uuid) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)", customer_id)
            .await
    }

    async fn lock_stock(&mut self, stock_id: Uuid) -> AppResult<Option<StockRecord>> {
        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {} FROM product_stock WHERE id = $1 FOR UPDATE",
            STOCK_COLUMNS
        ))
        .bind(stock_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(StockRecord::from))
    }

    async fn ensure_stock(&mut self, product_id: Uuid, size_id: Uuid) -> AppResult<StockRecord> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, size_id, quantity)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id, size_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(size_id)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {} FROM product_stock WHERE product_id = $1 AND size_id = $2 FOR UPDATE",
            STOCK_COLUMNS
        ))
        .bind(product_id)
        .bind(size_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn set_stock_quantity(&mut self, stock_id: Uuid, quantity: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE product_stock SET quantity = $2 WHERE id = $1")
            .bind(stock_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock".to_string()));
        }
        Ok(())
    }

    async fn find_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(StockBatch::from))
    }

    async fn lock_batch(&mut self, batch_id: Uuid) -> AppResult<Option<StockBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches WHERE id = $1 FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(StockBatch::from))
    }

    async fn insert_batch(&mut self, stock_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<StockBatch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            INSERT INTO stock_batches (product_stock_id, batch_code, quantity)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(stock_id)
        .bind(batch_code)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn update_batch(&mut self, batch_id: Uuid, batch_code: &str, quantity: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE stock_batches SET batch_code = $2, quantity = $3 WHERE id = $1")
            .bind(batch_id)
            .bind(batch_code)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock batch".to_string()));
        }
        Ok(())
    }

    async fn delete_batch(&mut self, batch_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM stock_batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock batch".to_string()));
        }
        Ok(())
    }

    async fn insert_order(&mut self, customer_id: Uuid) -> AppResult<SalesOrder> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO sales_orders (customer_id, status) VALUES ($1, 'pending') RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn insert_order_item(
        &mut self,
        order_id: Uuid,
        stock_id: Uuid,
        quantity_ordered: i32,
    ) -> AppResult<SalesOrderItem> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO sales_order_items (sales_order_id, product_stock_id, quantity_ordered)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .bind(stock_id)
        .bind(quantity_ordered)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<SalesOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM sales_orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(SalesOrder::try_from).transpose()
    }

    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<SalesOrderItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM sales_order_items WHERE sales_order_id = $1 ORDER BY created_at",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(SalesOrderItem::from).collect())
    }

    async fn insert_order_item_batch(
        &mut self,
        item_id: Uuid,
        batch_id: Uuid,
        batch_code: &str,
        quantity: i32,
    ) -> AppResult<OrderItemBatch> {
        let row = sqlx::query_as::<_, ItemBatchRow>(&format!(
            r#"
            INSERT INTO order_item_batches (sales_order_item_id, stock_batch_id, batch_code, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            ITEM_BATCH_COLUMNS
        ))
        .bind(item_id)
        .bind(batch_id)
        .bind(batch_code)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales_orders
            SET status = $2,
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE NULL END
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Order".to_string()));
        }
        Ok(())
    }

    async fn delete_order_items(&mut self, order_id: Uuid) -> AppResult<u64> {
        sqlx::query(
            r#"
            DELETE FROM order_item_batches
            WHERE sales_order_item_id IN (SELECT id FROM sales_order_items WHERE sales_order_id = $1)
            "#,
        )
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        let result = sqlx::query("DELETE FROM sales_order_items WHERE sales_order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order(&mut self, order_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sales_orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
