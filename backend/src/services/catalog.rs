//! Catalog service: suppliers, products, bottle sizes and retailers

use std::sync::Arc;

use shared::{PaginatedResponse, Pagination};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateProductInput,
    CreateSupplierInput, Customer, CustomerQuery, Product, Supplier,
};
use crate::store::Store;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        self.store.list_suppliers().await
    }

    pub async fn create_supplier(&self, input: &CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        let name = checked_name("name", &input.name)?;
        self.store.create_supplier(name).await
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.store.list_products().await
    }

    pub async fn create_product(&self, input: &CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        let input = CreateProductInput {
            supplier_id: input.supplier_id,
            name: checked_name("name", &input.name)?.to_string(),
            short_name: input.short_name.clone(),
        };
        let product = self.store.create_product(&input).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    pub async fn list_bottle_sizes(&self) -> AppResult<Vec<BottleSize>> {
        self.store.list_bottle_sizes().await
    }

    pub async fn create_bottle_size(&self, input: &CreateBottleSizeInput) -> AppResult<BottleSize> {
        input.validate()?;
        self.store.create_bottle_size(input).await
    }

    /// One page of retailers matching the optional name search
    pub async fn list_customers(&self, query: &CustomerQuery) -> AppResult<PaginatedResponse<Customer>> {
        let pagination: Pagination = query.pagination();
        let (customers, total) = self.store.list_customers(query).await?;
        Ok(PaginatedResponse::new(customers, &pagination, total))
    }

    pub async fn create_customer(&self, input: &CreateCustomerInput) -> AppResult<Customer> {
        input.validate()?;
        let input = CreateCustomerInput {
            name: checked_name("name", &input.name)?.to_string(),
            address: input.address.clone(),
            license_number: input.license_number.clone(),
            route_number: input.route_number.clone(),
            user_id: input.user_id,
        };
        let customer = self.store.create_customer(&input).await?;
        info!(customer_id = %customer.id, "Retailer created");
        Ok(customer)
    }

    /// Delete a retailer that has no orders
    pub async fn delete_customer(&self, customer_id: Uuid) -> AppResult<()> {
        if !self.store.delete_customer(customer_id).await? {
            return Err(AppError::NotFound("Retailer".to_string()));
        }
        info!(%customer_id, "Retailer deleted");
        Ok(())
    }
}

fn checked_name<'a>(field: &str, name: &'a str) -> AppResult<&'a str> {
    shared::validate_name(name).map_err(|msg| AppError::validation(field, msg))?;
    Ok(name.trim())
}
