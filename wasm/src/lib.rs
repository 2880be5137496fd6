//! WebAssembly module for the Depot distribution platform
//!
//! Runs the allocation rules in the browser so an order line can be checked
//! and clamped before completion is requested from the backend:
//! - Row edits (add, remove, choose batch, set quantity) with per-batch clamping
//! - Allocation status (under / exact / over)
//! - Line submission into flattened allocation entries

use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::allocation::*;
pub use shared::models::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

/// Largest quantity a row may take from a batch
#[wasm_bindgen]
pub fn clamp_allocation_quantity(remaining: i32, allocated_elsewhere: i32, requested: i32) -> i32 {
    clamp_quantity(remaining, i64::from(allocated_elsewhere), requested)
}

/// Compare an allocated total with the ordered quantity
#[wasm_bindgen]
pub fn allocation_status(total_allocated: i32, quantity_ordered: i32) -> String {
    let status = AllocationStatus::compare(i64::from(total_allocated), i64::from(quantity_ordered));
    status_name(status).to_string()
}

/// Summary of a line plan given as JSON
#[wasm_bindgen]
pub fn summarize_line(plan_json: &str) -> Result<String, JsValue> {
    summarize_line_json(plan_json).map_err(|e| JsValue::from_str(&e))
}

/// Append an empty row and return the updated plan JSON
#[wasm_bindgen]
pub fn add_row(plan_json: &str) -> Result<String, JsValue> {
    add_row_json(plan_json).map_err(|e| JsValue::from_str(&e))
}

/// Remove a row (never the last one) and return the updated plan JSON
#[wasm_bindgen]
pub fn remove_row(plan_json: &str, index: usize) -> Result<String, JsValue> {
    remove_row_json(plan_json, index).map_err(|e| JsValue::from_str(&e))
}

/// Choose a row's batch, or clear it with `None`, and return the updated
/// plan JSON. The row's quantity is clamped against the new batch.
#[wasm_bindgen]
pub fn set_row_batch(plan_json: &str, index: usize, batch_id: Option<String>) -> Result<String, JsValue> {
    set_row_batch_json(plan_json, index, batch_id.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Set a row's quantity and return the updated plan JSON
#[wasm_bindgen]
pub fn set_row_quantity(plan_json: &str, index: usize, requested: i32) -> Result<String, JsValue> {
    set_row_quantity_json(plan_json, index, requested).map_err(|e| JsValue::from_str(&e))
}

/// Flatten a line plan into allocation entries, JSON in and out
#[wasm_bindgen]
pub fn submit_line(plan_json: &str) -> Result<String, JsValue> {
    submit_line_json(plan_json).map_err(|e| JsValue::from_str(&e))
}

fn status_name(status: AllocationStatus) -> &'static str {
    match status {
        AllocationStatus::UnderAllocated => "under_allocated",
        AllocationStatus::ExactMatch => "exact_match",
        AllocationStatus::OverAllocated => "over_allocated",
    }
}

fn parse_plan(plan_json: &str) -> Result<LinePlan, String> {
    serde_json::from_str(plan_json).map_err(|e| format!("Invalid line plan JSON: {}", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn summarize_line_json(plan_json: &str) -> Result<String, String> {
    let plan = parse_plan(plan_json)?;
    to_json(&plan.summary())
}

fn add_row_json(plan_json: &str) -> Result<String, String> {
    let mut plan = parse_plan(plan_json)?;
    plan.add_row();
    to_json(&plan)
}

fn remove_row_json(plan_json: &str, index: usize) -> Result<String, String> {
    let mut plan = parse_plan(plan_json)?;
    plan.remove_row(index).map_err(|e| e.to_string())?;
    to_json(&plan)
}

fn set_row_batch_json(plan_json: &str, index: usize, batch_id: Option<&str>) -> Result<String, String> {
    let mut plan = parse_plan(plan_json)?;
    let batch_id = batch_id
        .map(|id| uuid::Uuid::parse_str(id).map_err(|e| format!("Invalid batch id: {}", e)))
        .transpose()?;
    plan.set_batch(index, batch_id).map_err(|e| e.to_string())?;
    to_json(&plan)
}

fn set_row_quantity_json(plan_json: &str, index: usize, requested: i32) -> Result<String, String> {
    let mut plan = parse_plan(plan_json)?;
    plan.set_quantity(index, requested).map_err(|e| e.to_string())?;
    to_json(&plan)
}

fn submit_line_json(plan_json: &str) -> Result<String, String> {
    let plan = parse_plan(plan_json)?;
    let allocations = plan.submit().map_err(|e| e.to_string())?;
    to_json(&allocations)
}
