//! Validation utilities for the Depot distribution platform

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate that a purchased or ordered quantity is a positive unit count
pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate that a corrected batch quantity is not negative
pub fn validate_batch_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Batch quantity cannot be negative");
    }
    Ok(())
}

/// Apply a batch correction to a stock total
pub fn corrected_total(current_total: i32, old_batch_qty: i32, new_batch_qty: i32) -> Result<i32, &'static str> {
    let total = i64::from(current_total) + i64::from(new_batch_qty) - i64::from(old_batch_qty);
    if total < 0 {
        return Err("Resulting stock cannot be negative");
    }
    i32::try_from(total).map_err(|_| "Stock total exceeds the supported range")
}

/// Units still missing to fulfil `required` from `available`
pub fn shortage(required: i64, available: i64) -> i64 {
    (required - available).max(0)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate that a display name is not blank
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    Ok(())
}
