//! Allocation planner tests
//!
//! Tests for the per-line allocation rules including:
//! - Clamp idempotence against a partially allocated batch
//! - Exact-match gate on submission

use proptest::prelude::*;
use shared::{clamp_quantity, AllocationError, AllocationRow, CandidateBatch, LinePlan};
use uuid::Uuid;

fn candidate(remaining: i32) -> CandidateBatch {
    CandidateBatch {
        id: Uuid::new_v4(),
        batch_code: "B1".to_string(),
        remaining,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 120 ordered against B1 = 100 and B2 = 50
    #[test]
    fn test_split_over_two_batches() {
        let b1 = candidate(100);
        let b2 = CandidateBatch {
            batch_code: "B2".to_string(),
            ..candidate(50)
        };
        let mut plan = LinePlan::new(Uuid::new_v4(), 120, vec![b1.clone(), b2.clone()]);

        plan.set_batch(0, Some(b1.id)).unwrap();
        assert_eq!(plan.set_quantity(0, 120).unwrap(), 100);
        plan.add_row();
        plan.set_batch(1, Some(b2.id)).unwrap();
        assert_eq!(plan.set_quantity(1, 20).unwrap(), 20);

        assert!(plan.is_exact_match());
        let allocations = plan.submit().unwrap();
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations.iter().map(|a| a.quantity).sum::<i32>(), 120);
    }

    #[test]
    fn test_second_row_on_same_batch_gets_the_rest() {
        let b1 = candidate(100);
        let mut plan = LinePlan::new(Uuid::new_v4(), 120, vec![b1.clone()]);

        plan.set_batch(0, Some(b1.id)).unwrap();
        plan.set_quantity(0, 70).unwrap();
        plan.add_row();
        plan.set_batch(1, Some(b1.id)).unwrap();

        assert_eq!(plan.max_quantity(1).unwrap(), Some(30));
        assert_eq!(plan.set_quantity(1, 50).unwrap(), 30);
        assert!(plan.is_under_allocated());
    }

    #[test]
    fn test_rows_without_batch_are_not_submitted() {
        let b1 = candidate(100);
        let rows = vec![
            AllocationRow { batch_id: None, quantity: 10 },
            AllocationRow { batch_id: Some(b1.id), quantity: 0 },
        ];
        let plan = LinePlan::with_rows(Uuid::new_v4(), 10, vec![b1], rows);
        assert_eq!(plan.submit(), Err(AllocationError::NoValidRows));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Values above the room left in a batch clamp to exactly that room;
    /// values within it are kept
    #[test]
    fn prop_clamp_idempotence(remaining in 0..500i32, elsewhere in 0..600i64, requested in 0..1000i32) {
        let room = (i64::from(remaining) - elsewhere).max(0) as i32;
        let clamped = clamp_quantity(remaining, elsewhere, requested);

        if requested > room {
            prop_assert_eq!(clamped, room);
        } else {
            prop_assert_eq!(clamped, requested);
        }
        prop_assert_eq!(clamp_quantity(remaining, elsewhere, clamped), clamped);
    }

    /// A plan edit never lets two rows of a line take more than the batch has
    #[test]
    fn prop_plan_rows_respect_batch_remaining(
        remaining in 0..300i32,
        first in 0..400i32,
        second in 0..400i32,
    ) {
        let batch = candidate(remaining);
        let mut plan = LinePlan::new(Uuid::new_v4(), 1000, vec![batch.clone()]);
        plan.set_batch(0, Some(batch.id)).unwrap();
        plan.set_quantity(0, first).unwrap();
        plan.add_row();
        plan.set_batch(1, Some(batch.id)).unwrap();
        plan.set_quantity(1, second).unwrap();

        prop_assert!(plan.total_allocated() <= i64::from(remaining));
    }

    /// Submission succeeds only when the valid rows add up to the ordered
    /// quantity
    #[test]
    fn prop_exact_match_gate(ordered in 1..200i32, quantities in prop::collection::vec(0..100i32, 1..5)) {
        let rows: Vec<AllocationRow> = quantities
            .iter()
            .map(|q| AllocationRow::new(Uuid::new_v4(), *q))
            .collect();
        let total: i64 = quantities.iter().map(|q| i64::from(*q)).sum();
        let plan = LinePlan::with_rows(Uuid::new_v4(), ordered, vec![], rows);

        match plan.submit() {
            Ok(allocations) => {
                prop_assert_eq!(total, i64::from(ordered));
                let submitted: i64 = allocations.iter().map(|a| i64::from(a.quantity)).sum();
                prop_assert_eq!(submitted, i64::from(ordered));
            }
            Err(_) => prop_assert_ne!(total, i64::from(ordered)),
        }
    }
}
