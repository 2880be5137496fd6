//! Shortage report over pending orders

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{PendingDemand, ShortageLine};
use crate::store::Store;

/// Read-only shortage reporter
#[derive(Clone)]
pub struct ShortageReporter {
    store: Arc<dyn Store>,
}

impl ShortageReporter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Variants whose pending demand exceeds their current stock
    pub async fn report(&self) -> AppResult<Vec<ShortageLine>> {
        let demand = self.store.pending_demand().await?;
        let shortages = aggregate_shortages(&demand);
        tracing::debug!(lines = demand.len(), shortages = shortages.len(), "Shortage report built");
        Ok(shortages)
    }
}

/// Sum pending demand per stock record and keep the ones stock cannot cover.
///
/// Sorted by product name, then bottle size.
pub fn aggregate_shortages(demand: &[PendingDemand]) -> Vec<ShortageLine> {
    let mut by_stock: HashMap<Uuid, ShortageLine> = HashMap::new();

    for row in demand {
        let line = by_stock
            .entry(row.product_stock_id)
            .or_insert_with(|| ShortageLine {
                product_stock_id: row.product_stock_id,
                product_name: row.product_name.clone(),
                size_ml: row.size_ml,
                qty_required: 0,
                total_available: i64::from(row.available),
                shortage: 0,
            });
        line.qty_required += i64::from(row.quantity_ordered);
    }

    let mut lines: Vec<ShortageLine> = by_stock
        .into_values()
        .map(|mut line| {
            line.shortage = shared::shortage(line.qty_required, line.total_available);
            line
        })
        .filter(|line| line.shortage > 0)
        .collect();

    lines.sort_by(|a, b| {
        a.product_name
            .cmp(&b.product_name)
            .then(a.size_ml.cmp(&b.size_ml))
            .then(a.product_stock_id.cmp(&b.product_stock_id))
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(stock_id: Uuid, name: &str, size_ml: i32, ordered: i32, available: i32) -> PendingDemand {
        PendingDemand {
            product_stock_id: stock_id,
            product_name: name.to_string(),
            size_ml,
            quantity_ordered: ordered,
            available,
        }
    }

    #[test]
    fn test_demand_is_summed_per_variant() {
        let stock = Uuid::new_v4();
        let rows = vec![
            demand(stock, "Pilsner", 330, 40, 50),
            demand(stock, "Pilsner", 330, 30, 50),
        ];

        let report = aggregate_shortages(&rows);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].qty_required, 70);
        assert_eq!(report[0].total_available, 50);
        assert_eq!(report[0].shortage, 20);
    }

    #[test]
    fn test_covered_demand_is_omitted() {
        let rows = vec![demand(Uuid::new_v4(), "Vodka", 750, 10, 10)];
        assert!(aggregate_shortages(&rows).is_empty());
    }

    #[test]
    fn test_sorted_by_name_then_size() {
        let rows = vec![
            demand(Uuid::new_v4(), "Whisky", 700, 5, 0),
            demand(Uuid::new_v4(), "Gin", 1000, 5, 0),
            demand(Uuid::new_v4(), "Gin", 500, 5, 0),
        ];

        let report = aggregate_shortages(&rows);
        let keys: Vec<(&str, i32)> = report
            .iter()
            .map(|l| (l.product_name.as_str(), l.size_ml))
            .collect();
        assert_eq!(keys, vec![("Gin", 500), ("Gin", 1000), ("Whisky", 700)]);
    }
}
