//! Return adjustment calculator.
//!
//! Pure function from an order's lines plus its return records to the
//! billable lines an invoice should carry. No hidden state: recomputing on
//! the same input yields the same output.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{GoodsReturn, OrderItem};

/// One billable line after netting out returns.
#[derive(Debug, Clone, PartialEq)]
pub struct BillableLine {
    pub order_item_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub unit_price: Decimal,
    /// Quantity actually billable (`max(0, ordered - returned)`).
    pub used_quantity: Decimal,
    /// Audit metadata for display.
    pub original_quantity: Decimal,
    pub returned_quantity: Decimal,
}

/// Calculator output. `over_returned` and `orphaned` are data-quality
/// findings for the caller to log; neither is fatal.
#[derive(Debug, Clone, Default)]
pub struct ReturnAdjustment {
    pub lines: Vec<BillableLine>,
    /// Order lines whose summed returns exceeded the ordered quantity
    /// (clamped to zero rather than going negative).
    pub over_returned: Vec<Uuid>,
    /// Return records referencing no line on this order.
    pub orphaned: Vec<Uuid>,
}

/// Net returns off an order's lines. Lines fully returned (`used == 0`) are
/// excluded from the output entirely; they must not become zero-quantity
/// invoice lines.
pub fn billable_lines(order_items: &[OrderItem], returns: &[GoodsReturn]) -> ReturnAdjustment {
    let mut adjustment = ReturnAdjustment::default();

    for ret in returns {
        if !order_items
            .iter()
            .any(|item| item.order_item_id == ret.order_item_id)
        {
            adjustment.orphaned.push(ret.return_id);
        }
    }

    for item in order_items {
        let returned: Decimal = returns
            .iter()
            .filter(|r| r.order_item_id == item.order_item_id)
            .map(|r| r.returned_quantity)
            .sum();

        let used = if returned > item.quantity {
            adjustment.over_returned.push(item.order_item_id);
            Decimal::ZERO
        } else {
            item.quantity - returned
        };

        if used > Decimal::ZERO {
            adjustment.lines.push(BillableLine {
                order_item_id: item.order_item_id,
                item_id: item.item_id,
                item_name: item.item_name.clone(),
                unit_price: item.unit_price,
                used_quantity: used,
                original_quantity: item.quantity,
                returned_quantity: returned,
            });
        }
    }

    adjustment
}

/// Log data-quality findings from one adjustment run. Over-returns and
/// orphaned returns are warnings, never failures.
pub fn log_findings(org_id: Uuid, order_id: Uuid, adjustment: &ReturnAdjustment) {
    for order_item_id in &adjustment.over_returned {
        tracing::warn!(
            org_id = %org_id,
            order_id = %order_id,
            order_item_id = %order_item_id,
            "Returned quantity exceeds ordered quantity; clamped to zero"
        );
    }
    for return_id in &adjustment.orphaned {
        tracing::warn!(
            org_id = %org_id,
            order_id = %order_id,
            return_id = %return_id,
            "Return references an unknown order line; ignored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order_item(quantity: i64) -> OrderItem {
        OrderItem {
            order_item_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            item_name: "Paracetamol 500mg".to_string(),
            quantity: Decimal::new(quantity, 0),
            unit_price: Decimal::new(5, 0),
            created_utc: Utc::now(),
        }
    }

    fn return_of(item: &OrderItem, quantity: i64) -> GoodsReturn {
        GoodsReturn {
            return_id: Uuid::new_v4(),
            org_id: item.org_id,
            order_id: item.order_id,
            order_item_id: item.order_item_id,
            returned_quantity: Decimal::new(quantity, 0),
            reason: None,
            status: "available".to_string(),
            created_by: Uuid::new_v4(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn partial_return_reduces_used_quantity() {
        let item = order_item(10);
        let adjustment = billable_lines(&[item.clone()], &[return_of(&item, 3)]);

        assert_eq!(adjustment.lines.len(), 1);
        assert_eq!(adjustment.lines[0].used_quantity, Decimal::new(7, 0));
        assert_eq!(adjustment.lines[0].original_quantity, Decimal::new(10, 0));
        assert_eq!(adjustment.lines[0].returned_quantity, Decimal::new(3, 0));
    }

    #[test]
    fn multiple_partial_returns_accumulate() {
        let item = order_item(10);
        let returns = vec![return_of(&item, 2), return_of(&item, 3)];
        let adjustment = billable_lines(&[item], &returns);

        assert_eq!(adjustment.lines[0].used_quantity, Decimal::new(5, 0));
        assert_eq!(adjustment.lines[0].returned_quantity, Decimal::new(5, 0));
    }

    #[test]
    fn fully_returned_line_is_excluded() {
        let kept = order_item(4);
        let gone = order_item(6);
        let adjustment = billable_lines(&[kept.clone(), gone.clone()], &[return_of(&gone, 6)]);

        assert_eq!(adjustment.lines.len(), 1);
        assert_eq!(adjustment.lines[0].order_item_id, kept.order_item_id);
        assert!(adjustment.over_returned.is_empty());
    }

    #[test]
    fn over_return_clamps_to_zero_and_is_flagged() {
        let item = order_item(5);
        let adjustment = billable_lines(&[item.clone()], &[return_of(&item, 8)]);

        assert!(adjustment.lines.is_empty());
        assert_eq!(adjustment.over_returned, vec![item.order_item_id]);
    }

    #[test]
    fn orphaned_return_is_reported_not_fatal() {
        let item = order_item(10);
        let other = order_item(1);
        let orphan = return_of(&other, 1);
        let adjustment = billable_lines(&[item], &[orphan.clone()]);

        assert_eq!(adjustment.lines.len(), 1);
        assert_eq!(adjustment.lines[0].used_quantity, Decimal::new(10, 0));
        assert_eq!(adjustment.orphaned, vec![orphan.return_id]);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let item = order_item(10);
        let returns = vec![return_of(&item, 4)];
        let first = billable_lines(std::slice::from_ref(&item), &returns);
        let second = billable_lines(std::slice::from_ref(&item), &returns);

        assert_eq!(first.lines, second.lines);
        assert_eq!(first.over_returned, second.over_returned);
        assert_eq!(first.orphaned, second.orphaned);
    }
}
