//! Invoice derivation: line totals, subtotal, tax, discount, payment status.
//!
//! The discount is applied exactly once, here, inside `total`. All payment
//! arithmetic elsewhere works against `outstanding = total - credit`.

use anyhow::anyhow;
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::{CreateInvoiceItem, PaymentStatus};
use crate::services::money;

/// Derived amounts for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    /// Per-line computed totals, in input order.
    pub line_totals: Vec<Decimal>,
    pub sub_total: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

/// Validate line items and derive all invoice amounts.
pub fn derive_totals(
    items: &[CreateInvoiceItem],
    tax_rate: Decimal,
    discount: Decimal,
) -> Result<InvoiceTotals, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "Invoice must have at least one line item"
        )));
    }
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(anyhow!(
            "Tax rate must be between 0 and 100"
        )));
    }
    if discount < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow!("Discount must not be negative")));
    }

    let mut line_totals = Vec::with_capacity(items.len());
    let mut sub_total = Decimal::ZERO;

    for item in items {
        if item.item_name.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow!("Line item name is required")));
        }
        if item.quantity < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow!(
                "Line item quantity must not be negative"
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow!(
                "Line item price must not be negative"
            )));
        }

        let line_total = money::multiply(item.quantity, item.unit_price);
        sub_total = money::add(sub_total, line_total);
        line_totals.push(line_total);
    }

    let tax_total = money::percent(sub_total, tax_rate);
    let total = money::sub(money::add(sub_total, tax_total), discount);

    Ok(InvoiceTotals {
        line_totals,
        sub_total,
        tax_total,
        total,
    })
}

/// Payment status as a pure function of `(total, credit)`. No code path may
/// set the status any other way.
pub fn payment_status_for(total: Decimal, credit: Decimal) -> PaymentStatus {
    if total <= Decimal::ZERO || credit >= total {
        PaymentStatus::Paid
    } else if credit > Decimal::ZERO {
        PaymentStatus::Partially
    } else {
        PaymentStatus::Unpaid
    }
}

/// Name of the rendered document artifact. The renderer itself is an
/// external collaborator; only the reference is stored.
pub fn pdf_artifact_name(kind: &str, number: i64) -> String {
    format!("{}-{:06}.pdf", kind, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(name: &str, quantity: &str, price: &str) -> CreateInvoiceItem {
        CreateInvoiceItem {
            item_name: name.to_string(),
            description: None,
            quantity: dec(quantity),
            unit_price: dec(price),
            original_quantity: None,
            returned_quantity: None,
        }
    }

    #[test]
    fn two_at_fifty_with_tax_and_discount() {
        let totals = derive_totals(&[line("Saline 0.9%", "2", "50")], dec("10"), dec("5")).unwrap();

        assert_eq!(totals.sub_total, dec("100.00"));
        assert_eq!(totals.tax_total, dec("10.00"));
        assert_eq!(totals.total, dec("105.00"));
        assert_eq!(
            payment_status_for(totals.total, Decimal::ZERO),
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn fully_discounted_invoice_is_paid() {
        let totals = derive_totals(&[line("Gauze", "1", "10")], Decimal::ZERO, dec("10")).unwrap();

        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(
            payment_status_for(totals.total, Decimal::ZERO),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let err = derive_totals(&[], Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = derive_totals(&[line("  ", "1", "1")], Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn negative_quantity_price_tax_discount_rejected() {
        assert!(derive_totals(&[line("a", "-1", "1")], Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(derive_totals(&[line("a", "1", "-1")], Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(derive_totals(&[line("a", "1", "1")], dec("-1"), Decimal::ZERO).is_err());
        assert!(derive_totals(&[line("a", "1", "1")], dec("101"), Decimal::ZERO).is_err());
        assert!(derive_totals(&[line("a", "1", "1")], Decimal::ZERO, dec("-1")).is_err());
    }

    #[test]
    fn cent_amounts_stay_exact() {
        let totals =
            derive_totals(&[line("Syringe", "3", "19.99")], Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(totals.sub_total, dec("59.97"));
        assert_eq!(totals.total, dec("59.97"));
    }

    #[test]
    fn payment_status_tracks_credit() {
        let total = dec("105");
        assert_eq!(
            payment_status_for(total, Decimal::ZERO),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            payment_status_for(total, dec("50")),
            PaymentStatus::Partially
        );
        assert_eq!(payment_status_for(total, dec("105")), PaymentStatus::Paid);
    }

    #[test]
    fn artifact_name_is_zero_padded() {
        assert_eq!(pdf_artifact_name("invoice", 12), "invoice-000012.pdf");
    }
}
