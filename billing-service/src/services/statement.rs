//! Client statement: invoices (debits) merged with payments (credits) in
//! date order with a running balance.
//!
//! This is a derived, read-only projection recomputed on every request.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::services::money;

/// One unmerged source row (an invoice or a payment).
#[derive(Debug, Clone)]
pub struct StatementSource {
    pub date: NaiveDate,
    /// Tie-break for identical dates, so the running balance is reproducible
    /// across repeated queries.
    pub created_utc: DateTime<Utc>,
    pub reference: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// One merged statement row with the balance carried forward.
#[derive(Debug, Clone, Serialize)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub reference: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

/// Merge rows by date ascending (creation order breaks ties) and accumulate
/// `balance += debit - credit`.
pub fn merge_statement(mut sources: Vec<StatementSource>) -> Vec<StatementRow> {
    sources.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.created_utc.cmp(&b.created_utc))
    });

    let mut balance = Decimal::ZERO;
    sources
        .into_iter()
        .map(|row| {
            balance = money::sub(money::add(balance, row.debit), row.credit);
            StatementRow {
                date: row.date,
                reference: row.reference,
                debit: row.debit,
                credit: row.credit,
                balance,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn at(date: &str, seq: u32) -> (NaiveDate, DateTime<Utc>) {
        let date: NaiveDate = date.parse().unwrap();
        let created = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, seq)
            .unwrap();
        (date, created)
    }

    fn debit(date: &str, seq: u32, amount: &str) -> StatementSource {
        let (date, created_utc) = at(date, seq);
        StatementSource {
            date,
            created_utc,
            reference: format!("invoice-{}", seq),
            debit: dec(amount),
            credit: Decimal::ZERO,
        }
    }

    fn credit(date: &str, seq: u32, amount: &str) -> StatementSource {
        let (date, created_utc) = at(date, seq);
        StatementSource {
            date,
            created_utc,
            reference: format!("payment-{}", seq),
            debit: Decimal::ZERO,
            credit: dec(amount),
        }
    }

    #[test]
    fn invoice_then_payment_running_balance() {
        let rows = merge_statement(vec![
            credit("2026-02-10", 2, "50"),
            debit("2026-02-01", 1, "105"),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reference, "invoice-1");
        assert_eq!(rows[0].balance, dec("105"));
        assert_eq!(rows[1].reference, "payment-2");
        assert_eq!(rows[1].balance, dec("55"));
    }

    #[test]
    fn same_day_rows_keep_creation_order() {
        let rows = merge_statement(vec![
            credit("2026-03-01", 2, "30"),
            debit("2026-03-01", 1, "100"),
            debit("2026-03-01", 3, "20"),
        ]);

        assert_eq!(
            rows.iter().map(|r| r.reference.as_str()).collect::<Vec<_>>(),
            vec!["invoice-1", "payment-2", "invoice-3"]
        );
        assert_eq!(rows[2].balance, dec("90"));
    }

    #[test]
    fn repeated_merge_is_reproducible() {
        let sources = vec![
            debit("2026-03-01", 1, "10"),
            credit("2026-03-01", 2, "10"),
            debit("2026-03-02", 3, "5.55"),
        ];
        let first: Vec<Decimal> = merge_statement(sources.clone())
            .into_iter()
            .map(|r| r.balance)
            .collect();
        let second: Vec<Decimal> = merge_statement(sources)
            .into_iter()
            .map(|r| r.balance)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_statement_is_empty() {
        assert!(merge_statement(Vec::new()).is_empty());
    }
}
