pub mod billing;
pub mod database;
pub mod history;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod reports;
pub mod returns;
pub mod statement;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
