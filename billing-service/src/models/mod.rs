pub mod client;
pub mod expense;
pub mod goods_return;
pub mod history;
pub mod invoice;
pub mod ledger;
pub mod order;
pub mod payment;

pub use client::{Client, ClientLookup, CreateClient, MatchedBy};
pub use expense::{CreateExpense, Expense};
pub use goods_return::{CreateReturn, GoodsReturn, ReturnStatus};
pub use history::{ActivityEntry, ActivityType};
pub use invoice::{
    CreateInvoice, CreateInvoiceItem, Invoice, InvoiceItem, InvoiceStatus, PaymentStatus,
};
pub use ledger::{EntryType, GeneralLedgerEntry, LedgerIntent, RecordEntry};
pub use order::{CreateOrder, CreateOrderItem, Order, OrderItem, OrderStatus};
pub use payment::{Payment, RecordPayment};
