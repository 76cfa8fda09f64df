//! Database service for billing-service.

use crate::models::{
    Client, ClientLookup, CreateClient, CreateExpense, CreateInvoice, CreateOrder, CreateReturn,
    EntryType, Expense, GeneralLedgerEntry, GoodsReturn, Invoice, InvoiceItem, LedgerIntent,
    MatchedBy, Order, OrderItem, OrderStatus, Payment, RecordEntry, RecordPayment, ReturnStatus,
};
use crate::services::billing;
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL, LEDGER_ENTRIES_TOTAL, PAYMENTS_TOTAL};
use crate::services::money;
use crate::services::statement::StatementSource;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, org_id, invoice_number, client_id, invoice_date, due_date, \
     tax_rate, discount, sub_total, tax_total, total, credit, payment_status, status, pdf, notes, \
     created_by, removed, created_utc, updated_utc";

const PAYMENT_COLUMNS: &str = "payment_id, org_id, invoice_id, client_id, amount, account, \
     payment_date, notes, created_by, removed, created_utc";

const RETURN_COLUMNS: &str = "return_id, org_id, order_id, order_item_id, returned_quantity, \
     reason, status, created_by, created_utc, updated_utc";

const LEDGER_COLUMNS: &str = "entry_id, org_id, entry_date, account, entry_type, description, \
     debit, credit, invoice_id, ref_id, ref_type, created_utc";

fn page_window(page: i64, page_size: i64) -> (i64, i64) {
    let limit = page_size.clamp(1, 100);
    let offset = (page.max(1) - 1) * limit;
    (limit, offset)
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a new client.
    #[instrument(skip(self, input), fields(org_id = %input.org_id))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (client_id, org_id, name, email, phone, address, linked_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.linked_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    /// Get a client by ID.
    #[instrument(skip(self), fields(org_id = %org_id, client_id = %client_id))]
    pub async fn get_client(
        &self,
        org_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
            FROM clients
            WHERE org_id = $1 AND client_id = $2 AND removed = FALSE
            "#,
        )
        .bind(org_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// List clients for an organization.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_clients(
        &self,
        org_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
            FROM clients
            WHERE org_id = $1 AND removed = FALSE
            ORDER BY created_utc DESC, client_id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(org_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Find a client via the prioritized strategy list: exact id, linked user
    /// id, exact email, name pattern last. The tagged result lets callers
    /// reason about match confidence.
    #[instrument(skip(self, lookup), fields(org_id = %org_id))]
    pub async fn find_client(
        &self,
        org_id: Uuid,
        lookup: &ClientLookup,
    ) -> Result<Option<(Client, MatchedBy)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client"])
            .start_timer();

        if let Some(client_id) = lookup.client_id {
            if let Some(client) = self.get_client(org_id, client_id).await? {
                timer.observe_duration();
                return Ok(Some((client, MatchedBy::Id)));
            }
        }

        if let Some(linked_user_id) = lookup.linked_user_id {
            let client = sqlx::query_as::<_, Client>(
                r#"
                SELECT client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
                FROM clients
                WHERE org_id = $1 AND linked_user_id = $2 AND removed = FALSE
                ORDER BY created_utc
                LIMIT 1
                "#,
            )
            .bind(org_id)
            .bind(linked_user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find client: {}", e)))?;

            if let Some(client) = client {
                timer.observe_duration();
                return Ok(Some((client, MatchedBy::LinkedUser)));
            }
        }

        if let Some(email) = &lookup.email {
            let client = sqlx::query_as::<_, Client>(
                r#"
                SELECT client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
                FROM clients
                WHERE org_id = $1 AND LOWER(email) = LOWER($2) AND removed = FALSE
                ORDER BY created_utc
                LIMIT 1
                "#,
            )
            .bind(org_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find client: {}", e)))?;

            if let Some(client) = client {
                timer.observe_duration();
                return Ok(Some((client, MatchedBy::Email)));
            }
        }

        if let Some(name) = &lookup.name {
            let client = sqlx::query_as::<_, Client>(
                r#"
                SELECT client_id, org_id, name, email, phone, address, linked_user_id, removed, created_utc
                FROM clients
                WHERE org_id = $1 AND name ILIKE '%' || $2 || '%' AND removed = FALSE
                ORDER BY created_utc
                LIMIT 1
                "#,
            )
            .bind(org_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find client: {}", e)))?;

            if let Some(client) = client {
                timer.observe_duration();
                return Ok(Some((client, MatchedBy::NamePattern)));
            }
        }

        timer.observe_duration();

        Ok(None)
    }

    // -------------------------------------------------------------------------
    // Order Operations
    // -------------------------------------------------------------------------

    /// Create a new order with its line items.
    #[instrument(skip(self, input), fields(org_id = %input.org_id, item_count = input.items.len()))]
    pub async fn create_order(
        &self,
        input: &CreateOrder,
    ) -> Result<(Order, Vec<OrderItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_order"])
            .start_timer();

        if input.items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Order must have at least one line item"
            )));
        }
        for item in &input.items {
            if item.quantity <= Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Order item quantity must be positive"
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Order item price must not be negative"
                )));
            }
        }

        self.get_client(input.org_id, input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_id, org_id, client_id, status, created_by)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING order_id, org_id, client_id, status, created_by, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(input.client_id)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create order: {}", e)))?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let inserted = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_item_id, order_id, org_id, item_id, item_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING order_item_id, order_id, org_id, item_id, item_name, quantity, unit_price, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.order_id)
            .bind(input.org_id)
            .bind(item.item_id)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert order item: {}", e))
            })?;
            items.push(inserted);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(order_id = %order.order_id, item_count = items.len(), "Order created");

        Ok((order, items))
    }

    /// Get an order by ID.
    #[instrument(skip(self), fields(org_id = %org_id, order_id = %order_id))]
    pub async fn get_order(&self, org_id: Uuid, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, org_id, client_id, status, created_by, created_utc, updated_utc
            FROM orders
            WHERE org_id = $1 AND order_id = $2
            "#,
        )
        .bind(org_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?;

        timer.observe_duration();

        Ok(order)
    }

    /// Get line items for an order.
    #[instrument(skip(self), fields(org_id = %org_id, order_id = %order_id))]
    pub async fn get_order_items(
        &self,
        org_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order_items"])
            .start_timer();

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_item_id, order_id, org_id, item_id, item_name, quantity, unit_price, created_utc
            FROM order_items
            WHERE org_id = $1 AND order_id = $2
            ORDER BY created_utc, order_item_id
            "#,
        )
        .bind(org_id)
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// List orders for an organization.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_orders(
        &self,
        org_id: Uuid,
        client_id: Option<Uuid>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_orders"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT order_id, org_id, client_id, status, created_by, created_utc, updated_utc
            FROM orders
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR client_id = $2)
            ORDER BY created_utc DESC, order_id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(org_id)
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list orders: {}", e)))?;

        timer.observe_duration();

        Ok(orders)
    }

    /// Transition an order's workflow status.
    #[instrument(skip(self), fields(org_id = %org_id, order_id = %order_id))]
    pub async fn update_order_status(
        &self,
        org_id: Uuid,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_order_status"])
            .start_timer();

        let existing = match self.get_order(org_id, order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };

        let current = OrderStatus::from_string(&existing.status).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Order {} has unknown status '{}'",
                order_id,
                existing.status
            ))
        })?;

        if !current.can_transition_to(next) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot transition order from '{}' to '{}'",
                current.as_str(),
                next.as_str()
            )));
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $3, updated_utc = NOW()
            WHERE org_id = $1 AND order_id = $2
            RETURNING order_id, org_id, client_id, status, created_by, created_utc, updated_utc
            "#,
        )
        .bind(org_id)
        .bind(order_id)
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update order status: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref o) = order {
            info!(order_id = %o.order_id, status = %o.status, "Order status updated");
        }

        Ok(order)
    }

    // -------------------------------------------------------------------------
    // Return Operations
    // -------------------------------------------------------------------------

    /// Record a goods return against an order line.
    #[instrument(skip(self, input), fields(org_id = %input.org_id, order_id = %input.order_id))]
    pub async fn create_return(&self, input: &CreateReturn) -> Result<GoodsReturn, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_return"])
            .start_timer();

        if input.returned_quantity <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Returned quantity must be positive"
            )));
        }

        let items = self.get_order_items(input.org_id, input.order_id).await?;
        if !items
            .iter()
            .any(|item| item.order_item_id == input.order_item_id)
        {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Order line not found on this order"
            )));
        }

        let returned = sqlx::query_as::<_, GoodsReturn>(&format!(
            r#"
            INSERT INTO goods_returns (return_id, org_id, order_id, order_item_id, returned_quantity, reason, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, 'available', $7)
            RETURNING {}
            "#,
            RETURN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(input.order_id)
        .bind(input.order_item_id)
        .bind(input.returned_quantity)
        .bind(&input.reason)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create return: {}", e)))?;

        timer.observe_duration();

        info!(
            return_id = %returned.return_id,
            returned_quantity = %returned.returned_quantity,
            "Return recorded"
        );

        Ok(returned)
    }

    /// List returns, optionally scoped to one order.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_returns(
        &self,
        org_id: Uuid,
        order_id: Option<Uuid>,
    ) -> Result<Vec<GoodsReturn>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_returns"])
            .start_timer();

        let returns = sqlx::query_as::<_, GoodsReturn>(&format!(
            r#"
            SELECT {}
            FROM goods_returns
            WHERE org_id = $1
              AND ($2::uuid IS NULL OR order_id = $2)
            ORDER BY created_utc, return_id
            "#,
            RETURN_COLUMNS
        ))
        .bind(org_id)
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list returns: {}", e)))?;

        timer.observe_duration();

        Ok(returns)
    }

    /// Update a return's disposition. Disposed returns are immutable.
    #[instrument(skip(self), fields(org_id = %org_id, return_id = %return_id))]
    pub async fn update_return_status(
        &self,
        org_id: Uuid,
        return_id: Uuid,
        next: ReturnStatus,
    ) -> Result<Option<GoodsReturn>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_return_status"])
            .start_timer();

        let existing = sqlx::query_as::<_, GoodsReturn>(&format!(
            r#"
            SELECT {}
            FROM goods_returns
            WHERE org_id = $1 AND return_id = $2
            "#,
            RETURN_COLUMNS
        ))
        .bind(org_id)
        .bind(return_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get return: {}", e)))?;

        let existing = match existing {
            Some(r) => r,
            None => return Ok(None),
        };

        if existing.status == ReturnStatus::Disposed.as_str() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Disposed returns are immutable"
            )));
        }

        let updated = sqlx::query_as::<_, GoodsReturn>(&format!(
            r#"
            UPDATE goods_returns
            SET status = $3, updated_utc = NOW()
            WHERE org_id = $1 AND return_id = $2
            RETURNING {}
            "#,
            RETURN_COLUMNS
        ))
        .bind(org_id)
        .bind(return_id)
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update return status: {}", e))
        })?;

        timer.observe_duration();

        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Build and persist an invoice: validates lines, derives all amounts,
    /// assigns a per-organization number, and stores the document artifact
    /// name. The revenue-recognition shadow entry is staged as a ledger
    /// intent in the same transaction and flushed to the ledger separately,
    /// so its eventual failure cannot fail invoice creation.
    #[instrument(skip(self, input), fields(org_id = %input.org_id, item_count = input.items.len()))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
        revenue_account: &str,
    ) -> Result<(Invoice, Vec<InvoiceItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let totals = billing::derive_totals(&input.items, input.tax_rate, input.discount)?;
        let payment_status = billing::payment_status_for(totals.total, Decimal::ZERO);

        self.get_client(input.org_id, input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_number: i64 = sqlx::query_scalar("SELECT next_invoice_number($1)")
            .bind(input.org_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to assign invoice number: {}", e))
            })?;

        let pdf = billing::pdf_artifact_name("invoice", invoice_number);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, org_id, invoice_number, client_id, invoice_date, due_date,
                tax_rate, discount, sub_total, tax_total, total, credit,
                payment_status, status, pdf, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, 'pending', $13, $14, $15)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(invoice_number)
        .bind(input.client_id)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(input.tax_rate)
        .bind(input.discount)
        .bind(totals.sub_total)
        .bind(totals.tax_total)
        .bind(totals.total)
        .bind(payment_status.as_str())
        .bind(&pdf)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        let items = Self::insert_invoice_items(&mut tx, &invoice, input, &totals.line_totals).await?;

        Self::insert_intent(
            &mut tx,
            &RecordEntry {
                org_id: invoice.org_id,
                entry_date: invoice.invoice_date,
                account: revenue_account.to_string(),
                entry_type: EntryType::Revenue,
                description: format!("Invoice #{} issued", invoice.invoice_number),
                debit: Decimal::ZERO,
                credit: invoice.total.max(Decimal::ZERO),
                invoice_id: Some(invoice.invoice_id),
                ref_id: Some(invoice.invoice_id),
                ref_type: Some("invoice".to_string()),
            },
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL
            .with_label_values(&[invoice.payment_status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );

        Ok((invoice, items))
    }

    async fn insert_invoice_items(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        invoice: &Invoice,
        input: &CreateInvoice,
        line_totals: &[Decimal],
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let mut items = Vec::with_capacity(input.items.len());
        for (i, (item, line_total)) in input.items.iter().zip(line_totals).enumerate() {
            let inserted = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items (
                    invoice_item_id, invoice_id, org_id, item_name, description,
                    quantity, unit_price, total, original_quantity, returned_quantity, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING invoice_item_id, invoice_id, org_id, item_name, description,
                    quantity, unit_price, total, original_quantity, returned_quantity, sort_order, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice.invoice_id)
            .bind(invoice.org_id)
            .bind(&item.item_name)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(line_total)
            .bind(item.original_quantity)
            .bind(item.returned_quantity)
            .bind(i as i32)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice item: {}", e))
            })?;
            items.push(inserted);
        }
        Ok(items)
    }

    /// Get a non-removed invoice by ID.
    #[instrument(skip(self), fields(org_id = %org_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        org_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE org_id = $1 AND invoice_id = $2 AND removed = FALSE
            "#,
            INVOICE_COLUMNS
        ))
        .bind(org_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get line items for an invoice.
    #[instrument(skip(self), fields(org_id = %org_id, invoice_id = %invoice_id))]
    pub async fn get_invoice_items(
        &self,
        org_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT invoice_item_id, invoice_id, org_id, item_name, description,
                quantity, unit_price, total, original_quantity, returned_quantity, sort_order, created_utc
            FROM invoice_items
            WHERE org_id = $1 AND invoice_id = $2
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(org_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice items: {}", e))
        })?;

        timer.observe_duration();

        Ok(items)
    }

    /// List invoices for an organization.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_invoices(
        &self,
        org_id: Uuid,
        client_id: Option<Uuid>,
        payment_status: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE org_id = $1 AND removed = FALSE
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::varchar IS NULL OR payment_status = $3)
            ORDER BY created_utc DESC, invoice_id DESC
            LIMIT $4 OFFSET $5
            "#,
            INVOICE_COLUMNS
        ))
        .bind(org_id)
        .bind(client_id)
        .bind(payment_status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Replace an invoice's line items and re-derive all amounts. The row is
    /// locked so a concurrent payment cannot slip between the re-derivation
    /// and the write. Rejects edits that would push `total` below the credit
    /// already collected.
    #[instrument(skip(self, items), fields(org_id = %org_id, invoice_id = %invoice_id))]
    pub async fn update_invoice_items(
        &self,
        org_id: Uuid,
        invoice_id: Uuid,
        items: &[crate::models::CreateInvoiceItem],
        tax_rate: Decimal,
        discount: Decimal,
    ) -> Result<Option<(Invoice, Vec<InvoiceItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_items"])
            .start_timer();

        let totals = billing::derive_totals(items, tax_rate, discount)?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE org_id = $1 AND invoice_id = $2 AND removed = FALSE
            FOR UPDATE
            "#,
            INVOICE_COLUMNS
        ))
        .bind(org_id)
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))?;

        let existing = match existing {
            Some(inv) => inv,
            None => return Ok(None),
        };

        if totals.total < existing.credit {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "New total {} is below the {} already collected on this invoice",
                totals.total,
                existing.credit
            )));
        }

        sqlx::query("DELETE FROM invoice_items WHERE org_id = $1 AND invoice_id = $2")
            .bind(org_id)
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to clear invoice items: {}", e))
            })?;

        let payment_status = billing::payment_status_for(totals.total, existing.credit);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET tax_rate = $3,
                discount = $4,
                sub_total = $5,
                tax_total = $6,
                total = $7,
                payment_status = $8,
                updated_utc = NOW()
            WHERE org_id = $1 AND invoice_id = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(org_id)
        .bind(invoice_id)
        .bind(tax_rate)
        .bind(discount)
        .bind(totals.sub_total)
        .bind(totals.tax_total)
        .bind(totals.total)
        .bind(payment_status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        let rebuild = CreateInvoice {
            org_id,
            client_id: invoice.client_id,
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            tax_rate,
            discount,
            notes: invoice.notes.clone(),
            created_by: invoice.created_by,
            items: items.to_vec(),
        };
        let items = Self::insert_invoice_items(&mut tx, &invoice, &rebuild, &totals.line_totals).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            total = %invoice.total,
            "Invoice line items updated"
        );

        Ok(Some((invoice, items)))
    }

    /// Soft-delete an invoice.
    #[instrument(skip(self), fields(org_id = %org_id, invoice_id = %invoice_id))]
    pub async fn remove_invoice(&self, org_id: Uuid, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_invoice"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET removed = TRUE, updated_utc = NOW()
            WHERE org_id = $1 AND invoice_id = $2 AND removed = FALSE
            "#,
        )
        .bind(org_id)
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to remove invoice: {}", e)))?;

        timer.observe_duration();

        let removed = result.rows_affected() > 0;
        if removed {
            info!(invoice_id = %invoice_id, "Invoice soft-deleted");
        }

        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Payment Operations
    // -------------------------------------------------------------------------

    /// Record a payment against an invoice.
    ///
    /// The invoice row is locked (`FOR UPDATE`) for the whole
    /// validate-insert-mutate sequence, so concurrent payments against the
    /// same invoice serialize and cannot jointly overdraw it. Recording a
    /// payment always moves the invoice to `sent`, whatever its prior
    /// status. The asset-side shadow entry is staged as a ledger intent in
    /// the same transaction.
    #[instrument(skip(self, input), fields(org_id = %input.org_id, invoice_id = %input.invoice_id))]
    pub async fn record_payment(
        &self,
        input: &RecordPayment,
    ) -> Result<(Payment, Invoice), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE org_id = $1 AND invoice_id = $2 AND removed = FALSE
            FOR UPDATE
            "#,
            INVOICE_COLUMNS
        ))
        .bind(input.org_id)
        .bind(input.invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let max_amount = money::sub(invoice.total, invoice.credit);
        if input.amount > max_amount {
            return Err(AppError::InvalidAmount(anyhow::anyhow!(
                "Payment amount {} exceeds outstanding balance {}",
                input.amount,
                max_amount
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (payment_id, org_id, invoice_id, client_id, amount, account, payment_date, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(input.invoice_id)
        .bind(invoice.client_id)
        .bind(input.amount)
        .bind(&input.account)
        .bind(input.payment_date)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment: {}", e)))?;

        let new_credit = money::add(invoice.credit, input.amount);
        let payment_status = billing::payment_status_for(invoice.total, new_credit);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET credit = $3,
                payment_status = $4,
                status = 'sent',
                updated_utc = NOW()
            WHERE org_id = $1 AND invoice_id = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(input.org_id)
        .bind(input.invoice_id)
        .bind(new_credit)
        .bind(payment_status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        Self::insert_intent(
            &mut tx,
            &RecordEntry {
                org_id: payment.org_id,
                entry_date: payment.payment_date,
                account: payment.account.clone(),
                entry_type: EntryType::Asset,
                description: format!("Payment for invoice #{}", invoice.invoice_number),
                debit: payment.amount,
                credit: Decimal::ZERO,
                invoice_id: Some(invoice.invoice_id),
                ref_id: Some(payment.payment_id),
                ref_type: Some("payment".to_string()),
            },
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[payment.account.as_str()])
            .inc();

        info!(
            payment_id = %payment.payment_id,
            invoice_id = %invoice.invoice_id,
            amount = %payment.amount,
            payment_status = %invoice.payment_status,
            "Payment recorded"
        );

        Ok((payment, invoice))
    }

    /// Get a payment by ID.
    #[instrument(skip(self), fields(org_id = %org_id, payment_id = %payment_id))]
    pub async fn get_payment(
        &self,
        org_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE org_id = $1 AND payment_id = $2 AND removed = FALSE
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(org_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// List payments, optionally scoped to one invoice.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_payments(
        &self,
        org_id: Uuid,
        invoice_id: Option<Uuid>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE org_id = $1 AND removed = FALSE
              AND ($2::uuid IS NULL OR invoice_id = $2)
            ORDER BY created_utc DESC, payment_id DESC
            LIMIT $3 OFFSET $4
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(org_id)
        .bind(invoice_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    // -------------------------------------------------------------------------
    // Expense Operations
    // -------------------------------------------------------------------------

    /// Record an expense. The paired shadow entries (expense debit against
    /// the category account + cash credit) are staged as ledger intents in
    /// the same transaction.
    #[instrument(skip(self, input), fields(org_id = %input.org_id))]
    pub async fn create_expense(
        &self,
        input: &CreateExpense,
        cash_account: &str,
    ) -> Result<Expense, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_expense"])
            .start_timer();

        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(anyhow::anyhow!(
                "Expense amount must be positive"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (expense_id, org_id, name, category, description, amount, expense_date, bill_ref, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING expense_id, org_id, name, category, description, amount, expense_date, bill_ref, created_by, removed, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.amount)
        .bind(input.expense_date)
        .bind(&input.bill_ref)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create expense: {}", e)))?;

        let description = format!("Expense: {}", expense.name);
        Self::insert_intent(
            &mut tx,
            &RecordEntry {
                org_id: expense.org_id,
                entry_date: expense.expense_date,
                account: expense.category.clone(),
                entry_type: EntryType::Expense,
                description: description.clone(),
                debit: expense.amount,
                credit: Decimal::ZERO,
                invoice_id: None,
                ref_id: Some(expense.expense_id),
                ref_type: Some("expense".to_string()),
            },
        )
        .await?;
        Self::insert_intent(
            &mut tx,
            &RecordEntry {
                org_id: expense.org_id,
                entry_date: expense.expense_date,
                account: cash_account.to_string(),
                entry_type: EntryType::Asset,
                description,
                debit: Decimal::ZERO,
                credit: expense.amount,
                invoice_id: None,
                ref_id: Some(expense.expense_id),
                ref_type: Some("expense".to_string()),
            },
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(expense_id = %expense.expense_id, amount = %expense.amount, "Expense recorded");

        Ok(expense)
    }

    /// List expenses for an organization.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_expenses(
        &self,
        org_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Expense>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_expenses"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT expense_id, org_id, name, category, description, amount, expense_date, bill_ref, created_by, removed, created_utc
            FROM expenses
            WHERE org_id = $1 AND removed = FALSE
            ORDER BY created_utc DESC, expense_id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(org_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list expenses: {}", e)))?;

        timer.observe_duration();

        Ok(expenses)
    }

    /// Soft-delete an expense.
    #[instrument(skip(self), fields(org_id = %org_id, expense_id = %expense_id))]
    pub async fn remove_expense(&self, org_id: Uuid, expense_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_expense"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET removed = TRUE
            WHERE org_id = $1 AND expense_id = $2 AND removed = FALSE
            "#,
        )
        .bind(org_id)
        .bind(expense_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to remove expense: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Ledger Operations (append-only)
    // -------------------------------------------------------------------------

    /// Stage a ledger intent inside the caller's transaction. Intents are
    /// the only path into the ledger for business events: the primary record
    /// and its shadow entry commit or roll back together.
    async fn insert_intent(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &RecordEntry,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_intents (intent_id, org_id, entry_date, account, entry_type, description, debit, credit, invoice_id, ref_id, ref_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(input.entry_date)
        .bind(&input.account)
        .bind(input.entry_type.as_str())
        .bind(&input.description)
        .bind(input.debit)
        .bind(input.credit)
        .bind(input.invoice_id)
        .bind(input.ref_id)
        .bind(&input.ref_type)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to stage intent: {}", e)))?;

        Ok(())
    }

    /// Flush pending ledger intents into the append-only ledger, one intent
    /// per transaction so a poison intent cannot block the rest forever.
    /// Returns the number flushed. Failures are recorded on the intent
    /// (attempts + last_error) and retried on the next pass.
    #[instrument(skip(self))]
    pub async fn flush_ledger_intents(&self, limit: i64) -> Result<usize, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["flush_ledger_intents"])
            .start_timer();

        let mut flushed = 0;
        for _ in 0..limit.max(1) {
            let mut tx = self.pool.begin().await.map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
            })?;

            let intent = sqlx::query_as::<_, LedgerIntent>(
                r#"
                SELECT intent_id, org_id, entry_date, account, entry_type, description,
                    debit, credit, invoice_id, ref_id, ref_type, attempts, last_error, flushed_utc, created_utc
                FROM ledger_intents
                WHERE flushed_utc IS NULL
                ORDER BY created_utc, intent_id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
                "#,
            )
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to fetch intent: {}", e))
            })?;

            let intent = match intent {
                Some(i) => i,
                None => break,
            };

            let record = RecordEntry {
                org_id: intent.org_id,
                entry_date: intent.entry_date,
                account: intent.account.clone(),
                entry_type: EntryType::from_string(&intent.entry_type)
                    .unwrap_or(EntryType::Asset),
                description: intent.description.clone(),
                debit: intent.debit,
                credit: intent.credit,
                invoice_id: intent.invoice_id,
                ref_id: intent.ref_id,
                ref_type: intent.ref_type.clone(),
            };

            match Self::insert_entry(&mut tx, &record).await {
                Ok(_) => {
                    sqlx::query(
                        "UPDATE ledger_intents SET flushed_utc = NOW() WHERE intent_id = $1",
                    )
                    .bind(intent.intent_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to mark intent flushed: {}",
                            e
                        ))
                    })?;
                    tx.commit().await.map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!("Failed to commit flush: {}", e))
                    })?;
                    flushed += 1;
                }
                Err(e) => {
                    tx.rollback().await.ok();
                    sqlx::query(
                        "UPDATE ledger_intents SET attempts = attempts + 1, last_error = $2 WHERE intent_id = $1",
                    )
                    .bind(intent.intent_id)
                    .bind(e.to_string())
                    .execute(&self.pool)
                    .await
                    .ok();

                    let e = AppError::LedgerWrite(anyhow::anyhow!(e));
                    crate::services::metrics::ERRORS_TOTAL
                        .with_label_values(&["ledger_write"])
                        .inc();
                    tracing::warn!(
                        intent_id = %intent.intent_id,
                        attempts = intent.attempts + 1,
                        error = %e,
                        "Ledger intent flush failed; will retry"
                    );
                    break;
                }
            }
        }

        timer.observe_duration();

        Ok(flushed)
    }

    async fn insert_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        input: &RecordEntry,
    ) -> Result<GeneralLedgerEntry, AppError> {
        if input.debit < Decimal::ZERO || input.credit < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Ledger amounts must not be negative"
            )));
        }
        if input.debit > Decimal::ZERO && input.credit > Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A ledger entry carries either a debit or a credit, not both"
            )));
        }

        let entry = sqlx::query_as::<_, GeneralLedgerEntry>(&format!(
            r#"
            INSERT INTO ledger_entries (entry_id, org_id, entry_date, account, entry_type, description, debit, credit, invoice_id, ref_id, ref_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            LEDGER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.org_id)
        .bind(input.entry_date)
        .bind(&input.account)
        .bind(input.entry_type.as_str())
        .bind(&input.description)
        .bind(input.debit)
        .bind(input.credit)
        .bind(input.invoice_id)
        .bind(input.ref_id)
        .bind(&input.ref_type)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert entry: {}", e)))?;

        LEDGER_ENTRIES_TOTAL
            .with_label_values(&[entry.entry_type.as_str()])
            .inc();

        Ok(entry)
    }

    /// List ledger entries with optional filters.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn list_ledger_entries(
        &self,
        org_id: Uuid,
        entry_type: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<GeneralLedgerEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_ledger_entries"])
            .start_timer();

        let (limit, offset) = page_window(page, page_size);
        let entries = sqlx::query_as::<_, GeneralLedgerEntry>(&format!(
            r#"
            SELECT {}
            FROM ledger_entries
            WHERE org_id = $1
              AND ($2::varchar IS NULL OR entry_type = $2)
              AND ($3::date IS NULL OR entry_date >= $3)
              AND ($4::date IS NULL OR entry_date <= $4)
            ORDER BY entry_date DESC, created_utc DESC, entry_id DESC
            LIMIT $5 OFFSET $6
            "#,
            LEDGER_COLUMNS
        ))
        .bind(org_id)
        .bind(entry_type)
        .bind(start_date)
        .bind(end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list entries: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }

    /// Ledger aggregates over a date range: (revenue credits, expense debits).
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn ledger_summary(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(Decimal, Decimal), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["ledger_summary"])
            .start_timer();

        let row: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'revenue' THEN credit ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN entry_type = 'expense' THEN debit ELSE 0 END), 0)
            FROM ledger_entries
            WHERE org_id = $1
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute ledger summary: {}", e))
        })?;

        timer.observe_duration();

        Ok(row)
    }

    // -------------------------------------------------------------------------
    // Statement Operations
    // -------------------------------------------------------------------------

    /// Fetch the unmerged statement rows for a client: non-removed invoices
    /// as debits, non-removed payments as credits. Merging and the running
    /// balance happen in the statement calculator.
    #[instrument(skip(self), fields(org_id = %org_id, client_id = %client_id))]
    pub async fn client_statement_sources(
        &self,
        org_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<StatementSource>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["client_statement_sources"])
            .start_timer();

        let invoices: Vec<(i64, NaiveDate, DateTime<Utc>, Decimal)> = sqlx::query_as(
            r#"
            SELECT invoice_number, invoice_date, created_utc, total
            FROM invoices
            WHERE org_id = $1 AND client_id = $2 AND removed = FALSE
            ORDER BY invoice_date, created_utc, invoice_id
            "#,
        )
        .bind(org_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch statement invoices: {}", e))
        })?;

        let payments: Vec<(Uuid, NaiveDate, DateTime<Utc>, Decimal)> = sqlx::query_as(
            r#"
            SELECT payment_id, payment_date, created_utc, amount
            FROM payments
            WHERE org_id = $1 AND client_id = $2 AND removed = FALSE
            ORDER BY payment_date, created_utc, payment_id
            "#,
        )
        .bind(org_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch statement payments: {}", e))
        })?;

        timer.observe_duration();

        let mut sources = Vec::with_capacity(invoices.len() + payments.len());
        for (number, date, created_utc, total) in invoices {
            sources.push(StatementSource {
                date,
                created_utc,
                reference: format!("invoice-{:06}", number),
                debit: total,
                credit: Decimal::ZERO,
            });
        }
        for (payment_id, date, created_utc, amount) in payments {
            sources.push(StatementSource {
                date,
                created_utc,
                reference: format!("payment-{}", payment_id),
                debit: Decimal::ZERO,
                credit: amount,
            });
        }

        Ok(sources)
    }

    // -------------------------------------------------------------------------
    // Reporting Operations (read-only)
    // -------------------------------------------------------------------------

    /// Total of completed invoices (non-removed, neither draft nor
    /// cancelled) over a date range.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn invoice_revenue_total(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Decimal, AppError> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total), 0)
            FROM invoices
            WHERE org_id = $1 AND removed = FALSE
              AND status NOT IN ('draft', 'cancelled')
              AND ($2::date IS NULL OR invoice_date >= $2)
              AND ($3::date IS NULL OR invoice_date <= $3)
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to sum invoice revenue: {}", e))
        })?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Total of non-removed expenses over a date range.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn expense_total(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Decimal, AppError> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM expenses
            WHERE org_id = $1 AND removed = FALSE
              AND ($2::date IS NULL OR expense_date >= $2)
              AND ($3::date IS NULL OR expense_date <= $3)
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum expenses: {}", e)))?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Per-month invoice totals for the trend report.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn monthly_invoice_totals(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            r#"
            SELECT date_trunc('month', invoice_date)::date, COALESCE(SUM(total), 0)
            FROM invoices
            WHERE org_id = $1 AND removed = FALSE
              AND status NOT IN ('draft', 'cancelled')
              AND ($2::date IS NULL OR invoice_date >= $2)
              AND ($3::date IS NULL OR invoice_date <= $3)
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to group invoices by month: {}", e))
        })?;

        Ok(rows)
    }

    /// Per-month expense totals for the trend report.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn monthly_expense_totals(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            r#"
            SELECT date_trunc('month', expense_date)::date, COALESCE(SUM(amount), 0)
            FROM expenses
            WHERE org_id = $1 AND removed = FALSE
              AND ($2::date IS NULL OR expense_date >= $2)
              AND ($3::date IS NULL OR expense_date <= $3)
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to group expenses by month: {}", e))
        })?;

        Ok(rows)
    }

    /// Expense totals grouped by category.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn expenses_by_category(
        &self,
        org_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<(String, Decimal)>, AppError> {
        let rows: Vec<(String, Decimal)> = sqlx::query_as(
            r#"
            SELECT category, COALESCE(SUM(amount), 0)
            FROM expenses
            WHERE org_id = $1 AND removed = FALSE
              AND ($2::date IS NULL OR expense_date >= $2)
              AND ($3::date IS NULL OR expense_date <= $3)
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(org_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to group expenses by category: {}", e))
        })?;

        Ok(rows)
    }

    /// Outstanding (not fully paid) invoices as `(due date, outstanding)`
    /// pairs for the aging report. Falls back to the invoice date when no
    /// due date was set.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn outstanding_invoices(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        let rows: Vec<(Option<NaiveDate>, NaiveDate, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT due_date, invoice_date, total, credit
            FROM invoices
            WHERE org_id = $1 AND removed = FALSE
              AND payment_status != 'paid'
              AND status NOT IN ('draft', 'cancelled')
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch outstanding invoices: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .map(|(due_date, invoice_date, total, credit)| {
                (due_date.unwrap_or(invoice_date), money::sub(total, credit))
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // History Operations
    // -------------------------------------------------------------------------

    /// Fetch every order, invoice, and return for an organization as
    /// normalized timeline entries. Filtering, sorting, and pagination
    /// happen in the history calculator.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn history_entries(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<crate::models::ActivityEntry>, AppError> {
        use crate::models::{ActivityEntry, ActivityType};

        let timer = DB_QUERY_DURATION
            .with_label_values(&["history_entries"])
            .start_timer();

        let order_rows: Vec<(Uuid, String, DateTime<Utc>, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT o.order_id, o.status, o.created_utc, o.created_by, c.name
            FROM orders o
            JOIN clients c ON c.client_id = o.client_id
            WHERE o.org_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch order history: {}", e))
        })?;

        let item_rows: Vec<(Uuid, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT order_id, quantity, unit_price
            FROM order_items
            WHERE org_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch order item history: {}", e))
        })?;

        let mut order_totals: HashMap<Uuid, Decimal> = HashMap::new();
        for (order_id, quantity, unit_price) in item_rows {
            let line = money::multiply(quantity, unit_price);
            let total = order_totals.entry(order_id).or_insert(Decimal::ZERO);
            *total = money::add(*total, line);
        }

        let invoice_rows: Vec<(i64, String, Decimal, DateTime<Utc>, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT i.invoice_number, i.status, i.total, i.created_utc, i.created_by, c.name
            FROM invoices i
            JOIN clients c ON c.client_id = i.client_id
            WHERE i.org_id = $1 AND i.removed = FALSE
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch invoice history: {}", e))
        })?;

        let return_rows: Vec<(String, Decimal, DateTime<Utc>, Uuid, String, String)> =
            sqlx::query_as(
                r#"
                SELECT r.status, r.returned_quantity, r.created_utc, r.created_by, oi.item_name, c.name
                FROM goods_returns r
                JOIN order_items oi ON oi.order_item_id = r.order_item_id
                JOIN orders o ON o.order_id = r.order_id
                JOIN clients c ON c.client_id = o.client_id
                WHERE r.org_id = $1
                "#,
            )
            .bind(org_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to fetch return history: {}", e))
            })?;

        timer.observe_duration();

        let mut entries =
            Vec::with_capacity(order_rows.len() + invoice_rows.len() + return_rows.len());

        for (order_id, status, created_utc, created_by, client_name) in order_rows {
            entries.push(ActivityEntry {
                activity_type: ActivityType::Order,
                activity_sub_type: status,
                description: format!("Order for {}", client_name),
                activity_date: created_utc,
                amount: order_totals.get(&order_id).copied().unwrap_or(Decimal::ZERO),
                client_info: Some(client_name),
                performed_by_info: Some(created_by.to_string()),
            });
        }

        for (number, status, total, created_utc, created_by, client_name) in invoice_rows {
            entries.push(ActivityEntry {
                activity_type: ActivityType::Invoice,
                activity_sub_type: status,
                description: format!("Invoice #{}", number),
                activity_date: created_utc,
                amount: total,
                client_info: Some(client_name),
                performed_by_info: Some(created_by.to_string()),
            });
        }

        for (status, quantity, created_utc, created_by, item_name, client_name) in return_rows {
            entries.push(ActivityEntry {
                activity_type: ActivityType::Return,
                activity_sub_type: status,
                description: format!("Return of {} x {}", quantity, item_name),
                activity_date: created_utc,
                // Returns carry no direct monetary value in this view.
                amount: Decimal::ZERO,
                client_info: Some(client_name),
                performed_by_info: Some(created_by.to_string()),
            });
        }

        Ok(entries)
    }
}
