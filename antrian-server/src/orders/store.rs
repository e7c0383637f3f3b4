//! redb-based order store - the source of truth for order state
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records (authoritative) |
//! | `invoices` | `invoice_id` | `order_id` | Customer-facing lookup index |
//! | `products` | `product_id` | `Product` | Catalog read model for validation |
//! | `active_orders` | `order_id` | `()` | Non-terminal order index |
//! | `processed_txns` | `provider_txn_id` | `order_id` | Payment callback dedup |
//! | `counters` | name | `u64` | Event sequence, queue number, invoice counter |
//!
//! # Mutation primitive
//!
//! All state changes go through [`OrderStore::compare_and_swap_state`]
//! (or its admission variant [`OrderStore::admit_waiting`]). The swap
//! runs in a single write transaction together with event sequence
//! allocation, so the sequence order of emitted events matches commit
//! order. redb serializes write transactions, which makes the swap
//! linearizable without any lock of our own.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default; the database
//! file is always in a consistent state. The queue view is re-derived
//! from order records on demand, so crash recovery needs no replay.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::Product;
use shared::order::{Order, OrderDraft, PaymentState, QueueState};
use shared::util::now_millis;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Invoice index: key = invoice_id, value = order_id
const INVOICES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("invoices");

/// Product catalog read model: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Non-terminal order index: key = order_id, value = empty (existence check)
const ACTIVE_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_orders");

/// Processed provider transactions: key = provider_txn_id, value = order_id
const PROCESSED_TXNS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("processed_txns");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const EVENT_SEQUENCE_KEY: &str = "event_seq";
const QUEUE_NUMBER_KEY: &str = "queue_number";
const INVOICE_COUNT_KEY: &str = "invoice_count";
const INVOICE_DATE_KEY: &str = "invoice_date";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Unknown or inactive product: {0}")]
    InvalidProduct(String),

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// The expected state snapshot no longer matches. Carries the
    /// current record so the caller can decide no-op vs propagate
    /// without a second read.
    #[error("Stale state for order {}: now {}/{:?}", .0.order_id, .0.queue_state, .0.payment_state)]
    StaleState(Box<Order>),

    /// A swap into `in_preparation` found the slot already held by
    /// another order. Carries the occupant.
    #[error("Preparation slot occupied by order {}", .0.order_id)]
    SlotOccupied(Box<Order>),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Order store backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;

        // Create all tables up front so reads never hit a missing table
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(INVOICES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_TXNS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(EVENT_SEQUENCE_KEY)?.is_none() {
                counters.insert(EVENT_SEQUENCE_KEY, 0u64)?;
            }
            if counters.get(QUEUE_NUMBER_KEY)?.is_none() {
                counters.insert(QUEUE_NUMBER_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Catalog ==========

    /// Insert or update a product in the catalog read model
    pub fn put_product(&self, product: &Product) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRODUCTS_TABLE)?;
            let bytes = serde_json::to_vec(product)?;
            table.insert(product.id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a product by id
    pub fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Creation ==========

    /// Create an order from a draft, state `unpaid/none`
    ///
    /// Every item must reference an existing, active product with
    /// quantity >= 1. Unit prices are snapshotted from the catalog and
    /// the total is recomputed here; nothing price-related is ever
    /// trusted from the client.
    pub fn create(&self, draft: &OrderDraft) -> StoreResult<Order> {
        if draft.items.is_empty() {
            return Err(StoreError::EmptyOrder);
        }

        let write_txn = self.db.begin_write()?;
        let order = {
            let products = write_txn.open_table(PRODUCTS_TABLE)?;

            let mut items = Vec::with_capacity(draft.items.len());
            for draft_item in &draft.items {
                if draft_item.quantity < 1 {
                    return Err(StoreError::InvalidQuantity {
                        product_id: draft_item.product_id.clone(),
                        quantity: draft_item.quantity,
                    });
                }
                let product: Product = match products.get(draft_item.product_id.as_str())? {
                    Some(guard) => serde_json::from_slice(guard.value())?,
                    None => return Err(StoreError::InvalidProduct(draft_item.product_id.clone())),
                };
                if !product.is_active {
                    return Err(StoreError::InvalidProduct(draft_item.product_id.clone()));
                }
                items.push(shared::order::OrderItem {
                    product_id: product.id,
                    product_name: product.name,
                    quantity: draft_item.quantity,
                    unit_price: product.price,
                });
            }
            drop(products);

            let total: i64 = items.iter().map(|i| i.line_total()).sum();
            let now = now_millis();

            let invoice_id = next_invoice_id(&write_txn, now)?;

            let order = Order {
                order_id: uuid::Uuid::new_v4().to_string(),
                invoice_id,
                customer_name: draft.customer_name.clone(),
                contact_handle: draft.contact_handle.clone(),
                items,
                total,
                payment_state: PaymentState::Unpaid,
                queue_state: QueueState::None,
                queue_number: None,
                admitted_at: None,
                created_at: now,
                updated_at: now,
            };

            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            let bytes = serde_json::to_vec(&order)?;
            orders.insert(order.order_id.as_str(), bytes.as_slice())?;
            drop(orders);

            let mut invoices = write_txn.open_table(INVOICES_TABLE)?;
            invoices.insert(order.invoice_id.as_str(), order.order_id.as_str())?;
            drop(invoices);

            let mut active = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
            active.insert(order.order_id.as_str(), ())?;

            order
        };
        write_txn.commit()?;

        tracing::info!(
            order_id = %order.order_id,
            invoice_id = %order.invoice_id,
            total = order.total,
            "Order created"
        );
        Ok(order)
    }

    // ========== Point lookups ==========

    /// Fetch an order by id
    pub fn get(&self, order_id: &str) -> StoreResult<Order> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Err(StoreError::NotFound(order_id.to_string())),
        }
    }

    /// Fetch an order by customer-facing invoice id
    pub fn get_by_invoice(&self, invoice_id: &str) -> StoreResult<Order> {
        let read_txn = self.db.begin_read()?;
        let invoices = read_txn.open_table(INVOICES_TABLE)?;
        let order_id = match invoices.get(invoice_id)? {
            Some(guard) => guard.value().to_string(),
            None => return Err(StoreError::NotFound(invoice_id.to_string())),
        };
        drop(invoices);

        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id.as_str())? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Err(StoreError::NotFound(order_id)),
        }
    }

    // ========== Mutation primitives ==========

    /// Conditionally swap payment/queue state
    ///
    /// Succeeds only if the record currently matches the expected
    /// snapshot; otherwise fails with [`StoreError::StaleState`]
    /// carrying the current record. A swap into `in_preparation`
    /// additionally verifies, in the same transaction, that no other
    /// order holds the slot and fails with [`StoreError::SlotOccupied`]
    /// if one does. On success returns the updated order together with
    /// the freshly allocated event sequence number.
    pub fn compare_and_swap_state(
        &self,
        order_id: &str,
        expected_payment: PaymentState,
        expected_queue: QueueState,
        new_payment: PaymentState,
        new_queue: QueueState,
    ) -> StoreResult<(Order, u64)> {
        self.swap_internal(
            order_id,
            expected_payment,
            expected_queue,
            new_payment,
            new_queue,
            false,
        )
    }

    /// Admission variant of the swap: `unpaid/none -> paid/waiting`
    /// plus queue number and admission timestamp, all in one
    /// transaction so the "never waiting while unpaid" invariant can
    /// never be observed broken.
    pub fn admit_waiting(&self, order_id: &str) -> StoreResult<(Order, u64)> {
        self.swap_internal(
            order_id,
            PaymentState::Unpaid,
            QueueState::None,
            PaymentState::Paid,
            QueueState::Waiting,
            true,
        )
    }

    fn swap_internal(
        &self,
        order_id: &str,
        expected_payment: PaymentState,
        expected_queue: QueueState,
        new_payment: PaymentState,
        new_queue: QueueState,
        admit: bool,
    ) -> StoreResult<(Order, u64)> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            let mut order: Order = match orders.get(order_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StoreError::NotFound(order_id.to_string())),
            };

            if order.payment_state != expected_payment || order.queue_state != expected_queue {
                return Err(StoreError::StaleState(Box::new(order)));
            }

            // Slot exclusivity is enforced here, inside the same write
            // transaction as the swap: two promoters may both have seen
            // an empty slot and two different waiting heads, but the
            // second one lands after the first committed and is turned
            // away by this scan.
            if new_queue == QueueState::InPreparation {
                let active = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
                for entry in active.iter()? {
                    let (key, _) = entry?;
                    let id = key.value();
                    if id == order_id {
                        continue;
                    }
                    if let Some(guard) = orders.get(id)? {
                        let other: Order = serde_json::from_slice(guard.value())?;
                        if other.queue_state == QueueState::InPreparation {
                            return Err(StoreError::SlotOccupied(Box::new(other)));
                        }
                    }
                }
            }

            let now = now_millis();
            order.payment_state = new_payment;
            order.queue_state = new_queue;
            order.updated_at = now;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if admit {
                let next_queue = counters
                    .get(QUEUE_NUMBER_KEY)?
                    .map(|g| g.value())
                    .unwrap_or(0)
                    + 1;
                counters.insert(QUEUE_NUMBER_KEY, next_queue)?;
                order.queue_number = Some(next_queue);
                order.admitted_at = Some(now);
            }

            let sequence = counters
                .get(EVENT_SEQUENCE_KEY)?
                .map(|g| g.value())
                .unwrap_or(0)
                + 1;
            counters.insert(EVENT_SEQUENCE_KEY, sequence)?;
            drop(counters);

            let bytes = serde_json::to_vec(&order)?;
            orders.insert(order_id, bytes.as_slice())?;
            drop(orders);

            // Terminal states leave the non-terminal index
            if !order.is_non_terminal() {
                let mut active = write_txn.open_table(ACTIVE_ORDERS_TABLE)?;
                active.remove(order_id)?;
            }

            (order, sequence)
        };
        write_txn.commit()?;
        Ok(result)
    }

    // ========== Payment dedup ==========

    /// Whether a provider transaction id has already been recorded
    pub fn provider_txn_seen(&self, provider_txn_id: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_TXNS_TABLE)?;
        Ok(table.get(provider_txn_id)?.is_some())
    }

    /// Record a provider transaction id. Returns `false` if it was
    /// already seen (duplicate delivery). Persistent, so duplicates are
    /// recognized across restarts.
    pub fn record_provider_txn(&self, provider_txn_id: &str, order_id: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let fresh = {
            let mut table = write_txn.open_table(PROCESSED_TXNS_TABLE)?;
            if table.get(provider_txn_id)?.is_some() {
                false
            } else {
                table.insert(provider_txn_id, order_id)?;
                true
            }
        };
        write_txn.commit()?;
        Ok(fresh)
    }

    // ========== Derived queue views ==========

    /// All non-terminal orders (unpaid, waiting, in preparation)
    pub fn non_terminal_orders(&self) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let active = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in active.iter()? {
            let (key, _) = entry?;
            if let Some(guard) = orders.get(key.value())? {
                result.push(serde_json::from_slice::<Order>(guard.value())?);
            }
        }
        result.sort_by_key(|o| o.created_at);
        Ok(result)
    }

    /// Waiting orders in admission order: FIFO by admission timestamp,
    /// queue number breaks timestamp ties deterministically (lower wins).
    pub fn waiting_orders(&self) -> StoreResult<Vec<Order>> {
        let mut waiting: Vec<Order> = self
            .non_terminal_orders()?
            .into_iter()
            .filter(|o| o.queue_state == QueueState::Waiting)
            .collect();
        waiting.sort_by_key(|o| (o.admitted_at.unwrap_or(i64::MAX), o.queue_number));
        Ok(waiting)
    }

    /// The order currently occupying the preparation slot, if any
    pub fn active_order(&self) -> StoreResult<Option<Order>> {
        Ok(self
            .non_terminal_orders()?
            .into_iter()
            .find(|o| o.queue_state == QueueState::InPreparation))
    }

    /// Queue board read model: waiting + in-preparation orders by
    /// admission order, followed by orders completed within the given
    /// window. The window is an explicit parameter; no wall-clock day
    /// boundary lives in the engine.
    pub fn board_orders(&self, done_within_ms: i64, now: i64) -> StoreResult<Vec<Order>> {
        let mut queued = self.waiting_orders()?;
        if let Some(active) = self.active_order()? {
            queued.insert(0, active);
        }

        // Recently done orders come from a full scan; done records are
        // few compared to the full history only at large scale, at
        // which point an archive step would prune this table.
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let mut done = Vec::new();
        for entry in orders.iter()? {
            let (_, value) = entry?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.queue_state == QueueState::Done && order.updated_at >= now - done_within_ms {
                done.push(order);
            }
        }
        done.sort_by_key(|o| (o.admitted_at.unwrap_or(i64::MAX), o.queue_number));

        queued.extend(done);
        Ok(queued)
    }

    /// Overwrite an order record verbatim, bypassing the swap. Test
    /// fixture for forcing otherwise timing-dependent record shapes.
    #[cfg(test)]
    pub(crate) fn put_order_unchecked(&self, order: &Order) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            let bytes = serde_json::to_vec(order)?;
            orders.insert(order.order_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Current value of the event sequence counter
    pub fn current_sequence(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let counters = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(counters
            .get(EVENT_SEQUENCE_KEY)?
            .map(|g| g.value())
            .unwrap_or(0))
    }
}

/// Allocate the next invoice id: `INV-YYYYMMDD-NNNN` from a crash-safe
/// daily counter. Globally unique because the date participates.
fn next_invoice_id(txn: &WriteTransaction, now: i64) -> StoreResult<String> {
    let date = chrono::DateTime::from_timestamp_millis(now)
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y%m%d")
        .to_string();
    let date_num: u64 = date.parse().unwrap_or(0);

    let mut counters = txn.open_table(COUNTERS_TABLE)?;
    let stored_date = counters.get(INVOICE_DATE_KEY)?.map(|g| g.value());
    let count = if stored_date == Some(date_num) {
        counters
            .get(INVOICE_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0)
            + 1
    } else {
        1
    };
    counters.insert(INVOICE_DATE_KEY, date_num)?;
    counters.insert(INVOICE_COUNT_KEY, count)?;

    Ok(format!("INV-{}-{:04}", date, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::DraftItem;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, OrderStore) {
        let dir = TempDir::new().unwrap();
        let store = OrderStore::open(dir.path().join("orders.redb")).unwrap();
        store
            .put_product(&Product::new("product-x", "Pinukuik", 15000))
            .unwrap();
        store
            .put_product(&Product::new("product-y", "Teh Talua", 20000))
            .unwrap();
        (dir, store)
    }

    fn draft(items: Vec<DraftItem>) -> OrderDraft {
        OrderDraft {
            customer_name: "Budi".into(),
            contact_handle: "0812345678".into(),
            items,
        }
    }

    #[test]
    fn create_recomputes_total_server_side() {
        let (_dir, store) = test_store();
        let order = store
            .create(&draft(vec![
                DraftItem {
                    product_id: "product-x".into(),
                    quantity: 2,
                },
                DraftItem {
                    product_id: "product-y".into(),
                    quantity: 1,
                },
            ]))
            .unwrap();
        assert_eq!(order.total, 50000);
        assert_eq!(order.payment_state, PaymentState::Unpaid);
        assert_eq!(order.queue_state, QueueState::None);
    }

    #[test]
    fn total_survives_catalog_price_change() {
        let (_dir, store) = test_store();
        let order = store
            .create(&draft(vec![
                DraftItem {
                    product_id: "product-x".into(),
                    quantity: 2,
                },
                DraftItem {
                    product_id: "product-y".into(),
                    quantity: 1,
                },
            ]))
            .unwrap();
        assert_eq!(order.total, 50000);

        // Catalog price change must not retroactively alter the order
        store
            .put_product(&Product::new("product-x", "Pinukuik", 99000))
            .unwrap();
        let reloaded = store.get(&order.order_id).unwrap();
        assert_eq!(reloaded.total, 50000);
        assert_eq!(reloaded.items[0].unit_price, 15000);
    }

    #[test]
    fn create_rejects_bad_drafts() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.create(&draft(vec![])),
            Err(StoreError::EmptyOrder)
        ));
        assert!(matches!(
            store.create(&draft(vec![DraftItem {
                product_id: "nope".into(),
                quantity: 1,
            }])),
            Err(StoreError::InvalidProduct(_))
        ));
        assert!(matches!(
            store.create(&draft(vec![DraftItem {
                product_id: "product-x".into(),
                quantity: 0,
            }])),
            Err(StoreError::InvalidQuantity { .. })
        ));

        let mut inactive = Product::new("product-z", "Off menu", 1000);
        inactive.is_active = false;
        store.put_product(&inactive).unwrap();
        assert!(matches!(
            store.create(&draft(vec![DraftItem {
                product_id: "product-z".into(),
                quantity: 1,
            }])),
            Err(StoreError::InvalidProduct(_))
        ));
    }

    #[test]
    fn invoice_ids_are_unique_and_indexed() {
        let (_dir, store) = test_store();
        let items = vec![DraftItem {
            product_id: "product-x".into(),
            quantity: 1,
        }];
        let a = store.create(&draft(items.clone())).unwrap();
        let b = store.create(&draft(items)).unwrap();
        assert_ne!(a.invoice_id, b.invoice_id);
        assert!(a.invoice_id.starts_with("INV-"));

        let looked_up = store.get_by_invoice(&b.invoice_id).unwrap();
        assert_eq!(looked_up.order_id, b.order_id);
    }

    #[test]
    fn cas_detects_stale_state() {
        let (_dir, store) = test_store();
        let order = store
            .create(&draft(vec![DraftItem {
                product_id: "product-x".into(),
                quantity: 1,
            }]))
            .unwrap();

        let (admitted, seq1) = store.admit_waiting(&order.order_id).unwrap();
        assert_eq!(admitted.payment_state, PaymentState::Paid);
        assert_eq!(admitted.queue_state, QueueState::Waiting);
        assert_eq!(admitted.queue_number, Some(1));
        assert!(admitted.admitted_at.is_some());

        // Second admission sees the new state, not the expected one
        match store.admit_waiting(&order.order_id) {
            Err(StoreError::StaleState(current)) => {
                assert_eq!(current.queue_state, QueueState::Waiting);
            }
            other => panic!("expected StaleState, got {:?}", other.map(|(o, _)| o.queue_state)),
        }

        // Sequence numbers are allocated per successful swap only
        let (_, seq2) = store
            .compare_and_swap_state(
                &order.order_id,
                PaymentState::Paid,
                QueueState::Waiting,
                PaymentState::Paid,
                QueueState::InPreparation,
            )
            .unwrap();
        assert_eq!(seq2, seq1 + 1);
    }

    #[test]
    fn swap_into_occupied_slot_is_rejected() {
        let (_dir, store) = test_store();
        let items = vec![DraftItem {
            product_id: "product-x".into(),
            quantity: 1,
        }];
        let o1 = store.create(&draft(items.clone())).unwrap();
        let o2 = store.create(&draft(items)).unwrap();
        store.admit_waiting(&o1.order_id).unwrap();
        store.admit_waiting(&o2.order_id).unwrap();

        store
            .compare_and_swap_state(
                &o1.order_id,
                PaymentState::Paid,
                QueueState::Waiting,
                PaymentState::Paid,
                QueueState::InPreparation,
            )
            .unwrap();

        // O2 itself is still a perfectly valid waiting head, so its own
        // state check passes; the in-transaction slot scan must be what
        // turns this swap away.
        match store.compare_and_swap_state(
            &o2.order_id,
            PaymentState::Paid,
            QueueState::Waiting,
            PaymentState::Paid,
            QueueState::InPreparation,
        ) {
            Err(StoreError::SlotOccupied(occupant)) => {
                assert_eq!(occupant.order_id, o1.order_id);
            }
            other => panic!(
                "expected SlotOccupied, got {:?}",
                other.map(|(o, _)| o.queue_state)
            ),
        }

        // O2 is untouched and still waiting
        let reloaded = store.get(&o2.order_id).unwrap();
        assert_eq!(reloaded.queue_state, QueueState::Waiting);
    }

    #[test]
    fn provider_txn_dedup_is_persistent() {
        let (dir, store) = test_store();
        assert!(!store.provider_txn_seen("txn-1").unwrap());
        assert!(store.record_provider_txn("txn-1", "order-1").unwrap());
        assert!(!store.record_provider_txn("txn-1", "order-1").unwrap());
        assert!(store.provider_txn_seen("txn-1").unwrap());

        // Reopen the database: the txn must still be known
        drop(store);
        let store = OrderStore::open(dir.path().join("orders.redb")).unwrap();
        assert!(store.provider_txn_seen("txn-1").unwrap());
        assert!(!store.record_provider_txn("txn-1", "order-1").unwrap());
    }

    #[test]
    fn board_respects_done_window() {
        let (_dir, store) = test_store();
        let items = vec![DraftItem {
            product_id: "product-x".into(),
            quantity: 1,
        }];
        let order = store.create(&draft(items)).unwrap();
        store.admit_waiting(&order.order_id).unwrap();
        store
            .compare_and_swap_state(
                &order.order_id,
                PaymentState::Paid,
                QueueState::Waiting,
                PaymentState::Paid,
                QueueState::InPreparation,
            )
            .unwrap();
        store
            .compare_and_swap_state(
                &order.order_id,
                PaymentState::Paid,
                QueueState::InPreparation,
                PaymentState::Paid,
                QueueState::Done,
            )
            .unwrap();

        let now = now_millis();
        let board = store.board_orders(60_000, now).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].queue_state, QueueState::Done);

        // Outside the window the done order disappears from the board
        let board = store.board_orders(0, now + 60_000).unwrap();
        assert!(board.is_empty());
    }
}
