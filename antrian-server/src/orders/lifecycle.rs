//! LifecycleController - the payment-gated order state machine
//!
//! ```text
//! unpaid/none ──payment success──► paid/waiting ──promote──► paid/in_preparation ──complete──► paid/done
//!      │
//!      └──payment failure──► cancelled (terminal, never queued)
//! ```
//!
//! Every transition is applied through the store's compare-and-swap.
//! On `StaleState` the controller re-reads current truth and decides
//! no-op vs propagate - never blind overwrite. This is what makes
//! duplicate payment deliveries collapse into exactly one transition
//! without any extra coordination state.
//!
//! Every successful transition emits exactly one [`LifecycleEvent`];
//! publication is fire-and-forget relative to the swap, so a slow
//! observer can never block a transition.

use std::sync::Arc;

use shared::order::{
    LifecycleEvent, LifecycleEventType, Order, OrderDraft, PaymentHandle, PaymentNotification,
    PaymentOutcome, PaymentState, QueueSnapshot, QueueState,
};
use shared::util::now_millis;
use thiserror::Error;

use super::broadcast::EventBroadcaster;
use super::sequencer::{QueueSequencer, SequencerError};
use super::store::{OrderStore, StoreError};
use crate::payment::{GatewayError, PaymentGateway};

/// Controller errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// The lifecycle controller - sole writer of order state
pub struct LifecycleController {
    store: OrderStore,
    sequencer: QueueSequencer,
    broadcaster: EventBroadcaster,
    gateway: Arc<dyn PaymentGateway>,
}

impl LifecycleController {
    pub fn new(
        store: OrderStore,
        sequencer: QueueSequencer,
        broadcaster: EventBroadcaster,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            store,
            sequencer,
            broadcaster,
            gateway,
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    // ========== Creation ==========

    /// Create a draft order and request a payment handle
    ///
    /// The order is persisted `unpaid/none` before the gateway is
    /// called. A gateway failure is not fatal: the order is returned
    /// without a handle so the caller still learns its identifiers and
    /// can retry through [`Self::payment_handle`].
    pub async fn create_order(
        &self,
        draft: &OrderDraft,
    ) -> LifecycleResult<(Order, Option<PaymentHandle>)> {
        let order = self.store.create(draft)?;
        match self.gateway.initiate(&order).await {
            Ok(handle) => Ok((order, Some(handle))),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.order_id,
                    error = %e,
                    "Payment initiation failed, order left awaiting payment"
                );
                Ok((order, None))
            }
        }
    }

    /// Re-issue a payment handle for an order still awaiting payment
    pub async fn payment_handle(&self, order_id: &str) -> LifecycleResult<PaymentHandle> {
        let order = self.store.get(order_id)?;
        if order.payment_state != PaymentState::Unpaid {
            return Err(StoreError::StaleState(Box::new(order)).into());
        }
        Ok(self.gateway.initiate(&order).await?)
    }

    // ========== Payment reconciliation ==========

    /// Apply a normalized payment notification
    ///
    /// Callable any number of times, in any order. Returns the emitted
    /// event when a transition was applied, `None` when the
    /// notification was a duplicate, non-terminal, or dropped. Dropped
    /// notifications are logged, never fatal - the HTTP layer always
    /// acknowledges to stop provider retry storms.
    pub fn handle_payment_outcome(
        &self,
        notification: &PaymentNotification,
    ) -> LifecycleResult<Option<LifecycleEvent>> {
        // Dedup by the provider's own transaction id, persisted so
        // duplicates are recognized across restarts.
        if self.store.provider_txn_seen(&notification.provider_txn_id)? {
            tracing::debug!(
                provider_txn_id = %notification.provider_txn_id,
                order_id = %notification.order_id,
                "Duplicate payment notification ignored"
            );
            return Ok(None);
        }

        let order = match self.store.get(&notification.order_id) {
            Ok(order) => order,
            Err(StoreError::NotFound(id)) => {
                tracing::warn!(order_id = %id, "Payment notification for unknown order dropped");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let applied = match notification.outcome {
            PaymentOutcome::Pending => {
                // Not terminal - the same provider transaction will
                // report again, so its id stays unconsumed.
                tracing::info!(order_id = %order.order_id, "Payment pending, no state change");
                return Ok(None);
            }
            PaymentOutcome::Success => self.apply_payment_success(order)?,
            PaymentOutcome::Failure => self.apply_payment_failure(order)?,
        };

        // Recorded only once the terminal outcome has been fully
        // processed. If anything above errors out, the provider's retry
        // with the same txn id is processed again instead of being
        // swallowed as a duplicate; a concurrent duplicate that slips
        // past the seen-check collapses in the CAS.
        self.store
            .record_provider_txn(&notification.provider_txn_id, &notification.order_id)?;
        Ok(applied)
    }

    fn apply_payment_success(&self, order: Order) -> LifecycleResult<Option<LifecycleEvent>> {
        if order.total <= 0 {
            tracing::warn!(
                order_id = %order.order_id,
                total = order.total,
                "Payment success for non-positive total dropped"
            );
            return Ok(None);
        }

        match self.sequencer.admit(&order.order_id) {
            Ok((admitted, sequence)) => {
                let event = self.emit(
                    &admitted,
                    LifecycleEventType::OrderAdmitted,
                    QueueState::None,
                    sequence,
                );
                tracing::info!(
                    order_id = %admitted.order_id,
                    queue_number = ?admitted.queue_number,
                    "Order admitted to waiting line"
                );
                Ok(Some(event))
            }
            Err(SequencerError::AlreadyAdmitted(_)) => {
                // Desired end state already reached: duplicate delivery
                // that slipped past txn dedup (different provider txn id)
                tracing::debug!(
                    order_id = %order.order_id,
                    "Payment success already applied, no-op"
                );
                Ok(None)
            }
            Err(SequencerError::Store(StoreError::StaleState(current))) => {
                tracing::warn!(
                    order_id = %current.order_id,
                    payment_state = ?current.payment_state,
                    "Payment success for terminally failed order dropped"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn apply_payment_failure(&self, order: Order) -> LifecycleResult<Option<LifecycleEvent>> {
        match self.store.compare_and_swap_state(
            &order.order_id,
            PaymentState::Unpaid,
            QueueState::None,
            PaymentState::Failed,
            QueueState::None,
        ) {
            Ok((cancelled, sequence)) => {
                let event = self.emit(
                    &cancelled,
                    LifecycleEventType::OrderCancelled,
                    QueueState::None,
                    sequence,
                );
                tracing::info!(order_id = %cancelled.order_id, "Order cancelled (payment failed)");
                Ok(Some(event))
            }
            Err(StoreError::StaleState(current)) => {
                if current.payment_state == PaymentState::Failed {
                    tracing::debug!(
                        order_id = %current.order_id,
                        "Payment failure already applied, no-op"
                    );
                } else {
                    // A success landed first; the failure is stale
                    tracing::warn!(
                        order_id = %current.order_id,
                        queue_state = %current.queue_state,
                        "Payment failure after success dropped"
                    );
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========== Operator actions ==========

    /// Promote the head of the waiting line into the preparation slot
    ///
    /// Empty result when nothing is eligible or the slot is occupied.
    pub fn promote(&self) -> LifecycleResult<Option<Order>> {
        let Some((order, sequence)) = self.sequencer.promote_head()? else {
            return Ok(None);
        };
        self.emit(
            &order,
            LifecycleEventType::PreparationStarted,
            QueueState::Waiting,
            sequence,
        );
        tracing::info!(
            order_id = %order.order_id,
            queue_number = ?order.queue_number,
            "Preparation started"
        );
        Ok(Some(order))
    }

    /// Complete the order currently in preparation
    pub fn complete(&self, order_id: &str) -> LifecycleResult<Order> {
        let (order, sequence) = self.sequencer.complete_active(order_id)?;
        self.emit(
            &order,
            LifecycleEventType::OrderCompleted,
            QueueState::InPreparation,
            sequence,
        );
        tracing::info!(order_id = %order.order_id, "Order completed");
        Ok(order)
    }

    // ========== Observer support ==========

    /// Snapshot of all non-terminal orders plus the current sequence,
    /// for immediate correct rendering on (re)subscribe.
    pub fn snapshot(&self) -> LifecycleResult<QueueSnapshot> {
        // Sequence first: a transition racing this snapshot then shows
        // up as a replayable event rather than a silent gap.
        let sequence = self.store.current_sequence()?;
        let orders = self.store.non_terminal_orders()?;
        Ok(QueueSnapshot { sequence, orders })
    }

    fn emit(
        &self,
        order: &Order,
        event_type: LifecycleEventType,
        previous: QueueState,
        sequence: u64,
    ) -> LifecycleEvent {
        let event = LifecycleEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id: order.order_id.clone(),
            event_type,
            previous_queue_state: previous,
            new_queue_state: order.queue_state,
            queue_number: order.queue_number,
            timestamp: now_millis(),
        };
        self.broadcaster.publish(event.clone());
        event
    }
}
