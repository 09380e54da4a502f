//! The order desk: create-or-merge and cancel, serialized per (user, date).
//!
//! Pure state-merge primitives; the cutoff policy is the caller's job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::order::{MealSelection, Order, OrderDraft, User};
use crate::store::OrderStore;

#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or missing request fields. No mutation was performed.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The persisted store failed. Surfaced untouched, never retried here.
    #[error("storage failure: {0}")]
    Store(#[source] anyhow::Error),
}

/// Applies order mutations. Holds one async lock per (user, date) key so the
/// read-modify-write inside `upsert`/`cancel` cannot race a concurrent
/// writer on the same key; different keys proceed in parallel.
pub struct OrderDesk {
    store: Arc<dyn OrderStore>,
    locks: Mutex<HashMap<(i64, NaiveDate), Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderDesk {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, user_id: i64, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry((user_id, date)).or_default())
    }

    /// Create-or-merge the order for (user, date).
    ///
    /// Flags present in `selection` replace the stored ones; absent flags
    /// are kept. The total is recomputed from the resulting full flag set
    /// and `canceled` is cleared. Applying the same request twice yields
    /// the same final record.
    pub async fn upsert(
        &self,
        user: &User,
        date: NaiveDate,
        selection: &MealSelection,
    ) -> Result<Order, OrderError> {
        let key_lock = self.lock_for(user.id, date);
        let _guard = key_lock.lock().await;

        let existing = self
            .store
            .find_order(user.id, date)
            .await
            .map_err(OrderError::Store)?;

        let (breakfast, lunch, dinner) = match &existing {
            Some(o) => (
                selection.breakfast.unwrap_or(o.breakfast),
                selection.lunch.unwrap_or(o.lunch),
                selection.dinner.unwrap_or(o.dinner),
            ),
            None => (
                selection.breakfast.unwrap_or(false),
                selection.lunch.unwrap_or(false),
                selection.dinner.unwrap_or(false),
            ),
        };

        let draft = OrderDraft {
            user_id: user.id,
            date,
            breakfast,
            lunch,
            dinner,
            total: Order::compute_total(breakfast, lunch, dinner),
            canceled: false,
        };
        let saved = self
            .store
            .save_order(&draft)
            .await
            .map_err(OrderError::Store)?;

        info!(
            handle = %user.handle,
            %date,
            total = saved.total,
            updated = existing.is_some(),
            "order saved"
        );
        Ok(saved)
    }

    /// Mark the active order for (user, date) canceled. Returns `None` when
    /// there is nothing to cancel (absent or already canceled), in which
    /// case no store write happens.
    pub async fn cancel(&self, user: &User, date: NaiveDate) -> Result<Option<Order>, OrderError> {
        let key_lock = self.lock_for(user.id, date);
        let _guard = key_lock.lock().await;

        let existing = self
            .store
            .find_order(user.id, date)
            .await
            .map_err(OrderError::Store)?;

        let Some(order) = existing else {
            return Ok(None);
        };
        if order.canceled {
            return Ok(None);
        }

        let draft = OrderDraft {
            user_id: order.user_id,
            date: order.date,
            breakfast: order.breakfast,
            lunch: order.lunch,
            dinner: order.dinner,
            total: order.total,
            canceled: true,
        };
        let saved = self
            .store
            .save_order(&draft)
            .await
            .map_err(OrderError::Store)?;

        info!(handle = %user.handle, %date, "order canceled");
        Ok(Some(saved))
    }
}
