//! Persisted users and orders. Could be SQLite, Postgres, etc.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::order::{Order, OrderDraft, User};

/// What the engines need from persistence. A `save_order` for a
/// (user, date) that already has a row must update that row in place,
/// never insert a second record.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_user(&self, handle: &str) -> Result<Option<User>>;
    async fn create_user(&self, handle: &str, name: &str) -> Result<User>;
    async fn update_user_name(&self, id: i64, name: &str) -> Result<()>;
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn find_order(&self, user_id: i64, date: NaiveDate) -> Result<Option<Order>>;
    async fn save_order(&self, draft: &OrderDraft) -> Result<Order>;
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>>;
    /// Orders for one calendar date; optionally including canceled ones.
    async fn orders_for_date(&self, date: NaiveDate, include_canceled: bool) -> Result<Vec<Order>>;
    /// All of a user's orders within one calendar month.
    async fn orders_for_month(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<Order>>;
}
