//! Reporting over the order store: daily counts, who-ordered-what, and who
//! has not ordered yet.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;

use crate::order::{Meal, Order, User};
use crate::store::OrderStore;

/// Meal counts and money total over the active orders for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
    pub total: u32,
}

/// Per-user breakdown for one date, plus the users with no active order.
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub orders: Vec<(User, Order)>,
    pub missing: Vec<User>,
}

pub async fn daily_summary(store: &dyn OrderStore, date: NaiveDate) -> Result<DailySummary> {
    let orders = store.orders_for_date(date, false).await?;
    let breakfast = orders.iter().filter(|o| o.breakfast).count();
    let lunch = orders.iter().filter(|o| o.lunch).count();
    let dinner = orders.iter().filter(|o| o.dinner).count();
    let total = breakfast as u32 * Meal::Breakfast.price()
        + lunch as u32 * Meal::Lunch.price()
        + dinner as u32 * Meal::Dinner.price();
    Ok(DailySummary {
        date,
        breakfast,
        lunch,
        dinner,
        total,
    })
}

pub async fn daily_report(store: &dyn OrderStore, date: NaiveDate) -> Result<DailyReport> {
    let users = store.list_users().await?;
    let active = store.orders_for_date(date, false).await?;

    let mut by_user: HashMap<i64, User> = users.iter().map(|u| (u.id, u.clone())).collect();
    let mut orders = Vec::with_capacity(active.len());
    for order in active {
        // Orders reference users by foreign key; an unknown id would mean a
        // corrupt database, skip rather than fail the whole report.
        if let Some(user) = by_user.remove(&order.user_id) {
            orders.push((user, order));
        }
    }
    let mut missing: Vec<User> = by_user.into_values().collect();
    missing.sort_by_key(|u| u.id);

    Ok(DailyReport {
        date,
        orders,
        missing,
    })
}

/// A user's orders within one calendar month (`YYYY-MM`). `None` when the
/// handle is unknown.
pub async fn monthly_orders(
    store: &dyn OrderStore,
    handle: &str,
    year: i32,
    month: u32,
) -> Result<Option<(User, Vec<Order>)>> {
    let Some(user) = store.find_user(handle).await? else {
        return Ok(None);
    };
    let orders = store.orders_for_month(user.id, year, month).await?;
    Ok(Some((user, orders)))
}
