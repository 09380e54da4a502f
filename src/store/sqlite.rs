//! SQLite-backed order store.

use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, params};

use super::OrderStore;
use crate::order::{Order, OrderDraft, User};

/// Orders and users in a single SQLite database. The connection mutex
/// serializes all access; the `UNIQUE(user_id, order_date)` constraint plus
/// the upsert in [`save_order`](OrderStore::save_order) make a concurrent
/// save for the same key update one row instead of inserting a second.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open order database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                handle TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                age INTEGER,
                address TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                order_date TEXT NOT NULL,
                breakfast INTEGER NOT NULL DEFAULT 0,
                lunch INTEGER NOT NULL DEFAULT 0,
                dinner INTEGER NOT NULL DEFAULT 0,
                total INTEGER NOT NULL,
                canceled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, order_date)
            );",
        )
        .context("failed to create tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }
}

// Raw row tuples before date parsing.
type UserRow = (i64, String, String, Option<u32>, Option<String>, String);
type OrderRow = (i64, i64, String, bool, bool, bool, u32, bool, String);

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("bad timestamp in database: {s}"))?;
    Ok(naive.and_utc())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date in database: {s}"))
}

fn to_user(row: UserRow) -> Result<User> {
    let (id, handle, name, age, address, created_at) = row;
    Ok(User {
        id,
        handle,
        name,
        age,
        address,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn to_order(row: OrderRow) -> Result<Order> {
    let (id, user_id, date, breakfast, lunch, dinner, total, canceled, created_at) = row;
    Ok(Order {
        id,
        user_id,
        date: parse_date(&date)?,
        breakfast,
        lunch,
        dinner,
        total,
        canceled,
        created_at: parse_timestamp(&created_at)?,
    })
}

const USER_COLS: &str = "id, handle, name, age, address, created_at";
const ORDER_COLS: &str =
    "id, user_id, order_date, breakfast, lunch, dinner, total, canceled, created_at";

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn order_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn get_order(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<Option<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLS} FROM orders WHERE user_id = ?1 AND order_date = ?2"
    ))?;
    let mut rows = stmt.query(params![user_id, date.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(to_order(order_row(row)?)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn find_user(&self, handle: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE handle = ?1"))?;
        let mut rows = stmt.query([handle])?;
        match rows.next()? {
            Some(row) => Ok(Some(to_user(user_row(row)?)?)),
            None => Ok(None),
        }
    }

    async fn create_user(&self, handle: &str, name: &str) -> Result<User> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (handle, name) VALUES (?1, ?2)",
            [handle, name],
        )?;
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE handle = ?1"))?;
        let mut rows = stmt.query([handle])?;
        match rows.next()? {
            Some(row) => to_user(user_row(row)?),
            None => anyhow::bail!("user vanished right after insert"),
        }
    }

    async fn update_user_name(&self, id: i64, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY id ASC"))?;
        let raw = stmt
            .query_map([], user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(to_user).collect()
    }

    async fn find_order(&self, user_id: i64, date: NaiveDate) -> Result<Option<Order>> {
        let conn = self.conn.lock().unwrap();
        get_order(&conn, user_id, date)
    }

    async fn save_order(&self, draft: &OrderDraft) -> Result<Order> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO orders (user_id, order_date, breakfast, lunch, dinner, total, canceled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, order_date) DO UPDATE SET
                breakfast = excluded.breakfast,
                lunch = excluded.lunch,
                dinner = excluded.dinner,
                total = excluded.total,
                canceled = excluded.canceled",
            params![
                draft.user_id,
                draft.date.to_string(),
                draft.breakfast,
                draft.lunch,
                draft.dinner,
                draft.total,
                draft.canceled,
            ],
        )?;
        get_order(&conn, draft.user_id, draft.date)?
            .context("order vanished right after save")
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLS} FROM orders WHERE user_id = ?1 ORDER BY order_date ASC"
        ))?;
        let raw = stmt
            .query_map([user_id], order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(to_order).collect()
    }

    async fn orders_for_date(&self, date: NaiveDate, include_canceled: bool) -> Result<Vec<Order>> {
        let conn = self.conn.lock().unwrap();
        let sql = if include_canceled {
            format!("SELECT {ORDER_COLS} FROM orders WHERE order_date = ?1 ORDER BY user_id ASC")
        } else {
            format!(
                "SELECT {ORDER_COLS} FROM orders
                 WHERE order_date = ?1 AND canceled = 0 ORDER BY user_id ASC"
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map([date.to_string()], order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(to_order).collect()
    }

    async fn orders_for_month(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<Order>> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("invalid month: {year}-{month:02}"))?;
        // First day of the next month; ISO dates compare lexicographically.
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .with_context(|| format!("invalid month: {year}-{month:02}"))?;
        debug_assert_eq!(start.month(), month);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLS} FROM orders
             WHERE user_id = ?1 AND order_date >= ?2 AND order_date < ?3
             ORDER BY order_date ASC"
        ))?;
        let raw = stmt
            .query_map(
                params![user_id, start.to_string(), end.to_string()],
                order_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(to_order).collect()
    }
}
