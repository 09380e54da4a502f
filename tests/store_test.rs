use chrono::NaiveDate;

use tiffin::order::OrderDraft;
use tiffin::store::OrderStore;
use tiffin::store::sqlite::SqliteStore;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(user_id: i64, d: NaiveDate, breakfast: bool, lunch: bool, dinner: bool) -> OrderDraft {
    OrderDraft {
        user_id,
        date: d,
        breakfast,
        lunch,
        dinner,
        total: tiffin::order::Order::compute_total(breakfast, lunch, dinner),
        canceled: false,
    }
}

#[tokio::test]
async fn find_user_returns_none_for_unknown_handle() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.find_user("nobody@wa").await.unwrap().is_none());
}

#[tokio::test]
async fn create_and_find_user() {
    let store = SqliteStore::in_memory().unwrap();
    let created = store.create_user("91999@wa", "Anu").await.unwrap();
    assert_eq!(created.handle, "91999@wa");
    assert_eq!(created.name, "Anu");

    let found = store.find_user("91999@wa").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn duplicate_handle_is_rejected() {
    let store = SqliteStore::in_memory().unwrap();
    store.create_user("a@wa", "A").await.unwrap();
    assert!(store.create_user("a@wa", "A again").await.is_err());
}

#[tokio::test]
async fn update_user_name() {
    let store = SqliteStore::in_memory().unwrap();
    let user = store.create_user("a@wa", "Old").await.unwrap();
    store.update_user_name(user.id, "New").await.unwrap();
    assert_eq!(store.find_user("a@wa").await.unwrap().unwrap().name, "New");
}

#[tokio::test]
async fn save_order_twice_updates_one_row() {
    let store = SqliteStore::in_memory().unwrap();
    let user = store.create_user("a@wa", "A").await.unwrap();
    let d = date(2025, 9, 11);

    let first = store.save_order(&draft(user.id, d, true, false, false)).await.unwrap();
    let second = store.save_order(&draft(user.id, d, true, true, false)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.total, 110);
    assert_eq!(store.orders_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn orders_are_keyed_per_date() {
    let store = SqliteStore::in_memory().unwrap();
    let user = store.create_user("a@wa", "A").await.unwrap();

    store.save_order(&draft(user.id, date(2025, 9, 11), true, false, false)).await.unwrap();
    store.save_order(&draft(user.id, date(2025, 9, 12), false, true, false)).await.unwrap();

    let orders = store.orders_for_user(user.id).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].date, date(2025, 9, 11));
    assert_eq!(orders[1].date, date(2025, 9, 12));
}

#[tokio::test]
async fn orders_for_date_filters_canceled() {
    let store = SqliteStore::in_memory().unwrap();
    let a = store.create_user("a@wa", "A").await.unwrap();
    let b = store.create_user("b@wa", "B").await.unwrap();
    let d = date(2025, 9, 11);

    store.save_order(&draft(a.id, d, true, false, false)).await.unwrap();
    let mut canceled = draft(b.id, d, false, true, false);
    canceled.canceled = true;
    store.save_order(&canceled).await.unwrap();

    assert_eq!(store.orders_for_date(d, false).await.unwrap().len(), 1);
    assert_eq!(store.orders_for_date(d, true).await.unwrap().len(), 2);
}

#[tokio::test]
async fn orders_for_month_is_bounded() {
    let store = SqliteStore::in_memory().unwrap();
    let user = store.create_user("a@wa", "A").await.unwrap();

    store.save_order(&draft(user.id, date(2025, 8, 31), true, false, false)).await.unwrap();
    store.save_order(&draft(user.id, date(2025, 9, 1), false, true, false)).await.unwrap();
    store.save_order(&draft(user.id, date(2025, 9, 30), false, false, true)).await.unwrap();
    store.save_order(&draft(user.id, date(2025, 10, 1), true, false, false)).await.unwrap();

    let september = store.orders_for_month(user.id, 2025, 9).await.unwrap();
    assert_eq!(september.len(), 2);
    assert!(september.iter().all(|o| o.date.to_string().starts_with("2025-09")));
}

#[tokio::test]
async fn december_month_boundary() {
    let store = SqliteStore::in_memory().unwrap();
    let user = store.create_user("a@wa", "A").await.unwrap();

    store.save_order(&draft(user.id, date(2025, 12, 31), true, false, false)).await.unwrap();
    store.save_order(&draft(user.id, date(2026, 1, 1), false, true, false)).await.unwrap();

    let december = store.orders_for_month(user.id, 2025, 12).await.unwrap();
    assert_eq!(december.len(), 1);
    assert_eq!(december[0].date, date(2025, 12, 31));
}

#[tokio::test]
async fn list_users_in_creation_order() {
    let store = SqliteStore::in_memory().unwrap();
    store.create_user("a@wa", "A").await.unwrap();
    store.create_user("b@wa", "B").await.unwrap();

    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].handle, "a@wa");
    assert_eq!(users[1].handle, "b@wa");
}

#[tokio::test]
async fn persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders-test.db");
    let path_str = path.to_str().unwrap();
    let d = date(2025, 9, 11);

    let user_id = {
        let store = SqliteStore::new(path_str).unwrap();
        let user = store.create_user("a@wa", "A").await.unwrap();
        store.save_order(&draft(user.id, d, true, true, false)).await.unwrap();
        user.id
    };

    let store = SqliteStore::new(path_str).unwrap();
    let order = store.find_order(user_id, d).await.unwrap().unwrap();
    assert_eq!(order.total, 110);
}
