//! Domain types: meals, orders, users.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// The three meals the kitchen serves, in the fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    /// Price in rupees. Process-wide constant, never mutated at runtime.
    pub fn price(self) -> u32 {
        match self {
            Meal::Breakfast => 40,
            Meal::Lunch => 70,
            Meal::Dinner => 40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Meal::Breakfast => "breakfast",
            Meal::Lunch => "lunch",
            Meal::Dinner => "dinner",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A requested change to the three meal flags. `None` means "leave as is",
/// so the same type carries both deltas and full replacement sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MealSelection {
    pub breakfast: Option<bool>,
    pub lunch: Option<bool>,
    pub dinner: Option<bool>,
}

impl MealSelection {
    /// A full replacement set with every flag present.
    pub fn full(breakfast: bool, lunch: bool, dinner: bool) -> Self {
        Self {
            breakfast: Some(breakfast),
            lunch: Some(lunch),
            dinner: Some(dinner),
        }
    }

    pub fn get(&self, meal: Meal) -> Option<bool> {
        match meal {
            Meal::Breakfast => self.breakfast,
            Meal::Lunch => self.lunch,
            Meal::Dinner => self.dinner,
        }
    }

    /// Meals explicitly requested (set to true), in fixed order.
    pub fn requested(&self) -> Vec<Meal> {
        Meal::ALL
            .into_iter()
            .filter(|m| self.get(*m) == Some(true))
            .collect()
    }

    /// True when no flag is present at all.
    pub fn is_empty(&self) -> bool {
        self.breakfast.is_none() && self.lunch.is_none() && self.dinner.is_none()
    }
}

/// A persisted order. At most one non-historical record per (user, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
    /// Always `price(breakfast) + price(lunch) + price(dinner)` over the
    /// flags that are set.
    pub total: u32,
    pub canceled: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn flag(&self, meal: Meal) -> bool {
        match meal {
            Meal::Breakfast => self.breakfast,
            Meal::Lunch => self.lunch,
            Meal::Dinner => self.dinner,
        }
    }

    pub fn compute_total(breakfast: bool, lunch: bool, dinner: bool) -> u32 {
        let mut total = 0;
        if breakfast {
            total += Meal::Breakfast.price();
        }
        if lunch {
            total += Meal::Lunch.price();
        }
        if dinner {
            total += Meal::Dinner.price();
        }
        total
    }

    /// Comma-separated list of the meals on this order, for replies.
    pub fn meals(&self) -> String {
        let names: Vec<&str> = Meal::ALL
            .into_iter()
            .filter(|m| self.flag(*m))
            .map(Meal::name)
            .collect();
        if names.is_empty() {
            "no meals".to_string()
        } else {
            names.join(", ")
        }
    }
}

/// The fields of an order before the store assigns id and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: i64,
    pub date: NaiveDate,
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
    pub total: u32,
    pub canceled: bool,
}

/// Someone who orders. Created on first contact, identified by an opaque
/// messaging handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub handle: String,
    pub name: String,
    pub age: Option<u32>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_match_the_menu() {
        assert_eq!(Meal::Breakfast.price(), 40);
        assert_eq!(Meal::Lunch.price(), 70);
        assert_eq!(Meal::Dinner.price(), 40);
    }

    #[test]
    fn total_sums_only_set_flags() {
        assert_eq!(Order::compute_total(false, false, false), 0);
        assert_eq!(Order::compute_total(true, true, false), 110);
        assert_eq!(Order::compute_total(true, true, true), 150);
    }

    #[test]
    fn requested_respects_fixed_order() {
        let sel = MealSelection {
            breakfast: Some(true),
            lunch: Some(false),
            dinner: Some(true),
        };
        assert_eq!(sel.requested(), vec![Meal::Breakfast, Meal::Dinner]);
    }

    #[test]
    fn absent_flags_are_not_requested() {
        let sel = MealSelection {
            breakfast: None,
            lunch: Some(true),
            dinner: None,
        };
        assert_eq!(sel.requested(), vec![Meal::Lunch]);
        assert!(!sel.is_empty());
    }

    #[test]
    fn default_selection_is_empty() {
        assert!(MealSelection::default().is_empty());
        assert!(MealSelection::default().requested().is_empty());
    }

    #[test]
    fn meals_renders_names() {
        let order = Order {
            id: 1,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            breakfast: true,
            lunch: true,
            dinner: false,
            total: 110,
            canceled: false,
            created_at: Utc::now(),
        };
        assert_eq!(order.meals(), "breakfast, lunch");
    }
}
