//! Cutoff policy: may a meal still be ordered or changed for a target date?
//!
//! Pure functions over civil date/times in the kitchen timezone. The
//! orchestrator consults these before any mutation; the store layer never
//! looks at the clock.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::consts::{evening_cutoff, midday_cutoff};
use crate::order::{Meal, MealSelection};

/// Outcome of evaluating one meal (or a whole request) against the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Evaluate a single meal for `target` at instant `now`.
///
/// Rules:
/// - more than one day out: always allowed
/// - breakfast/lunch: only on the day before `target`, strictly before 21:30
/// - dinner for today: strictly before 12:30 that day
/// - dinner for tomorrow: always allowed
pub fn evaluate(meal: Meal, target: NaiveDate, now: NaiveDateTime) -> Decision {
    let today = now.date();

    // Far-future orders have no restriction.
    if target > today + Days::new(1) {
        return Decision::Allowed;
    }

    match meal {
        Meal::Breakfast | Meal::Lunch => {
            let eve = target.checked_sub_days(Days::new(1));
            if eve == Some(today) && now.time() < evening_cutoff() {
                Decision::Allowed
            } else {
                Decision::Rejected {
                    reason: format!(
                        "{meal} for {target} closes at 21:30 on {}",
                        eve.map_or_else(|| "the day before".to_string(), |d| d.to_string()),
                    ),
                }
            }
        }
        Meal::Dinner => {
            if target == today + Days::new(1) {
                Decision::Allowed
            } else if target == today {
                if now.time() < midday_cutoff() {
                    Decision::Allowed
                } else {
                    Decision::Rejected {
                        reason: format!("dinner for {target} closes at 12:30 that day"),
                    }
                }
            } else {
                // target is in the past
                Decision::Rejected {
                    reason: format!("dinner for {target} can no longer be ordered"),
                }
            }
        }
    }
}

/// Evaluate every meal requested true, in fixed breakfast→lunch→dinner
/// order. The first rejection wins; flags left false or absent are never
/// evaluated.
pub fn evaluate_selection(
    selection: &MealSelection,
    target: NaiveDate,
    now: NaiveDateTime,
) -> Decision {
    for meal in selection.requested() {
        let decision = evaluate(meal, target, now);
        if !decision.is_allowed() {
            return decision;
        }
    }
    Decision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        d.and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    #[test]
    fn far_future_always_allowed() {
        let today = date(2025, 9, 10);
        let target = date(2025, 9, 12);
        for meal in Meal::ALL {
            assert!(evaluate(meal, target, at(today, 23, 59)).is_allowed());
            assert!(evaluate(meal, target, at(today, 0, 0)).is_allowed());
        }
    }

    #[test]
    fn breakfast_allowed_before_evening_cutoff() {
        let eve = date(2025, 9, 10);
        let target = date(2025, 9, 11);
        assert!(evaluate(Meal::Breakfast, target, at(eve, 21, 29)).is_allowed());
        assert!(evaluate(Meal::Lunch, target, at(eve, 21, 29)).is_allowed());
    }

    #[test]
    fn breakfast_rejected_at_and_after_cutoff() {
        let eve = date(2025, 9, 10);
        let target = date(2025, 9, 11);
        assert!(!evaluate(Meal::Breakfast, target, at(eve, 21, 30)).is_allowed());
        assert!(!evaluate(Meal::Lunch, target, at(eve, 21, 31)).is_allowed());
    }

    #[test]
    fn breakfast_for_today_rejected() {
        // The evening-before window has passed once the target date starts.
        let today = date(2025, 9, 11);
        assert!(!evaluate(Meal::Breakfast, today, at(today, 6, 0)).is_allowed());
    }

    #[test]
    fn breakfast_rejection_names_meal_date_and_cutoff() {
        let target = date(2025, 9, 11);
        let now = at(date(2025, 9, 10), 22, 0);
        match evaluate(Meal::Breakfast, target, now) {
            Decision::Rejected { reason } => {
                assert!(reason.contains("breakfast"));
                assert!(reason.contains("2025-09-11"));
                assert!(reason.contains("21:30"));
            }
            Decision::Allowed => panic!("expected rejection"),
        }
    }

    #[test]
    fn dinner_today_allowed_before_midday_cutoff() {
        let today = date(2025, 9, 11);
        assert!(evaluate(Meal::Dinner, today, at(today, 12, 29)).is_allowed());
    }

    #[test]
    fn dinner_today_rejected_at_and_after_midday() {
        let today = date(2025, 9, 11);
        assert!(!evaluate(Meal::Dinner, today, at(today, 12, 30)).is_allowed());
        assert!(!evaluate(Meal::Dinner, today, at(today, 12, 31)).is_allowed());
    }

    #[test]
    fn dinner_tomorrow_always_allowed() {
        let today = date(2025, 9, 10);
        let tomorrow = date(2025, 9, 11);
        assert!(evaluate(Meal::Dinner, tomorrow, at(today, 0, 0)).is_allowed());
        assert!(evaluate(Meal::Dinner, tomorrow, at(today, 23, 59)).is_allowed());
    }

    #[test]
    fn dinner_past_date_rejected() {
        let today = date(2025, 9, 11);
        assert!(!evaluate(Meal::Dinner, date(2025, 9, 10), at(today, 8, 0)).is_allowed());
    }

    #[test]
    fn selection_first_failure_wins_in_fixed_order() {
        // Dinner for tomorrow would pass, but breakfast fails first.
        let today = date(2025, 9, 10);
        let tomorrow = date(2025, 9, 11);
        let sel = MealSelection::full(true, true, true);
        match evaluate_selection(&sel, tomorrow, at(today, 22, 0)) {
            Decision::Rejected { reason } => assert!(reason.contains("breakfast")),
            Decision::Allowed => panic!("expected rejection"),
        }
    }

    #[test]
    fn selection_skips_false_and_absent_flags() {
        // Breakfast is past cutoff but not requested, so dinner-for-tomorrow
        // passes the whole request.
        let today = date(2025, 9, 10);
        let tomorrow = date(2025, 9, 11);
        let sel = MealSelection {
            breakfast: Some(false),
            lunch: None,
            dinner: Some(true),
        };
        assert!(evaluate_selection(&sel, tomorrow, at(today, 22, 0)).is_allowed());
    }

    #[test]
    fn empty_selection_is_allowed() {
        let today = date(2025, 9, 10);
        assert!(
            evaluate_selection(&MealSelection::default(), today, at(today, 23, 0)).is_allowed()
        );
    }
}
