//! Structured intents extracted from free-form messages.
//!
//! The extractor (an external language model) returns JSON; [`parse_intent`]
//! turns that text into an [`Intent`] and never fails: anything malformed
//! becomes a clarification carrying the raw text, so the orchestrator always
//! has something to reply with.

pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::order::{MealSelection, Order};
use crate::session::Turn;

/// What the extractor decided the message means. Dates stay as raw strings
/// here; the orchestrator resolves and validates them.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// A new order or a change to an existing one.
    Order {
        reply: String,
        date: Option<String>,
        meals: MealSelection,
    },
    /// Cancel the order for a date.
    Cancel { reply: String, date: Option<String> },
    /// Ambiguous or off-topic. Reply with a clarifying question, mutate
    /// nothing.
    Clarify { reply: String },
}

/// Everything the extractor gets to see for one inbound message.
pub struct MessageContext {
    pub user_handle: String,
    pub user_name: String,
    pub text: String,
    /// Candidate date when the user names none (tomorrow).
    pub default_date: NaiveDate,
    /// Arrival instant in kitchen-local time.
    pub sent_at: NaiveDateTime,
    pub history: Vec<Turn>,
    /// The user's recent orders, newest last.
    pub recent_orders: Vec<Order>,
}

/// The upstream collaborator that turns text into an [`Intent`].
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, context: &MessageContext) -> Result<Intent>;
}

/// Parse raw model output into an intent. Infallible: non-JSON output is a
/// clarification with the cleaned raw text as the reply.
pub fn parse_intent(raw: &str) -> Intent {
    let clean = strip_think(raw);
    let json = extract_json(&clean);

    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return Intent::Clarify {
            reply: clean.trim().to_string(),
        };
    };

    let reply = value
        .get("reply")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if coerce_flag(value.get("counter")) != Some(true) {
        return Intent::Clarify { reply };
    }

    if value.get("action").and_then(Value::as_str) == Some("cancel") {
        let date = value
            .get("date")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Intent::Cancel { reply, date };
    }

    if let Some(order) = value.get("order") {
        let meals = MealSelection {
            breakfast: coerce_flag(order.get("breakfast")),
            lunch: coerce_flag(order.get("lunch")),
            dinner: coerce_flag(order.get("dinner")),
        };
        let date = order
            .get("date")
            .and_then(Value::as_str)
            .or_else(|| value.get("date").and_then(Value::as_str))
            .map(str::to_string);
        return Intent::Order { reply, date, meals };
    }

    Intent::Clarify { reply }
}

/// Interpret 1/0, true/false, or their string forms as a flag. Absent or
/// null stays absent, which is what makes a selection a delta.
fn coerce_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().unwrap_or(0.0) != 0.0),
        Value::String(s) => match s.trim() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        Value::Null => None,
        _ => None,
    }
}

/// Remove `<think>…</think>` blocks some models emit before the JSON.
fn strip_think(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => return out, // unterminated block: drop the tail
        }
    }
    out.push_str(rest);
    out
}

/// Extract JSON from text that may be wrapped in markdown code fences.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(after) = trimmed.strip_prefix("```json")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }
    if let Some(after) = trimmed.strip_prefix("```")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }

    trimmed
}
