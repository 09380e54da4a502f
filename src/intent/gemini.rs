//! Intent extraction via the Gemini generateContent API.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Intent, IntentExtractor, MessageContext, parse_intent};
use crate::consts::DEFAULT_MODEL;

const API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Calls Gemini with a single canonical prompt and parses the JSON reply.
/// Cutoff decisions are NOT delegated to the model; the deterministic
/// evaluator owns those.
pub struct GeminiExtractor {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(model: Option<String>, api_key: String) -> Self {
        Self {
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn build_prompt(context: &MessageContext) -> String {
        let history: String = context
            .history
            .iter()
            .map(|turn| format!("{turn}\n"))
            .collect();

        let mut orders = String::new();
        for order in &context.recent_orders {
            orders.push_str(&format!(
                "- {}: {} ({}{})\n",
                order.date,
                order.meals(),
                order.total,
                if order.canceled { ", canceled" } else { "" },
            ));
        }
        if orders.is_empty() {
            orders.push_str("(none)\n");
        }

        format!(
            r#"You take meal orders for a shared kitchen over chat.
Meals available: breakfast, lunch, dinner. Orders are for a specific date.
Messages may be in English, Malayalam, or mixed language.

Determine what the user wants and respond with ONLY valid JSON, no markdown
fences, no extra text, in exactly one of these shapes:

New or updated order (include ONLY the meals the user mentioned):
{{"reply": "<short confirmation>", "counter": 1,
  "order": {{"breakfast": 1|0, "lunch": 1|0, "dinner": 1|0, "date": "YYYY-MM-DD"}}}}

Cancellation:
{{"reply": "<short confirmation>", "counter": 1, "action": "cancel", "date": "YYYY-MM-DD"}}

Unclear message or ambiguous date:
{{"reply": "<clarifying question>", "counter": 0}}

Rules:
- If the user names a date ("on Sep 8", "for today"), use it.
- "tomorrow" means the next calendar day after message_time; "today" means
  message_time's date.
- If you cannot tell which date is meant, ask instead of guessing.
- Do not judge whether an order is too late; that is handled elsewhere.
- Keep replies short and friendly.

Context:
- user_name: {user_name}
- user_id: {user_id}
- default candidate date: {default_date}
- message_time: {sent_at}
- previous orders:
{orders}
- conversation so far:
{history}
New message from {user_name} at {sent_at}:
{text}"#,
            user_name = context.user_name,
            user_id = context.user_handle,
            default_date = context.default_date,
            sent_at = context.sent_at,
            text = context.text,
        )
    }
}

#[async_trait]
impl IntentExtractor for GeminiExtractor {
    async fn extract(&self, context: &MessageContext) -> Result<Intent> {
        let prompt = Self::build_prompt(context);
        let body = ApiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let url = format!("{API_URL}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, text);
        }

        let api_resp: ApiResponse = resp.json().await?;
        let text: String = api_resp
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            bail!("Gemini API returned empty response");
        }

        Ok(parse_intent(&text))
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
