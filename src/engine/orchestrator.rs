//! Ties the pieces together: resolve the date, gate through the cutoff
//! rules, dispatch to the order desk, and record the exchange in the
//! session store. One message in, one terminal [`Outcome`] out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::warn;

use super::{Engine, InboundMessage, Outcome, dates};
use crate::consts::kitchen_tz;
use crate::cutoff::{self, Decision};
use crate::desk::{OrderDesk, OrderError};
use crate::intent::{Intent, IntentExtractor, MessageContext};
use crate::order::User;
use crate::session::{SessionKey, SessionStore, Turn};
use crate::store::OrderStore;

const APOLOGY: &str = "Sorry, something went wrong on our side. Please try again in a bit.";
const CLARIFY: &str = "Could you tell me which date and which meals you want?";

pub struct Orchestrator {
    extractor: Box<dyn IntentExtractor>,
    store: Arc<dyn OrderStore>,
    desk: OrderDesk,
    sessions: Arc<SessionStore>,
}

impl Orchestrator {
    pub fn new(
        extractor: Box<dyn IntentExtractor>,
        store: Arc<dyn OrderStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let desk = OrderDesk::new(Arc::clone(&store));
        Self {
            extractor,
            store,
            desk,
            sessions,
        }
    }

    /// Find the sender, creating them on first contact and refreshing a
    /// changed display name.
    async fn ensure_user(&self, handle: &str, name: Option<&str>) -> anyhow::Result<User> {
        match self.store.find_user(handle).await? {
            Some(mut user) => {
                if let Some(name) = name
                    && !name.is_empty()
                    && user.name != name
                {
                    self.store.update_user_name(user.id, name).await?;
                    user.name = name.to_string();
                }
                Ok(user)
            }
            None => self.store.create_user(handle, name.unwrap_or("Unknown")).await,
        }
    }

    /// Run the classified intent to a terminal state. Also reports which
    /// date the message ended up being about, for the session key.
    async fn dispatch(
        &self,
        user: &User,
        intent: Intent,
        text: &str,
        now: NaiveDateTime,
    ) -> (Outcome, Option<NaiveDate>) {
        let today = now.date();

        match intent {
            Intent::Clarify { reply } => (
                Outcome::NeedsClarification {
                    reply: reply_or(reply, || CLARIFY.to_string()),
                },
                None,
            ),

            Intent::Cancel { reply, date } => {
                let date = match dates::resolve(date.as_deref(), text, today) {
                    Ok(Some(date)) => date,
                    Ok(None) => {
                        return (
                            Outcome::NeedsClarification {
                                reply: "Which date's order should I cancel?".to_string(),
                            },
                            None,
                        );
                    }
                    Err(err) => return (invalid(err), None),
                };
                match self.desk.cancel(user, date).await {
                    Ok(Some(order)) => (
                        Outcome::Canceled {
                            reply: reply_or(reply, || format!("Order for {date} canceled.")),
                            order,
                        },
                        Some(date),
                    ),
                    Ok(None) => (
                        Outcome::NothingToCancel {
                            reply: format!("No active order found for {date}."),
                        },
                        Some(date),
                    ),
                    Err(err) => (failed(err), Some(date)),
                }
            }

            Intent::Order { reply, date, meals } => {
                let date = match dates::resolve(date.as_deref(), text, today) {
                    Ok(Some(date)) => date,
                    Ok(None) => {
                        return (
                            Outcome::NeedsClarification {
                                reply: "Which date is that order for?".to_string(),
                            },
                            None,
                        );
                    }
                    Err(err) => return (invalid(err), None),
                };

                if let Decision::Rejected { reason } = cutoff::evaluate_selection(&meals, date, now)
                {
                    return (
                        Outcome::Rejected {
                            reply: format!("Sorry, {reason}."),
                        },
                        Some(date),
                    );
                }

                match self.desk.upsert(user, date, &meals).await {
                    Ok(order) => {
                        let fallback = format!(
                            "Order for {date} saved: {} (total {}).",
                            order.meals(),
                            order.total
                        );
                        (
                            Outcome::Confirmed {
                                reply: reply_or(reply, || fallback),
                                order,
                            },
                            Some(date),
                        )
                    }
                    Err(err) => (failed(err), Some(date)),
                }
            }
        }
    }

    fn record(&self, handle: &str, date: NaiveDate, text: &str, reply: &str) {
        let key = SessionKey::new(handle, date);
        self.sessions.append(&key, Turn::user(text));
        self.sessions.append(&key, Turn::bot(reply));
    }
}

fn reply_or(reply: String, fallback: impl FnOnce() -> String) -> String {
    if reply.trim().is_empty() {
        fallback()
    } else {
        reply
    }
}

fn invalid(err: OrderError) -> Outcome {
    Outcome::Invalid {
        reply: format!("{err}. Use YYYY-MM-DD, or say today or tomorrow."),
    }
}

fn failed(err: OrderError) -> Outcome {
    match err {
        OrderError::Validation(_) => invalid(err),
        OrderError::Store(source) => {
            warn!(error = %format!("{source:#}"), "store operation failed");
            Outcome::Failed {
                reply: APOLOGY.to_string(),
            }
        }
    }
}

#[async_trait]
impl Engine for Orchestrator {
    async fn handle(&self, message: &InboundMessage) -> Outcome {
        let now = message.received_at.with_timezone(&kitchen_tz()).naive_local();
        // Candidate date when the user names none: tomorrow.
        let default_date = now.date() + Days::new(1);

        let user = match self
            .ensure_user(&message.handle, message.name.as_deref())
            .await
        {
            Ok(user) => user,
            Err(err) => {
                warn!(handle = %message.handle, error = %format!("{err:#}"), "user lookup failed");
                let outcome = Outcome::Failed {
                    reply: APOLOGY.to_string(),
                };
                self.record(&message.handle, default_date, &message.text, outcome.reply());
                return outcome;
            }
        };

        // Soft hints for the extractor; losing them only costs accuracy.
        let recent_orders = match self.store.orders_for_user(user.id).await {
            Ok(orders) => orders,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not load previous orders");
                Vec::new()
            }
        };
        let pre_key = SessionKey::new(&message.handle, default_date);
        self.sessions.touch(&pre_key);
        let history = self.sessions.history(&pre_key);

        let context = MessageContext {
            user_handle: user.handle.clone(),
            user_name: user.name.clone(),
            text: message.text.clone(),
            default_date,
            sent_at: now,
            history,
            recent_orders,
        };

        let (outcome, resolved) = match self.extractor.extract(&context).await {
            Ok(intent) => self.dispatch(&user, intent, &message.text, now).await,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "intent extraction failed");
                (
                    Outcome::Failed {
                        reply: APOLOGY.to_string(),
                    },
                    None,
                )
            }
        };

        // Both turns land in the session no matter how we terminated, so a
        // follow-up message has full context.
        let key_date = resolved.unwrap_or(default_date);
        self.record(&message.handle, key_date, &message.text, outcome.reply());

        outcome
    }
}
