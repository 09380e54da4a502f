//! The outermost boundary. `main.rs` only knows the [`Engine`] trait.

pub mod dates;
pub mod orchestrator;

pub use orchestrator::Orchestrator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::order::Order;

/// One message as it arrives from the messaging gateway.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Opaque messaging handle identifying the sender.
    pub handle: String,
    /// Display name, if the gateway knows it.
    pub name: Option<String>,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Terminal state of handling one message. Every variant carries the reply
/// to send back; a message is never left unanswered.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Order created or updated.
    Confirmed { reply: String, order: Order },
    /// Active order marked canceled.
    Canceled { reply: String, order: Order },
    /// Nothing to cancel. Informational, not a failure.
    NothingToCancel { reply: String },
    /// A requested meal is past its cutoff. No mutation.
    Rejected { reply: String },
    /// Ambiguous intent or date. No mutation.
    NeedsClarification { reply: String },
    /// Malformed request fields (bad date). No mutation.
    Invalid { reply: String },
    /// Extractor or store failed. No mutation, no retry.
    Failed { reply: String },
}

impl Outcome {
    pub fn reply(&self) -> &str {
        match self {
            Outcome::Confirmed { reply, .. }
            | Outcome::Canceled { reply, .. }
            | Outcome::NothingToCancel { reply }
            | Outcome::Rejected { reply }
            | Outcome::NeedsClarification { reply }
            | Outcome::Invalid { reply }
            | Outcome::Failed { reply } => reply,
        }
    }
}

/// Handles one inbound message end to end. All terminal states are values;
/// `handle` itself never fails.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn handle(&self, message: &InboundMessage) -> Outcome;
}
