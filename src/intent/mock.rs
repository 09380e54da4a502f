//! Scripted extractors for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use super::{Intent, IntentExtractor, MessageContext};

/// Returns pre-defined intents in order, like a test script.
pub struct ScriptedExtractor {
    intents: Vec<Intent>,
    index: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(intents: Vec<Intent>) -> Self {
        Self {
            intents,
            index: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn extract(&self, _context: &MessageContext) -> Result<Intent> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.intents.get(i).cloned().ok_or_else(|| {
            anyhow::anyhow!("ScriptedExtractor: no more intents (called {} times)", i + 1)
        })
    }
}

/// Always fails, for exercising the upstream-failure path.
pub struct FailingExtractor;

#[async_trait]
impl IntentExtractor for FailingExtractor {
    async fn extract(&self, _context: &MessageContext) -> Result<Intent> {
        anyhow::bail!("model unavailable")
    }
}
