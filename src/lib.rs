//! Order-state engine for a conversational meal-ordering bot.
//!
//! Messages arrive as free text, an external model turns them into a
//! structured [`intent::Intent`], and the [`engine::Orchestrator`] resolves
//! the target date, gates the request against [`cutoff`] rules, and applies
//! an idempotent create/update/cancel against the [`store`].

pub mod consts;
pub mod cutoff;
pub mod desk;
pub mod engine;
pub mod intent;
pub mod order;
pub mod session;
pub mod store;
pub mod summary;
