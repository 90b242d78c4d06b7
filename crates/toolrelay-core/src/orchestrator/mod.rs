//! Conversation orchestration
//!
//! `ConversationOrchestrator` runs the model/tool loop for one message;
//! `ConversationHub` keeps per-thread history and sequences messages on the
//! same thread.

mod engine;
mod hub;

pub use engine::{
    ConversationOrchestrator, OrchestratorSettings, RunError, RunOutcome, EMPTY_REPLY,
    MODEL_FAILURE_REPLY, ROUND_LIMIT_REPLY,
};
pub use hub::ConversationHub;
