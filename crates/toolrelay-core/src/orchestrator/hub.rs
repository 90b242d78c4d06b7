//! Per-thread conversation state
//!
//! Each thread id maps to its own history behind an async mutex. A message
//! holds its thread's lock for the whole run, so messages on one thread are
//! answered strictly in order while different threads run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logging::SharedLogger;
use crate::types::ConversationTurn;
use super::engine::{ConversationOrchestrator, RunOutcome};

type History = Arc<tokio::sync::Mutex<Vec<ConversationTurn>>>;

/// In-memory map of thread id to conversation history
pub struct ConversationHub {
    orchestrator: Arc<ConversationOrchestrator>,
    threads: Mutex<HashMap<String, History>>,
    logger: SharedLogger,
}

impl ConversationHub {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, logger: SharedLogger) -> Self {
        Self {
            orchestrator,
            threads: Mutex::new(HashMap::new()),
            logger,
        }
    }

    fn thread(&self, thread: &str) -> History {
        self.threads
            .lock()
            .entry(thread.to_string())
            .or_default()
            .clone()
    }

    fn is_current(&self, thread: &str, history: &History) -> bool {
        self.threads
            .lock()
            .get(thread)
            .is_some_and(|current| Arc::ptr_eq(current, history))
    }

    /// Answer `text` on `thread`, returning the answer
    pub async fn handle_message(&self, thread: &str, text: &str) -> String {
        self.handle_message_outcome(thread, text).await.text
    }

    /// Answer `text` on `thread`, returning the full run outcome.
    ///
    /// The thread's history only changes once the run has finished: the user
    /// turn and every turn of the run are appended together.
    pub async fn handle_message_outcome(&self, thread: &str, text: &str) -> RunOutcome {
        // A thread cleared while we waited is replaced by a fresh one
        let mut history = loop {
            let handle = self.thread(thread);
            let guard = handle.clone().lock_owned().await;
            if self.is_current(thread, &handle) {
                break guard;
            }
        };

        self.logger.debug(&format!(
            "[ConversationHub] Thread '{}': message with {} prior turns",
            thread,
            history.len()
        ));

        let user = ConversationTurn::user(text);
        let mut working = history.clone();
        working.push(user.clone());

        let outcome = self.orchestrator.run(&working).await;

        history.push(user);
        history.extend(outcome.turns.iter().cloned());
        outcome
    }

    /// Snapshot of a thread's history; empty for unknown threads
    pub async fn history(&self, thread: &str) -> Vec<ConversationTurn> {
        let existing = self.threads.lock().get(thread).cloned();
        match existing {
            Some(history) => history.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Forget a thread, waiting for any run on it to finish first
    pub async fn clear(&self, thread: &str) {
        let existing = self.threads.lock().get(thread).cloned();
        if let Some(history) = existing {
            let mut turns = history.lock().await;
            turns.clear();
            let mut threads = self.threads.lock();
            if threads.get(thread).is_some_and(|current| Arc::ptr_eq(current, &history)) {
                threads.remove(thread);
            }
        }
    }

    /// Threads with history
    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.threads.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
