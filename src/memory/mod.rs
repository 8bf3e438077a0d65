//! Short-term conversation memory.
//!
//! Threads are keyed by `{owner or "global"}:{session}` and hold a bounded
//! trailing window of user/assistant message pairs. Appends are atomic per
//! pair so the window never holds a dangling half-exchange.

use crate::providers::ChatMessage;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct ConversationMemory {
    max_messages: usize,
    threads: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl ConversationMemory {
    /// `memory_turns` is the number of retained exchanges; each exchange is
    /// two messages.
    pub fn new(memory_turns: usize) -> Self {
        Self {
            max_messages: (memory_turns * 2).max(2),
            threads: Mutex::new(HashMap::new()),
        }
    }

    fn thread_key(owner: Option<&str>, session: &str) -> String {
        format!("{}:{}", owner.unwrap_or("global"), session)
    }

    /// Record one exchange. Empty session ids or empty texts are ignored.
    pub fn append(
        &self,
        owner: Option<&str>,
        session: &str,
        user_text: &str,
        assistant_text: &str,
    ) {
        if session.trim().is_empty() || user_text.is_empty() || assistant_text.is_empty() {
            return;
        }
        let key = Self::thread_key(owner, session);
        let mut guard = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        let thread = guard.entry(key).or_default();
        thread.push(ChatMessage::user(user_text));
        thread.push(ChatMessage::assistant(assistant_text));
        if thread.len() > self.max_messages {
            let excess = thread.len() - self.max_messages;
            thread.drain(..excess);
        }
    }

    /// Trailing window for a thread, oldest first.
    pub fn recent(&self, owner: Option<&str>, session: &str) -> Vec<ChatMessage> {
        let key = Self::thread_key(owner, session);
        let guard = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(&key).cloned().unwrap_or_default()
    }

    /// Drop a thread entirely.
    pub fn clear(&self, owner: Option<&str>, session: &str) {
        let key = Self::thread_key(owner, session);
        let mut guard = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&key);
    }
}

impl std::fmt::Debug for ConversationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMemory")
            .field("max_messages", &self.max_messages)
            .finish_non_exhaustive()
    }
}
