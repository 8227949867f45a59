//! Conversation history keyed by session id

mod history;

pub use history::SessionHistoryStore;
