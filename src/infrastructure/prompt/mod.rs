//! Prompt hub implementations

mod in_memory;

pub use in_memory::InMemoryPromptHub;
