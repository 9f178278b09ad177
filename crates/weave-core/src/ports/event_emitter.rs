//! Event emitter trait for lifecycle event broadcasting.
//!
//! Implementations handle transport details (channels, UI bridges, logs).

use crate::events::McpEvent;

/// Trait for emitting tool server lifecycle events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and CLI contexts that don't need events
/// - Host-specific implementations (channels, UI event bridges, etc.)
pub trait McpEventEmitter: Send + Sync {
    /// Emit an event. Must not block.
    fn emit(&self, event: McpEvent);
}

/// A no-op event emitter for tests and CLI contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl McpEventEmitter for NoopEmitter {
    fn emit(&self, _event: McpEvent) {
        // Intentionally do nothing
    }
}
