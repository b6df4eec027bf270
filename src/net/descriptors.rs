//! Readiness interest declared to the event loop.

/// An OS-level descriptor the event loop can poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor(pub i32);

/// Descriptors to watch for readability and writability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptors {
    pub readables: Vec<Descriptor>,
    pub writables: Vec<Descriptor>,
}

impl Descriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.readables.is_empty() && self.writables.is_empty()
    }

    /// Append another set, preserving order.
    pub fn extend(&mut self, other: Descriptors) {
        self.readables.extend(other.readables);
        self.writables.extend(other.writables);
    }
}
