//! Ordered listener lists and event channels

use std::fmt;

/// Handle returned by [`Broadcaster::listen`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of listeners addressable by handle
#[derive(Clone)]
pub struct Broadcaster<L> {
    listeners: Vec<(ListenerId, L)>,
    next_id: u64,
}

impl<L> Broadcaster<L> {
    /// Create an empty broadcaster
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a listener
    pub fn listen(&mut self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener; returns false if the handle is unknown
    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Drop every listener
    pub fn kill(&mut self) {
        self.listeners.clear();
    }

    /// Listeners in registration order
    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.listeners.iter().map(|(_, l)| l)
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if there are no listeners
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<L> Default for Broadcaster<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> fmt::Debug for Broadcaster<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// An event followed by each of its `:`-delimited prefixes, longest first
///
/// `attr:name:changed` yields `attr:name:changed`, `attr:name`, `attr`.
pub fn channel_chain(event: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(event);
    std::iter::from_fn(move || {
        let current = next?;
        next = current.rfind(':').map(|idx| &current[..idx]);
        Some(current)
    })
}

/// Check a listener event name: non-empty and free of whitespace
pub(crate) fn is_valid_event_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
