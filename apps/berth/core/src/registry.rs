use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SignalError;
use crate::listener::Listener;
use crate::resolver::Resolver;
use crate::sdp::Envelope;

/// What an id currently holds. One id, one mode, one entry.
enum Entry {
    /// A live listener awaiting its exactly-once claim.
    Handoff(Arc<Listener>),
    /// A stored envelope, readable any number of times.
    Stored(Envelope),
    /// A resolver awaiting its exactly-once invocation.
    Callback(Arc<dyn Resolver>),
}

/// Live entry counts per mode, for the debug stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub handoffs: usize,
    pub stored: usize,
    pub callbacks: usize,
}

/// The id-keyed engine shared by all three exchange modes.
///
/// A single coarse mutex guards the map; it is held only for the O(1) map
/// operation, never across a slot write/read or a resolver invocation, so a
/// slow counterpart on one id cannot starve unrelated ids.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh listener under `id`. Exactly-once: an occupied id
    /// (any mode) is rejected.
    pub fn add_listener(&self, id: &str) -> Result<Arc<Listener>, SignalError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Err(SignalError::ListenerExists);
        }
        let listener = Arc::new(Listener::new());
        entries.insert(id.to_string(), Entry::Handoff(Arc::clone(&listener)));
        Ok(listener)
    }

    /// Atomically removes and returns the listener for `id`.
    ///
    /// The remove-on-read is what guarantees a single claimant: of any
    /// number of concurrent callers, exactly one gets the listener and the
    /// rest see `ListenerNotFound`. Entries in other modes are left alone.
    pub fn claim_listener(&self, id: &str) -> Result<Arc<Listener>, SignalError> {
        let mut entries = self.entries.lock();
        if !matches!(entries.get(id), Some(Entry::Handoff(_))) {
            return Err(SignalError::ListenerNotFound);
        }
        match entries.remove(id) {
            Some(Entry::Handoff(listener)) => Ok(listener),
            _ => Err(SignalError::ListenerNotFound),
        }
    }

    /// Stores `envelope` under `id`, once. Never evicted by the core.
    pub fn add_descriptor(&self, id: &str, envelope: Envelope) -> Result<(), SignalError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Err(SignalError::DescriptorExists);
        }
        entries.insert(id.to_string(), Entry::Stored(envelope));
        Ok(())
    }

    /// Non-destructive lookup; repeatable reads.
    pub fn get_descriptor(&self, id: &str) -> Result<Envelope, SignalError> {
        let entries = self.entries.lock();
        match entries.get(id) {
            Some(Entry::Stored(envelope)) => Ok(envelope.clone()),
            _ => Err(SignalError::DescriptorNotFound),
        }
    }

    /// Registers a resolver under `id`, once.
    pub fn add_resolver(
        &self,
        id: &str,
        resolver: Arc<dyn Resolver>,
    ) -> Result<(), SignalError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Err(SignalError::ResolverExists);
        }
        entries.insert(id.to_string(), Entry::Callback(resolver));
        Ok(())
    }

    /// Atomically removes and returns the resolver for `id`, mirroring
    /// [`Registry::claim_listener`].
    pub fn take_resolver(&self, id: &str) -> Result<Arc<dyn Resolver>, SignalError> {
        let mut entries = self.entries.lock();
        if !matches!(entries.get(id), Some(Entry::Callback(_))) {
            return Err(SignalError::ResolverNotFound);
        }
        match entries.remove(id) {
            Some(Entry::Callback(resolver)) => Ok(resolver),
            _ => Err(SignalError::ResolverNotFound),
        }
    }

    pub fn snapshot(&self) -> RegistryStats {
        let entries = self.entries.lock();
        let mut stats = RegistryStats::default();
        for entry in entries.values() {
            match entry {
                Entry::Handoff(_) => stats.handoffs += 1,
                Entry::Stored(_) => stats.stored += 1,
                Entry::Callback(_) => stats.callbacks += 1,
            }
        }
        stats
    }
}
