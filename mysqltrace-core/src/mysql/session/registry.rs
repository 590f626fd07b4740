//! Registry of in-flight connections.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::{ConnectionBuilder, SessionConfig};
use crate::mysql::packet::Timestamp;
use crate::stream::{ConnectionAddress, Direction};

struct Entry {
    /// Order in which the connection was first seen.
    ordinal: u64,
    builder: Arc<Mutex<ConnectionBuilder>>,
}

/// Thread-safe map from connection address to its builder.
///
/// The map lock is only held to look up or remove entries; bytes are
/// appended under the per-connection lock.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: Mutex<HashMap<ConnectionAddress, Entry>>,
    /// Connections closed in both directions, waiting for `take_completed`.
    completed: Mutex<Vec<ConnectionAddress>>,
    next_ordinal: Mutex<u64>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
            next_ordinal: Mutex::new(0),
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Number of connections currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    fn builder_for(&self, address: &ConnectionAddress) -> Arc<Mutex<ConnectionBuilder>> {
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions.get(address) {
            return Arc::clone(&entry.builder);
        }

        let ordinal = {
            let mut next = self.next_ordinal.lock();
            let ordinal = *next;
            *next += 1;
            ordinal
        };
        debug!(%address, ordinal, "new connection");
        let builder = Arc::new(Mutex::new(ConnectionBuilder::new(
            address.clone(),
            self.config,
        )));
        sessions.insert(
            address.clone(),
            Entry {
                ordinal,
                builder: Arc::clone(&builder),
            },
        );
        builder
    }

    /// Append reassembled bytes to a connection, creating it if needed.
    pub fn deliver(
        &self,
        address: &ConnectionAddress,
        direction: Direction,
        seen: Timestamp,
        data: impl Into<Bytes>,
    ) {
        let builder = self.builder_for(address);
        builder.lock().deliver(direction, seen, data);
    }

    /// Mark one direction of a connection as finished.
    pub fn close(&self, address: &ConnectionAddress, direction: Direction) {
        let builder = self
            .sessions
            .lock()
            .get(address)
            .map(|entry| Arc::clone(&entry.builder));
        let Some(builder) = builder else {
            return;
        };

        let complete = {
            let mut builder = builder.lock();
            builder.mark_complete(direction);
            builder.is_complete()
        };
        if complete {
            let mut completed = self.completed.lock();
            if !completed.contains(address) {
                completed.push(address.clone());
            }
        }
    }

    /// Remove and return connections whose both directions are closed, in
    /// the order they were first seen.
    pub fn take_completed(&self) -> Vec<ConnectionBuilder> {
        let done = std::mem::take(&mut *self.completed.lock());
        if done.is_empty() {
            return Vec::new();
        }

        let mut entries: Vec<Entry> = {
            let mut sessions = self.sessions.lock();
            done.iter()
                .filter_map(|address| sessions.remove(address))
                .collect()
        };

        entries.sort_by_key(|entry| entry.ordinal);
        entries.into_iter().map(unwrap_builder).collect()
    }

    /// Remove and return every remaining connection, closed or not.
    pub fn finish(&self) -> Vec<ConnectionBuilder> {
        self.completed.lock().clear();
        let mut entries: Vec<Entry> = self.sessions.lock().drain().map(|(_, e)| e).collect();
        entries.sort_by_key(|entry| entry.ordinal);
        entries
            .into_iter()
            .map(|entry| {
                let mut builder = unwrap_builder(entry);
                builder.mark_complete(Direction::ToServer);
                builder.mark_complete(Direction::ToClient);
                builder
            })
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn unwrap_builder(entry: Entry) -> ConnectionBuilder {
    match Arc::try_unwrap(entry.builder) {
        Ok(mutex) => mutex.into_inner(),
        Err(shared) => shared.lock().clone(),
    }
}
