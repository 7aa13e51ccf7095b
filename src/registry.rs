//! Connection registry
//!
//! The authoritative mapping of live connections to nicknames, plus its
//! inverse index. Owned by exactly one task (the `ChatServer` actor), so
//! every check-then-insert below runs as a single uninterrupted step.

use std::collections::HashMap;

use tracing::debug;

use crate::connection::Connection;
use crate::error::RegistryError;
use crate::types::{ClientId, Nickname};

/// Live connections keyed by id and by nickname
///
/// Invariants:
/// - `by_nickname` and `connections` describe the same set of entries
/// - a nickname maps to at most one live connection
/// - `order` lists every registered id once, in join order
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ClientId, Connection>,
    by_nickname: HashMap<Nickname, ClientId>,
    order: Vec<ClientId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its nickname
    ///
    /// Fails without touching any state if the nickname is taken. Adding an
    /// id that is already registered is treated the same way.
    pub fn add(&mut self, connection: Connection) -> Result<(), RegistryError> {
        if self.by_nickname.contains_key(&connection.nickname)
            || self.connections.contains_key(&connection.id)
        {
            return Err(RegistryError::DuplicateNickname(
                connection.nickname.to_string(),
            ));
        }

        let id = connection.id;
        self.by_nickname.insert(connection.nickname.clone(), id);
        self.order.push(id);
        self.connections.insert(id, connection);

        debug!("Registry size: {}", self.connections.len());
        Ok(())
    }

    /// Unregister a connection
    ///
    /// Idempotent: returns the nickname the first time, `None` afterwards.
    /// Dropping the returned entry's queue handle lets its writer finish.
    pub fn remove(&mut self, id: ClientId) -> Option<Nickname> {
        let connection = self.connections.remove(&id)?;
        self.by_nickname.remove(&connection.nickname);
        self.order.retain(|entry| *entry != id);

        debug!("Registry size: {}", self.connections.len());
        Some(connection.nickname)
    }

    /// Rebind a connection's nickname
    ///
    /// Returns the previous nickname. Renaming to the current name is a
    /// no-op success.
    pub fn rename(&mut self, id: ClientId, nickname: Nickname) -> Result<Nickname, RegistryError> {
        match self.by_nickname.get(&nickname) {
            Some(owner) if *owner == id => return Ok(nickname),
            Some(_) => return Err(RegistryError::DuplicateNickname(nickname.to_string())),
            None => {}
        }

        let Some(connection) = self.connections.get_mut(&id) else {
            return Err(RegistryError::NotRegistered(id));
        };

        let previous = connection.nickname.clone();
        connection.set_nickname(nickname.clone());
        self.by_nickname.remove(&previous);
        self.by_nickname.insert(nickname, id);
        Ok(previous)
    }

    pub fn get(&self, id: ClientId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn lookup_by_nickname(&self, nickname: &str) -> Option<&Connection> {
        // Raw input is looked up without validation; invalid names never match
        let nickname = Nickname::parse(nickname).ok()?;
        self.by_nickname
            .get(&nickname)
            .and_then(|id| self.connections.get(id))
    }

    /// Owned copy of every live connection, in join order
    ///
    /// The copy is detached from the registry, so later mutations cannot
    /// disturb a fan-out that is iterating over it.
    pub fn snapshot_for_broadcast(&self) -> Vec<Connection> {
        self.order
            .iter()
            .filter_map(|id| self.connections.get(id))
            .cloned()
            .collect()
    }

    /// Current nicknames, in join order
    pub fn nicknames(&self) -> Vec<Nickname> {
        self.order
            .iter()
            .filter_map(|id| self.connections.get(id))
            .map(|c| c.nickname.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
