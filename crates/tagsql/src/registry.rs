//! Named connection handles.
//!
//! The registry is an explicit object: create one at startup, register a
//! handle per named backend, and pass it to [`Query::new`](crate::Query::new).
//! Tests build their own registries, so nothing is shared between them.

use crate::client::Connection;
use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps backend names to live connection handles.
pub struct ConnectionRegistry<C> {
    handles: RwLock<HashMap<String, Arc<C>>>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
        }
    }
}

impl<C> std::fmt::Debug for ConnectionRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl<C> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `name`, returning the handle it replaced.
    pub fn register(&self, name: impl Into<String>, handle: C) -> Option<Arc<C>> {
        self.register_arc(name, Arc::new(handle))
    }

    /// Register an already shared handle under `name`.
    pub fn register_arc(&self, name: impl Into<String>, handle: Arc<C>) -> Option<Arc<C>> {
        let name = name.into();
        tracing::debug!(target: "tagsql.registry", name = %name, "registered connection");
        self.handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, handle)
    }

    /// Drop the registry's handle for `name`. Returns whether one existed.
    ///
    /// Builders already holding the handle keep it until they are dropped.
    pub fn close(&self, name: &str) -> bool {
        let removed = self
            .handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            tracing::debug!(target: "tagsql.registry", name, "closed connection");
        }
        removed
    }

    /// Drop every handle.
    pub fn close_all(&self) {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        for name in handles.keys() {
            tracing::debug!(target: "tagsql.registry", name = %name, "closed connection");
        }
        handles.clear();
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Live handle for `name`, or `None` when absent or closed.
    pub fn resolve(&self, name: &str) -> Option<Arc<C>> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }
}

impl ConnectionRegistry<tokio_postgres::Client> {
    /// Open a postgres connection and register it under `name`.
    ///
    /// The connection driver runs on a spawned tokio task, so this must be
    /// called from within a runtime.
    pub async fn connect(
        &self,
        name: impl Into<String>,
        url: &str,
    ) -> OrmResult<Arc<tokio_postgres::Client>> {
        let name = name.into();
        let (client, connection) = tokio_postgres::connect(url, tokio_postgres::NoTls)
            .await
            .map_err(|e| OrmError::Configuration(format!("connect `{name}`: {e}")))?;

        let task_name = name.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "tagsql.registry", name = %task_name, error = %e, "connection error");
            }
        });

        let client = Arc::new(client);
        self.register_arc(name, Arc::clone(&client));
        Ok(client)
    }
}
