// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A copy-on-write handler table: readers are the hot path (every dispatched
//! job resolves a handler) and never take a lock across an `.await`, while
//! writers (initial load, hot reload) are rare and pay the cost of building a
//! whole new map.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{Handler, HandlerMeta};

#[derive(Clone)]
struct Entry {
    handler: Arc<dyn Handler>,
    disabled: bool,
    source: Option<PathBuf>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Entry>,
}

/// Thread-safe, hot-reloadable handler table.
///
/// Cloning a `Registry` is cheap (it's a handle over the same `Arc<RwLock<_>>`
/// state); pass it by value into workers the way the teacher passes its
/// `Arc<RunbookRegistry>` into the executor pool.
#[derive(Clone, Default)]
pub struct Registry {
    table: Arc<RwLock<Table>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a handler. Replacing an existing handler clears
    /// any prior `disabled` flag, matching "a fresh load re-enables".
    pub fn register(&self, handler: Arc<dyn Handler>) {
        self.register_from(handler, None);
    }

    pub fn register_from(&self, handler: Arc<dyn Handler>, source: Option<PathBuf>) {
        let name = handler.name().to_string();
        let mut table = self.table.write();
        table.entries.insert(
            name,
            Entry {
                handler,
                disabled: false,
                source,
            },
        );
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.table.write().entries.remove(name).is_some()
    }

    /// Remove every handler whose `source` matches `path`; used when the
    /// watcher sees a file deleted.
    pub fn unregister_by_source(&self, path: &PathBuf) -> Vec<String> {
        let mut table = self.table.write();
        let removed: Vec<String> = table
            .entries
            .iter()
            .filter(|(_, entry)| entry.source.as_ref() == Some(path))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &removed {
            table.entries.remove(name);
        }
        removed
    }

    pub fn set_disabled(&self, name: &str, disabled: bool) -> RegistryResult<()> {
        let mut table = self.table.write();
        match table.entries.get_mut(name) {
            Some(entry) => {
                entry.disabled = disabled;
                Ok(())
            }
            None => Err(RegistryError::HandlerNotFound {
                job_type: name.to_string(),
            }),
        }
    }

    /// Resolve a handler for dispatch; returns an error if missing or
    /// explicitly disabled, so callers can fail the job rather than panic.
    pub fn resolve(&self, name: &str) -> RegistryResult<Arc<dyn Handler>> {
        let table = self.table.read();
        let entry = table.entries.get(name).ok_or_else(|| RegistryError::HandlerNotFound {
            job_type: name.to_string(),
        })?;
        if entry.disabled {
            return Err(RegistryError::HandlerDisabled {
                job_type: name.to_string(),
            });
        }
        Ok(entry.handler.clone())
    }

    pub fn list(&self) -> Vec<(String, HandlerMeta, bool)> {
        self.table
            .read()
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.handler.meta(), entry.disabled))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ff_core::{JobContext, JobRecord};

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            job: &JobRecord,
            _ctx: &dyn JobContext,
        ) -> Result<serde_json::Value, String> {
            Ok(job.payload.clone())
        }
    }

    #[test]
    fn register_then_resolve_succeeds() {
        let registry = Registry::new();
        registry.register(Arc::new(Echo));
        assert!(registry.resolve("echo").is_ok());
    }

    #[test]
    fn resolve_missing_handler_errors() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolve("ghost"),
            Err(RegistryError::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn disabled_handler_is_rejected() {
        let registry = Registry::new();
        registry.register(Arc::new(Echo));
        registry.set_disabled("echo", true).unwrap();
        assert!(matches!(
            registry.resolve("echo"),
            Err(RegistryError::HandlerDisabled { .. })
        ));
    }

    #[test]
    fn unregister_by_source_removes_matching_entries() {
        let registry = Registry::new();
        let path = PathBuf::from("/handlers/echo.so");
        registry.register_from(Arc::new(Echo), Some(path.clone()));
        let removed = registry.unregister_by_source(&path);
        assert_eq!(removed, vec!["echo".to_string()]);
        assert!(registry.is_empty());
    }
}
