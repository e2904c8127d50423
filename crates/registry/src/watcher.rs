// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot reload for handler availability. Handlers themselves are compiled
//! Rust (loading arbitrary code at runtime would need `unsafe`, which this
//! workspace forbids); what's reloadable is a small per-handler JSON manifest
//! next to the binary that toggles `disabled` without a restart, the same
//! shape as the teacher's runbook-enable-list reload but scoped to handlers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::RegistryResult;
use crate::registry::Registry;

const DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Deserialize, Default)]
struct HandlerManifest {
    #[serde(default)]
    disabled: bool,
}

/// Owns the underlying OS watch handle; dropping it stops watching.
pub struct ReloadWatcher {
    _watcher: RecommendedWatcher,
}

impl ReloadWatcher {
    /// Watch `dir` non-recursively for `<handler-name>.json` manifests and
    /// apply debounced changes to `registry`.
    pub fn spawn(dir: PathBuf, registry: Registry) -> RegistryResult<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Err(err) => warn!(error = %err, "handler directory watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            let mut pending: HashSet<PathBuf> = HashSet::new();
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        match received {
                            Some(path) => {
                                pending.insert(path);
                            }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(DEBOUNCE), if !pending.is_empty() => {
                        for path in pending.drain() {
                            apply_change(&registry, &path);
                        }
                    }
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

fn apply_change(registry: &Registry, path: &Path) {
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return;
    }
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };

    if !path.exists() {
        // Manifest deleted: fall back to enabled rather than leave a
        // handler stuck disabled with no file left to re-enable it.
        if let Err(err) = registry.set_disabled(name, false) {
            warn!(handler = %name, error = %err, "manifest removed for unknown handler");
        }
        return;
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(handler = %name, error = %err, "failed to read handler manifest");
            return;
        }
    };
    let manifest: HandlerManifest = match serde_json::from_str(&raw) {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!(handler = %name, error = %err, "failed to parse handler manifest");
            return;
        }
    };
    match registry.set_disabled(name, manifest.disabled) {
        Ok(()) => info!(handler = %name, disabled = manifest.disabled, "handler manifest applied"),
        Err(err) => warn!(handler = %name, error = %err, "manifest references unknown handler"),
    }
}
