// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The row-shaped state snapshotted to disk: flows, webhooks, API keys, and
//! users. Jobs themselves are NOT here — they live in the broker's WAL
//! (`ff-broker`), which is the durability boundary for queue contents; this
//! state is the slower-moving configuration/metadata side of the system.

use std::collections::HashMap;

use ff_core::{ApiKey, ApiKeyId, Flow, FlowId, User, UserId, Webhook, WebhookId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub flows: HashMap<FlowId, Flow>,
    pub webhooks: HashMap<WebhookId, Webhook>,
    pub api_keys: HashMap<ApiKeyId, ApiKey>,
    pub users: HashMap<UserId, User>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }
}
