// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Configuration
//!

use crate::dispatcher::{DefaultDispatcher, Dispatcher, ShareDispatcher};

use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// Default name of an actor system.
pub const DEFAULT_SYSTEM_NAME: &str = "theater";

/// Default number of queues of a shared dispatcher.
pub const DEFAULT_SHARED_QUEUES: usize = 16;

/// Actor system configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Name of the system, used in logs.
    pub name: String,
    /// Queue assignment policy.
    pub dispatcher: DispatcherConfig,
}

impl SystemConfig {
    /// Configuration with the given name and the default dispatcher.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Sets the dispatcher policy.
    pub fn with_dispatcher(mut self, dispatcher: DispatcherConfig) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SYSTEM_NAME.to_owned(),
            dispatcher: DispatcherConfig::Default,
        }
    }
}

/// Dispatcher policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherConfig {
    /// One queue per actor.
    #[default]
    Default,
    /// A pool of `queues` queues shared by every actor.
    Share {
        #[serde(default = "default_shared_queues")]
        queues: usize,
    },
}

impl DispatcherConfig {
    /// Shared pool with the default size.
    pub fn share() -> Self {
        Self::Share {
            queues: DEFAULT_SHARED_QUEUES,
        }
    }

    /// Builds the dispatcher.
    pub fn build(&self) -> Arc<dyn Dispatcher> {
        match self {
            Self::Default => Arc::new(DefaultDispatcher::new()),
            Self::Share { queues } => Arc::new(ShareDispatcher::new(*queues)),
        }
    }
}

fn default_shared_queues() -> usize {
    DEFAULT_SHARED_QUEUES
}
