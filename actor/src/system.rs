// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` is responsible for
//! bootstrapping the root guardian at `/user`, creating top-level actors, resolving paths and
//! shutting everything down.
//!

use crate::{
    Actor, ActorPath, ActorRef, Error,
    cell::{ActorCell, constructor},
    config::SystemConfig,
    dispatcher::Dispatcher,
    message::{Answer, Message},
};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Name of the root guardian.
pub const GUARDIAN: &str = "user";

/// Outcome of [`ActorSystem::wait_for`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The system terminated.
    Completed,
    /// The timeout elapsed first.
    TimedOut,
}

/// Root guardian. Supervises top-level actors with the default strategy.
struct Guardian;

impl Actor for Guardian {}

/// State shared by every handle of a system.
pub(crate) struct SystemCore {
    /// System name.
    name: String,
    /// Queue assignment policy.
    dispatcher: Arc<dyn Dispatcher>,
    /// Live cells. The only owner of cells.
    actors: RwLock<HashMap<ActorPath, Arc<ActorCell>>>,
    /// Root guardian reference.
    root: ActorRef,
    /// Cancelled once, when the root terminates.
    token: CancellationToken,
    /// Counter for generated names.
    anonymous: AtomicUsize,
}

impl SystemCore {
    pub(crate) fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub(crate) fn register(&self, cell: Arc<ActorCell>) {
        let mut actors =
            self.actors.write().unwrap_or_else(PoisonError::into_inner);
        actors.insert(cell.path(), cell);
    }

    /// Removes `cell` from the registry, unless another cell took its path since. Returns the
    /// registry's handle so the caller decides where the cell is dropped.
    pub(crate) fn unregister(
        &self,
        cell: &Arc<ActorCell>,
    ) -> Option<Arc<ActorCell>> {
        let mut actors =
            self.actors.write().unwrap_or_else(PoisonError::into_inner);
        let path = cell.path();
        match actors.get(&path) {
            Some(current) if Arc::ptr_eq(current, cell) => actors.remove(&path),
            _ => None,
        }
    }

    pub(crate) fn signal_terminated(&self) {
        debug!("Actor system {} stopped.", self.name);
        self.token.cancel();
    }
}

/// Actor system handle. Clones share the same system.
///
/// The system must be created inside a tokio runtime and stays alive while a handle is held.
///
#[derive(Clone)]
pub struct ActorSystem {
    core: Arc<SystemCore>,
}

impl ActorSystem {
    /// Creates a system with the default configuration and the given name.
    pub fn new(name: &str) -> Self {
        Self::with_config(SystemConfig::new(name))
    }

    /// Creates a system from a configuration.
    pub fn with_config(config: SystemConfig) -> Self {
        Self::with_dispatcher(&config.name, config.dispatcher.build())
    }

    /// Creates a system using a custom dispatcher.
    pub fn with_dispatcher(name: &str, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let core = Arc::new_cyclic(|weak| {
            let root = ActorCell::new(
                ActorPath::from(GUARDIAN),
                None,
                weak.clone(),
                dispatcher.assign_queue(),
                constructor(|| Guardian),
            );
            let reference = root.reference();
            let mut actors = HashMap::new();
            actors.insert(root.path(), root);
            SystemCore {
                name: name.to_owned(),
                dispatcher,
                actors: RwLock::new(actors),
                root: reference,
                token: CancellationToken::new(),
                anonymous: AtomicUsize::new(0),
            }
        });
        if let Some(root) = core.root.cell() {
            root.start();
        }
        debug!("Actor system {} started.", name);
        Self { core }
    }

    pub(crate) fn from_core(core: Arc<SystemCore>) -> Self {
        Self { core }
    }

    /// System name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Root guardian reference.
    pub fn root(&self) -> ActorRef {
        self.core.root.clone()
    }

    /// Creates a top-level actor under `/user`.
    ///
    /// # Errors
    ///
    /// Same as [`crate::ActorContext::actor_of`], plus [`Error::Terminated`] once the system
    /// has shut down.
    ///
    pub fn actor_of<A, F>(&self, name: &str, factory: F) -> Result<ActorRef, Error>
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let root = self.core.root.cell().ok_or(Error::Terminated)?;
        root.actor_of(name, constructor(factory))
    }

    /// Creates a top-level actor with a generated name.
    pub fn actor_of_anonymous<A, F>(&self, factory: F) -> Result<ActorRef, Error>
    where
        A: Actor,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let root = self.core.root.cell().ok_or(Error::Terminated)?;
        root.actor_of(&self.next_anonymous_name(), constructor(factory))
    }

    pub(crate) fn next_anonymous_name(&self) -> String {
        format!("${}", self.core.anonymous.fetch_add(1, Ordering::Relaxed))
    }

    /// Looks up an actor by absolute path, walking the children maps from the root.
    pub fn actor_for(&self, path: &str) -> Option<ActorRef> {
        let path = ActorPath::from(path);
        let (first, rest) = path.segments().split_first()?;
        if first != GUARDIAN {
            return None;
        }
        self.core.root.actor_for_segments(rest)
    }

    /// Looks up an actor by sending a selection down the tree. `reply` runs on the queue of
    /// `requestor`, or in place when there is none.
    pub fn select_actor<F>(&self, path: &str, requestor: Option<&ActorRef>, reply: F)
    where
        F: FnOnce(Option<ActorRef>) + Send + Sync + 'static,
    {
        self.select_path(ActorPath::from(path), requestor, reply);
    }

    pub(crate) fn select_path<F>(
        &self,
        path: ActorPath,
        requestor: Option<&ActorRef>,
        reply: F,
    ) where
        F: FnOnce(Option<ActorRef>) + Send + Sync + 'static,
    {
        let select = Message::select(path, requestor.cloned(), reply);
        if let Err(select) = self.core.root.try_tell(select) {
            if let Some((_, reply)) = select.into_reply() {
                reply(None);
            }
        }
    }

    /// Asks `target` and waits for the answer. Meant for code running outside of actors;
    /// inside a handler use [`crate::ActorContext::ask`].
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `target` is dead, [`Error::Ask`] if it stops before answering.
    ///
    pub async fn ask<T>(
        &self,
        target: &ActorRef,
        payload: T,
    ) -> Result<Option<Answer>, Error>
    where
        T: Any + Send + Sync,
    {
        let (sender, receiver) = oneshot::channel();
        let ask = Message::ask(Message::new(payload), move |answer| {
            let _ = sender.send(answer);
        });
        target
            .try_tell(ask)
            .map_err(|_| Error::NotFound(target.path()))?;
        receiver.await.map_err(|e| Error::Ask(e.to_string()))
    }

    /// Starts the graceful shutdown of every actor.
    pub fn shutdown(&self) {
        if self.is_terminated() {
            debug!("Actor system {} is already stopped.", self.core.name);
            return;
        }
        debug!("Stopping actor system {}...", self.core.name);
        self.core.root.stop();
    }

    /// Waits until the root terminated.
    pub async fn wait(&self) {
        self.core.token.cancelled().await;
    }

    /// Waits until the root terminated or `timeout` elapses.
    pub async fn wait_for(&self, timeout: Duration) -> WaitResult {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(()) => WaitResult::Completed,
            Err(_) => WaitResult::TimedOut,
        }
    }

    /// Returns `true` once the root terminated.
    pub fn is_terminated(&self) -> bool {
        self.core.token.is_cancelled()
    }

    /// Paths of the live children of `path`.
    pub fn children(&self, path: &ActorPath) -> Vec<ActorPath> {
        let actors = self
            .core
            .actors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut children: Vec<ActorPath> = actors
            .keys()
            .filter(|actor| actor.is_child_of(path))
            .cloned()
            .collect();
        children.sort();
        children
    }

    /// Returns `true` while a cell is registered at `path`.
    pub fn is_registered(&self, path: &ActorPath) -> bool {
        self.core
            .actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    /// Number of live cells, the root included.
    pub fn len(&self) -> usize {
        self.core
            .actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
