// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor references
//!
//! An [`ActorRef`] is the only way to talk to an actor. It stores the actor path and a weak
//! binding to the actor cell. The binding is shared by every clone and cleared when the actor
//! terminates, after which the reference is dead: it still accepts messages but drops them.
//!

use crate::{ActorPath, Message, cell::ActorCell, message::Answer};

use tracing::{debug, warn};

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock, Weak},
};

/// Binding shared between all clones of a reference.
type Binding = Arc<RwLock<Option<Weak<ActorCell>>>>;

/// Stable, possibly dangling handle to an actor mailbox.
///
/// Two references are equal when they are clones of the same handle, i.e. they were handed
/// out for the same actor incarnation. Restarting an actor keeps its reference.
///
#[derive(Clone)]
pub struct ActorRef {
    /// Actor path.
    path: ActorPath,
    /// Weak link to the cell. Never owns it.
    binding: Binding,
}

impl ActorRef {
    /// Creates an unbound (dead) reference.
    pub(crate) fn new(path: ActorPath) -> Self {
        Self {
            path,
            binding: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) fn bind(&self, cell: &Arc<ActorCell>) {
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::downgrade(cell));
    }

    /// Cuts the link to the cell. Every clone becomes dead.
    pub(crate) fn detach(&self) {
        *self.binding.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn cell(&self) -> Option<Arc<ActorCell>> {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Actor path.
    pub fn path(&self) -> ActorPath {
        self.path.clone()
    }

    /// Returns `true` while the reference is bound to a cell.
    pub fn is_alive(&self) -> bool {
        self.cell().is_some()
    }

    /// Sends a message. Never blocks and never fails: if the actor is gone the message is
    /// dropped with a warning.
    pub fn tell(&self, msg: Message) {
        if let Err(msg) = self.try_tell(msg) {
            warn!("Fail to deliver message {:?} to {}", msg, self);
        }
    }

    /// Sends a message, giving it back if the reference is dead.
    pub(crate) fn try_tell(&self, msg: Message) -> Result<(), Message> {
        match self.cell() {
            Some(cell) => {
                cell.tell(msg);
                Ok(())
            }
            None => Err(msg),
        }
    }

    /// Sends a poison pill, starting the graceful shutdown of the actor and its children.
    pub fn stop(&self) {
        debug!("Stopping actor {} from reference.", self.path);
        self.tell(Message::poison_pill(None));
    }

    /// Asks the actor. `reply` is called once with the value the handler of `msg` stored with
    /// [`crate::ActorContext::reply`], or `None` if it stored nothing.
    pub fn ask<F>(&self, msg: Message, reply: F)
    where
        F: FnOnce(Option<Answer>) + Send + Sync + 'static,
    {
        self.tell(Message::ask(msg, reply));
    }

    /// Looks up an actor by path. Absolute paths are resolved from the actor system root,
    /// relative ones (`.`, `..`, `name`) from this actor. Returns `None` if any segment is
    /// missing or if this reference is dead.
    pub fn actor_for(&self, path: &str) -> Option<ActorRef> {
        let cell = self.cell()?;
        if path.starts_with('/') {
            return cell.system()?.actor_for(path);
        }
        let segments: Vec<&str> = path.split('/').collect();
        self.actor_for_segments(&segments)
    }

    /// Walks the children maps segment by segment starting at this actor.
    pub fn actor_for_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Option<ActorRef> {
        let cell = self.cell()?;
        let Some((first, rest)) = segments.split_first() else {
            return Some(self.clone());
        };
        let next = match first.as_ref().trim() {
            "" | "." => self.clone(),
            ".." => cell.parent()?.clone(),
            name => cell.child(name)?,
        };
        next.actor_for_segments(rest)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.binding, &other.binding)
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Display for ActorRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ActorRef: {}>", self.path)
    }
}

impl Debug for ActorRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("path", &self.path)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_dead_ref_drops_messages() {
        let actor = ActorRef::new(ActorPath::from("/user/ghost"));
        assert!(!actor.is_alive());
        actor.tell(Message::new(1_u32));
        assert!(logs_contain("Fail to deliver message"));
        assert!(actor.actor_for("child").is_none());
        assert!(actor.actor_for("/user").is_none());
    }

    #[test]
    fn test_identity_is_shared_binding() {
        let actor = ActorRef::new(ActorPath::from("/user/a"));
        let clone = actor.clone();
        let other = ActorRef::new(ActorPath::from("/user/a"));
        assert_eq!(actor, clone);
        assert_ne!(actor, other);
        assert_eq!(actor.to_string(), "<ActorRef: /user/a>");
    }
}
