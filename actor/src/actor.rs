// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the [`Actor`] trait, implemented by user types to receive
//! messages, and the [`ActorContext`] handed to every handler and lifecycle hook.
//!
//! Actors are always created through a parent, either with [`ActorContext::actor_of`] or
//! with [`crate::ActorSystem::actor_of`] for top-level actors. The runtime calls the hooks in
//! this order:
//!
//! 1. `pre_start`, as the first task of the new actor.
//! 2. `receive` (or the behavior on top of the stack) once per user message.
//! 3. `will_stop`, when the first poison pill arrives.
//! 4. `post_stop`, once every child has terminated.
//!
//! Handler failures, returned errors and panics alike, are reported to the parent, whose
//! [`Actor::supervisor_strategy`] decides what to do. By default the failing child is
//! restarted.
//!

use crate::{
    ActorPath, ActorRef, Error,
    behavior::{Behavior, BehaviorStack},
    cell::{ActorCell, constructor},
    message::{Answer, ErrorMessage, Message},
    system::ActorSystem,
};

use async_trait::async_trait;
use tracing::{debug, warn};

use std::{any::Any, sync::Arc, time::Duration};

/// The `Actor` trait is the main trait that actors must implement.
///
/// Every method has a default, so the smallest actor is an empty `impl`. Most actors override
/// [`Actor::receive`]:
///
/// ```ignore
/// use actor::{Actor, ActorContext, Error, Message};
/// use async_trait::async_trait;
///
/// struct Counter {
///     n: usize,
/// }
///
/// struct Increment;
///
/// #[async_trait]
/// impl Actor for Counter {
///     async fn receive(
///         &mut self,
///         _ctx: &mut ActorContext<'_, Self>,
///         msg: Message,
///     ) -> Result<(), Error> {
///         if msg.is::<Increment>() {
///             self.n += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
///
#[async_trait]
pub trait Actor: Send + Sized + 'static {
    /// Handles a user message while the behavior stack is empty.
    async fn receive(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
        msg: Message,
    ) -> Result<(), Error> {
        debug!("Actor {} did not handle message {:?}.", ctx.path(), msg);
        Ok(())
    }

    /// Runs before the first message. A failure is reported to the parent.
    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Runs when the actor receives its first poison pill, before the children are stopped.
    async fn will_stop(&mut self, _ctx: &mut ActorContext<'_, Self>) {}

    /// Runs once every child has terminated, right before the parent is notified.
    async fn post_stop(
        &mut self,
        _ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Runs when a child finished terminating.
    ///
    /// By then the child is already gone from [`ActorContext::children`], `child` is a dead
    /// reference and the registry no longer holds it. Its name is free, so a new child may be
    /// created under it from here.
    async fn child_terminated(
        &mut self,
        _ctx: &mut ActorContext<'_, Self>,
        _child: &ActorRef,
    ) {
    }

    /// Decides what to do with a failing child. Restarts it by default.
    async fn supervisor_strategy(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
        error: ErrorMessage,
    ) {
        warn!(
            "Actor {} restarting {} after failure: {}",
            ctx.path(),
            error.sender.path(),
            error.error
        );
        error.sender.restart();
    }
}

/// Handle to the runtime given to handlers and hooks.
pub struct ActorContext<'a, A> {
    cell: &'a Arc<ActorCell>,
    behaviors: &'a mut BehaviorStack<A>,
}

impl<'a, A> ActorContext<'a, A> {
    pub(crate) fn new(
        cell: &'a Arc<ActorCell>,
        behaviors: &'a mut BehaviorStack<A>,
    ) -> Self {
        Self { cell, behaviors }
    }

    /// Reference of the current actor.
    pub fn reference(&self) -> ActorRef {
        self.cell.reference()
    }

    /// Path of the current actor.
    pub fn path(&self) -> ActorPath {
        self.cell.path()
    }

    /// Reference of the supervisor. `None` for the root guardian.
    pub fn parent(&self) -> Option<ActorRef> {
        self.cell.parent().cloned()
    }

    /// Owning actor system, unless it was dropped.
    pub fn system(&self) -> Option<ActorSystem> {
        self.cell.system()
    }

    /// Creates a child actor.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Exists`] if a child with that name exists, with
    /// [`Error::Dying`] while this actor is stopping and with [`Error::InvalidName`] if the
    /// name is not a single path segment.
    ///
    pub fn actor_of<C, F>(&self, name: &str, factory: F) -> Result<ActorRef, Error>
    where
        C: Actor,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.cell.actor_of(name, constructor(factory))
    }

    /// Creates a child actor with a generated, unique name.
    pub fn actor_of_anonymous<C, F>(&self, factory: F) -> Result<ActorRef, Error>
    where
        C: Actor,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let system = self.cell.system().ok_or(Error::Terminated)?;
        self.cell
            .actor_of(&system.next_anonymous_name(), constructor(factory))
    }

    /// Looks an actor up synchronously. See [`ActorRef::actor_for`].
    pub fn actor_for(&self, path: &str) -> Option<ActorRef> {
        self.cell.reference().actor_for(path)
    }

    /// Looks an actor up by walking the tree with messages. `path` may be absolute or
    /// relative to this actor. `reply` runs on this actor's queue.
    pub fn select_actor<F>(&self, path: &str, reply: F)
    where
        F: FnOnce(Option<ActorRef>) + Send + Sync + 'static,
    {
        let path = self.path().resolve(path);
        match self.cell.system() {
            Some(system) => {
                system.select_path(path, Some(&self.cell.reference()), reply)
            }
            None => reply(None),
        }
    }

    /// Snapshot of the children.
    pub fn children(&self) -> Vec<ActorRef> {
        self.cell.children()
    }

    /// Child named `name`.
    pub fn child(&self, name: &str) -> Option<ActorRef> {
        self.cell.child(name)
    }

    /// Sends `payload` to `target` with this actor as sender.
    pub fn tell<T>(&self, target: &ActorRef, payload: T)
    where
        T: Any + Send + Sync,
    {
        target.tell(Message::new(payload).with_sender(self.reference()));
    }

    /// Asks `target` with this actor as sender. `reply` runs on this actor's queue.
    pub fn ask<T, F>(&self, target: &ActorRef, payload: T, reply: F)
    where
        T: Any + Send + Sync,
        F: FnOnce(Option<Answer>) + Send + Sync + 'static,
    {
        target.ask(Message::new(payload).with_sender(self.reference()), reply);
    }

    /// Stores the answer to the ask being handled. Outside of an ask the value is discarded
    /// before the next ask starts.
    pub fn reply<T>(&self, value: T)
    where
        T: Any + Send + Sync,
    {
        self.cell.set_reply(Box::new(value));
    }

    /// Stops this actor and its children.
    pub fn stop(&self) {
        self.cell.reference().stop();
    }

    /// Stops the whole actor system.
    pub fn escalate(&self) {
        self.cell.reference().escalate();
    }

    /// Delivers `payload` to this actor after `delay`. The timer can not be cancelled; if the
    /// actor is gone by then the message is dropped.
    pub fn schedule_once<T>(&self, delay: Duration, payload: T)
    where
        T: Any + Send + Sync,
    {
        let this = self.reference();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.tell(Message::new(payload));
        });
    }

    /// Switches to a new behavior named `name`. With `discard_old` the current behavior is
    /// replaced, otherwise the new one is pushed on top of it.
    pub fn become_state<F>(&mut self, name: &str, behavior: F, discard_old: bool)
    where
        F: Fn(&mut A, &mut ActorContext<'_, A>, Message) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    {
        let behavior: Behavior<A> = Arc::new(behavior);
        if discard_old {
            self.behaviors.replace_head(name, behavior);
        } else {
            self.behaviors.push(name, behavior);
        }
    }

    /// Returns to the previous behavior.
    pub fn unbecome(&mut self) {
        self.behaviors.pop();
    }

    /// Pops behaviors until `name` is active. Unknown names empty the stack.
    pub fn pop_to_state(&mut self, name: &str) {
        self.behaviors.pop_to(name);
    }

    /// Empties the stack, going back to [`Actor::receive`].
    pub fn pop_to_root(&mut self) {
        self.behaviors.clear();
    }

    /// Name of the active behavior, `None` while [`Actor::receive`] is active.
    pub fn current_state(&self) -> Option<String> {
        self.behaviors.head().map(|(name, _)| name.to_owned())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::ActorSystem;

    use tokio::sync::mpsc;

    struct Light;

    struct Toggle;

    #[derive(Debug, PartialEq)]
    struct State(Option<String>);

    fn on(
        _: &mut Light,
        ctx: &mut ActorContext<'_, Light>,
        msg: Message,
    ) -> Result<(), Error> {
        if msg.is::<Toggle>() {
            ctx.become_state("off", off, true);
        }
        ctx.reply(State(ctx.current_state()));
        Ok(())
    }

    fn off(
        _: &mut Light,
        ctx: &mut ActorContext<'_, Light>,
        msg: Message,
    ) -> Result<(), Error> {
        if msg.is::<Toggle>() {
            ctx.become_state("on", on, true);
        }
        ctx.reply(State(ctx.current_state()));
        Ok(())
    }

    #[async_trait]
    impl Actor for Light {
        async fn receive(
            &mut self,
            ctx: &mut ActorContext<'_, Self>,
            msg: Message,
        ) -> Result<(), Error> {
            if msg.is::<Toggle>() {
                ctx.become_state("on", on, false);
            }
            ctx.reply(State(ctx.current_state()));
            Ok(())
        }
    }

    async fn state(system: &ActorSystem, light: &ActorRef, msg: Toggle) -> State {
        let answer = system.ask(light, msg).await.unwrap().unwrap();
        *answer.downcast::<State>().unwrap()
    }

    #[tokio::test]
    async fn test_behavior_switching() {
        let system = ActorSystem::new("behaviors");
        let light = system.actor_of("light", || Light).unwrap();

        assert_eq!(state(&system, &light, Toggle).await, State(Some("on".to_owned())));
        assert_eq!(state(&system, &light, Toggle).await, State(Some("off".to_owned())));
        assert_eq!(state(&system, &light, Toggle).await, State(Some("on".to_owned())));
    }

    struct Timer {
        sender: mpsc::UnboundedSender<&'static str>,
    }

    #[async_trait]
    impl Actor for Timer {
        async fn pre_start(
            &mut self,
            ctx: &mut ActorContext<'_, Self>,
        ) -> Result<(), Error> {
            ctx.schedule_once(Duration::from_millis(20), "tick");
            Ok(())
        }

        async fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_, Self>,
            msg: Message,
        ) -> Result<(), Error> {
            if let Some(tick) = msg.downcast_ref::<&'static str>() {
                let _ = self.sender.send(tick);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_schedule_once() {
        let system = ActorSystem::new("timers");
        let (sender, mut receiver) = mpsc::unbounded_channel();
        system
            .actor_of("timer", move || Timer {
                sender: sender.clone(),
            })
            .unwrap();
        assert_eq!(receiver.recv().await, Some("tick"));
    }
}
