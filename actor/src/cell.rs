// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor cells
//!
//! The `ActorCell` is the runtime container of an actor. It owns the actor instance, the
//! children map and the execution queue, and it runs the termination state machine:
//!
//! ```text
//! Created --pre_start--> Active --PoisonPill--> Dying --all children Terminated--> Terminated
//! ```
//!
//! Every message sent to an actor ends up in [`ActorCell::system_receive`], which runs on the
//! cell's execution queue. Since the queue never runs two tasks at once, a cell processes a
//! single message at a time and the actor instance is never touched concurrently.
//!
//! The children map and the dying flag are the only state shared with other cells. They sit
//! behind a lock owned by this cell, so creating children and handling their termination are
//! mutually exclusive.
//!

use crate::{
    Actor, ActorContext, ActorPath, ActorRef, Error,
    behavior::BehaviorStack,
    dispatcher::{ExecutionQueue, Task},
    message::{Answer, ErrorMessage, Message, Payload, ReplyAction, SystemMessage},
    system::{ActorSystem, SystemCore},
};

use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, MutexGuard, PoisonError, Weak},
};

/// Builds a fresh actor instance. Kept for the whole life of the cell so restarts can use it.
pub(crate) type Constructor = Arc<dyn Fn() -> Box<dyn ActorHost> + Send + Sync>;

/// Wraps a user factory into a type-erased constructor.
pub(crate) fn constructor<A, F>(factory: F) -> Constructor
where
    A: Actor,
    F: Fn() -> A + Send + Sync + 'static,
{
    Arc::new(move || {
        Box::new(Incarnation {
            actor: factory(),
            behaviors: BehaviorStack::new(),
        }) as Box<dyn ActorHost>
    })
}

/// Object-safe view of an actor instance as seen by its cell.
#[async_trait]
pub(crate) trait ActorHost: Send {
    async fn pre_start(&mut self, cell: &Arc<ActorCell>) -> Result<(), Error>;

    async fn receive(
        &mut self,
        cell: &Arc<ActorCell>,
        msg: Message,
    ) -> Result<(), Error>;

    async fn will_stop(&mut self, cell: &Arc<ActorCell>);

    async fn post_stop(&mut self, cell: &Arc<ActorCell>) -> Result<(), Error>;

    async fn child_terminated(&mut self, cell: &Arc<ActorCell>, child: &ActorRef);

    async fn supervisor_strategy(
        &mut self,
        cell: &Arc<ActorCell>,
        error: ErrorMessage,
    );
}

/// One actor instance together with its behavior stack. A restart replaces both.
struct Incarnation<A> {
    actor: A,
    behaviors: BehaviorStack<A>,
}

#[async_trait]
impl<A: Actor> ActorHost for Incarnation<A> {
    async fn pre_start(&mut self, cell: &Arc<ActorCell>) -> Result<(), Error> {
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        self.actor.pre_start(&mut ctx).await
    }

    async fn receive(
        &mut self,
        cell: &Arc<ActorCell>,
        msg: Message,
    ) -> Result<(), Error> {
        let head = self.behaviors.head().map(|(_, behavior)| behavior);
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        match head {
            Some(behavior) => behavior(&mut self.actor, &mut ctx, msg),
            None => self.actor.receive(&mut ctx, msg).await,
        }
    }

    async fn will_stop(&mut self, cell: &Arc<ActorCell>) {
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        self.actor.will_stop(&mut ctx).await
    }

    async fn post_stop(&mut self, cell: &Arc<ActorCell>) -> Result<(), Error> {
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        self.actor.post_stop(&mut ctx).await
    }

    async fn child_terminated(&mut self, cell: &Arc<ActorCell>, child: &ActorRef) {
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        self.actor.child_terminated(&mut ctx, child).await
    }

    async fn supervisor_strategy(
        &mut self,
        cell: &Arc<ActorCell>,
        error: ErrorMessage,
    ) {
        let mut ctx = ActorContext::new(cell, &mut self.behaviors);
        self.actor.supervisor_strategy(&mut ctx, error).await
    }
}

/// State shared with other cells.
#[derive(Default)]
struct CellState {
    children: HashMap<String, ActorRef>,
    dying: bool,
}

/// Runtime container of one actor.
pub(crate) struct ActorCell {
    /// Reference handed out for this cell.
    this: ActorRef,
    /// Supervisor. `None` for the root.
    parent: Option<ActorRef>,
    /// Owning system.
    system: Weak<SystemCore>,
    /// Factory of actor instances.
    constructor: Constructor,
    /// Current actor instance. Only locked from tasks running on `queue`.
    actor: Mutex<Box<dyn ActorHost>>,
    /// Serialized executor.
    queue: ExecutionQueue,
    /// Children and lifecycle flag.
    state: std::sync::Mutex<CellState>,
    /// Value captured by `ActorContext::reply` while handling an ask.
    reply: std::sync::Mutex<Option<Answer>>,
}

impl ActorCell {
    /// Creates a cell, builds its first actor instance and binds its reference.
    /// Nothing runs until [`ActorCell::start`] is called.
    pub(crate) fn new(
        path: ActorPath,
        parent: Option<ActorRef>,
        system: Weak<SystemCore>,
        queue: ExecutionQueue,
        constructor: Constructor,
    ) -> Arc<Self> {
        let this = ActorRef::new(path);
        let cell = Arc::new(Self {
            this: this.clone(),
            parent,
            system,
            actor: Mutex::new(constructor()),
            constructor,
            queue,
            state: std::sync::Mutex::new(CellState::default()),
            reply: std::sync::Mutex::new(None),
        });
        this.bind(&cell);
        cell
    }

    /// Schedules `pre_start` as the first task of the cell.
    pub(crate) fn start(self: &Arc<Self>) {
        let cell = self.clone();
        self.submit(
            async move {
                let result = {
                    let mut host = cell.actor.lock().await;
                    guarded(host.pre_start(&cell)).await
                };
                match result {
                    Ok(()) => debug!("Actor {} started.", cell.path()),
                    Err(e) => {
                        error!("Actor {} failed to start: {}", cell.path(), e);
                        cell.report_failure(Error::Start(e.to_string()));
                    }
                }
            }
            .boxed(),
        );
    }

    /// Creates a child actor named `name`.
    ///
    /// The child is inserted, registered and started while the children map is locked, so a
    /// concurrent poison pill or lookup always sees a started child.
    pub(crate) fn actor_of(
        self: &Arc<Self>,
        name: &str,
        constructor: Constructor,
    ) -> Result<ActorRef, Error> {
        validate_name(name)?;
        let system = self.system.upgrade().ok_or(Error::Terminated)?;
        let path = self.path() / name;

        let child = ActorCell::new(
            path.clone(),
            Some(self.this.clone()),
            self.system.clone(),
            system.dispatcher().assign_queue(),
            constructor,
        );
        let reference = child.reference();

        let mut state = self.state();
        if state.dying {
            return Err(Error::Dying(self.path()));
        }
        if state.children.contains_key(name) {
            return Err(Error::Exists(path));
        }
        state.children.insert(name.to_owned(), reference.clone());
        system.register(child.clone());
        child.start();
        drop(state);

        debug!("Actor {} created.", path);
        Ok(reference)
    }

    /// Enqueues a message. Returns immediately.
    pub(crate) fn tell(self: &Arc<Self>, msg: Message) {
        let cell = self.clone();
        if !self.submit(cell.system_receive(msg)) {
            warn!("Execution queue of {} is closed.", self.path());
        }
    }

    /// Dispatches one message. Must only run on the cell's queue.
    pub(crate) fn system_receive(
        self: Arc<Self>,
        msg: Message,
    ) -> BoxFuture<'static, ()> {
        async move {
            let (sender, payload) = msg.into_parts();
            match payload {
                Payload::System(SystemMessage::Error(error)) => {
                    self.handle_error(error, sender).await
                }
                Payload::System(SystemMessage::PoisonPill) => {
                    self.handle_poison_pill().await
                }
                Payload::System(SystemMessage::Terminated) => {
                    self.handle_terminated(sender).await
                }
                Payload::System(SystemMessage::Ask { message, reply }) => {
                    self.handle_ask(*message, reply).await
                }
                Payload::System(SystemMessage::Answer { answer, reply }) => {
                    reply(answer)
                }
                Payload::System(SystemMessage::Select { path, reply }) => {
                    self.handle_select(path, sender, reply)
                }
                payload @ Payload::User(_) => {
                    self.handle_user(Message::from_parts(sender, payload)).await
                }
            }
        }
        .boxed()
    }

    async fn handle_error(self: &Arc<Self>, error: Error, sender: Option<ActorRef>) {
        let Some(sender) = sender else {
            error!("Actor {} received an error without sender: {}", self.path(), error);
            return;
        };
        debug!("Actor {} supervising failure of {}: {}", self.path(), sender.path(), error);
        let result = {
            let mut host = self.actor.lock().await;
            guarded(async {
                host.supervisor_strategy(self, ErrorMessage { error, sender })
                    .await;
                Ok::<(), Error>(())
            })
            .await
        };
        if let Err(e) = result {
            error!("Supervisor strategy of {} failed: {}", self.path(), e);
        }
    }

    async fn handle_poison_pill(self: &Arc<Self>) {
        if self.is_dying() {
            warn!("Actor {} is already dying, ignoring poison pill.", self.path());
            return;
        }

        let result = {
            let mut host = self.actor.lock().await;
            guarded(async {
                host.will_stop(self).await;
                Ok::<(), Error>(())
            })
            .await
        };
        if let Err(e) = result {
            error!("Actor {} failed in will_stop: {}", self.path(), e);
        }

        let children: Vec<ActorRef> = {
            let mut state = self.state();
            state.dying = true;
            state.children.values().cloned().collect()
        };
        debug!("Actor {} is dying with {} children.", self.path(), children.len());

        if children.is_empty() {
            self.finish().await;
        } else {
            for child in children {
                child.tell(Message::poison_pill(Some(self.this.clone())));
            }
        }
    }

    async fn handle_terminated(self: &Arc<Self>, sender: Option<ActorRef>) {
        let Some(child) = sender else {
            warn!("Actor {} received Terminated without sender.", self.path());
            return;
        };

        // Map entry, binding and registry entry are released together, before the hook runs.
        let key = child.path().key();
        let (released, finish) = {
            let mut state = self.state();
            let released = match state.children.get(&key) {
                Some(current) if *current == child => {
                    state.children.remove(&key);
                    let cell = child.cell();
                    child.detach();
                    Some(cell.and_then(|cell| {
                        self.system
                            .upgrade()
                            .and_then(|system| system.unregister(&cell))
                    }))
                }
                _ => None,
            };
            (released, state.dying && state.children.is_empty())
        };
        if released.is_none() {
            debug!("Actor {} is not a child of {}.", child.path(), self.path());
            return;
        }
        drop(released);

        let result = {
            let mut host = self.actor.lock().await;
            guarded(async {
                host.child_terminated(self, &child).await;
                Ok::<(), Error>(())
            })
            .await
        };
        if let Err(e) = result {
            error!("Actor {} failed in child_terminated: {}", self.path(), e);
        }

        debug!("Actor {} terminated.", child.path());

        if finish {
            self.finish().await;
        }
    }

    async fn handle_ask(self: &Arc<Self>, message: Message, reply: ReplyAction) {
        let asker = message.sender().cloned();
        self.take_reply();
        self.clone().system_receive(message).await;
        let answer = self.take_reply();
        self.send_answer(asker, answer, reply);
    }

    fn handle_select(
        self: &Arc<Self>,
        path: ActorPath,
        sender: Option<ActorRef>,
        reply: ReplyAction,
    ) {
        let own = self.path();
        if path == own {
            return self.send_answer(sender, Some(Box::new(self.this.clone())), reply);
        }
        if !path.is_descendant_of(&own) {
            return self.send_answer(sender, None, reply);
        }

        let name = &path.segments()[own.level()];
        match self.child(name) {
            None => self.send_answer(sender, None, reply),
            Some(child) if path.level() == own.level() + 1 => {
                self.send_answer(sender, Some(Box::new(child)), reply)
            }
            Some(child) => {
                let select = Message::from_parts(
                    sender,
                    Payload::System(SystemMessage::Select { path, reply }),
                );
                if let Err(select) = child.try_tell(select) {
                    if let Some((sender, reply)) = select.into_reply() {
                        self.send_answer(sender, None, reply);
                    }
                }
            }
        }
    }

    async fn handle_user(self: &Arc<Self>, msg: Message) {
        if self.is_dying() {
            warn!("Actor {} is dying, dropping {:?}.", self.path(), msg);
            return;
        }
        let result = {
            let mut host = self.actor.lock().await;
            guarded(host.receive(self, msg)).await
        };
        if let Err(error) = result {
            warn!("Actor {} failed handling a message: {}", self.path(), error);
            self.report_failure(error);
        }
    }

    /// Runs `post_stop` and reports termination upward. The root signals the system instead.
    async fn finish(self: &Arc<Self>) {
        let result = {
            let mut host = self.actor.lock().await;
            guarded(host.post_stop(self)).await
        };
        if let Err(e) = result {
            error!("Actor {} failed in post_stop: {}", self.path(), e);
        }

        match &self.parent {
            Some(parent) => parent.tell(Message::terminated(self.this.clone())),
            None => {
                debug!("Root actor {} terminated.", self.path());
                self.this.detach();
                if let Some(system) = self.system.upgrade() {
                    system.unregister(self);
                    system.signal_terminated();
                }
            }
        }
    }

    /// Forwards a handler failure to the supervisor.
    fn report_failure(&self, error: Error) {
        match &self.parent {
            Some(parent) => parent.tell(Message::error(error, self.this.clone())),
            None => error!("Unsupervised failure in {}: {}", self.path(), error),
        }
    }

    /// Delivers an answer through the asker's queue, or runs the reply in place when there
    /// is no asker.
    fn send_answer(
        &self,
        asker: Option<ActorRef>,
        answer: Option<Answer>,
        reply: ReplyAction,
    ) {
        match asker {
            Some(asker) => {
                asker.tell(Message::answer(self.this.clone(), answer, reply))
            }
            None => reply(answer),
        }
    }

    /// Replaces the actor instance with a fresh one, ordered after the queued messages.
    pub(crate) fn restart(self: &Arc<Self>) {
        let cell = self.clone();
        self.submit(
            async move {
                let mut host = cell.actor.lock().await;
                *host = (cell.constructor)();
                debug!("Actor {} restarted.", cell.path());
            }
            .boxed(),
        );
    }

    fn submit(&self, task: Task) -> bool {
        self.queue.submit(task)
    }

    fn state(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_reply(&self, answer: Answer) {
        *self.reply.lock().unwrap_or_else(PoisonError::into_inner) = Some(answer);
    }

    fn take_reply(&self) -> Option<Answer> {
        self.reply.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Snapshot of the children.
    pub(crate) fn children(&self) -> Vec<ActorRef> {
        self.state().children.values().cloned().collect()
    }

    pub(crate) fn child(&self, name: &str) -> Option<ActorRef> {
        self.state().children.get(name).cloned()
    }

    pub(crate) fn is_dying(&self) -> bool {
        self.state().dying
    }

    pub(crate) fn reference(&self) -> ActorRef {
        self.this.clone()
    }

    pub(crate) fn path(&self) -> ActorPath {
        self.this.path()
    }

    pub(crate) fn parent(&self) -> Option<&ActorRef> {
        self.parent.as_ref()
    }

    pub(crate) fn system(&self) -> Option<ActorSystem> {
        self.system.upgrade().map(ActorSystem::from_core)
    }
}

/// Child names are single path segments.
fn validate_name(name: &str) -> Result<(), Error> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains('/')
        || name == "."
        || name == ".."
    {
        Err(Error::InvalidName(name.to_owned()))
    } else {
        Ok(())
    }
}

/// Runs a handler future, turning a panic into [`Error::Panic`].
async fn guarded<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Panic(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("counter").is_ok());
        assert!(validate_name("$1").is_ok());
        assert_eq!(validate_name(""), Err(Error::InvalidName(String::new())));
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(" padded").is_err());
    }

    #[tokio::test]
    async fn test_guarded_catches_panics() {
        let result: Result<(), Error> = guarded(async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), Error>(())
        })
        .await;
        assert_eq!(result, Err(Error::Panic("kaboom".to_owned())));

        let result = guarded(async { Err::<(), _>(Error::Stop) }).await;
        assert_eq!(result, Err(Error::Stop));

        let code = 3;
        let result: Result<(), Error> = guarded(async move {
            if code > 0 {
                panic!("code {}", code);
            }
            Ok::<(), Error>(())
        })
        .await;
        assert_eq!(result, Err(Error::Panic("code 3".to_owned())));
    }
}
