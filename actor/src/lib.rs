// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime
//!
//! Actors are isolated units of state that only talk through asynchronous messages. This crate
//! provides the runtime underneath:
//!
//! - a supervision tree rooted at `/user`, where every actor is created by its parent and
//!   reports its failures to it;
//! - one serialized execution queue per actor, handed out by a [`Dispatcher`];
//! - location-transparent [`ActorRef`] handles that stay valid across restarts and die with
//!   the actor;
//! - request/reply layered on top of one-way messages with [`ActorRef::ask`];
//! - graceful, tree-wide shutdown driven by poison pills.
//!
//! ```ignore
//! use actor::{Actor, ActorContext, ActorSystem, Error, Message};
//! use async_trait::async_trait;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Actor for Greeter {
//!     async fn receive(
//!         &mut self,
//!         ctx: &mut ActorContext<'_, Self>,
//!         msg: Message,
//!     ) -> Result<(), Error> {
//!         if let Some(name) = msg.downcast_ref::<String>() {
//!             ctx.reply(format!("Hello {}", name));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let system = ActorSystem::new("greetings");
//! let greeter = system.actor_of("greeter", || Greeter)?;
//! let answer = system.ask(&greeter, "Ada".to_owned()).await?;
//! system.shutdown();
//! system.wait().await;
//! ```
//!

mod actor;
mod actor_ref;
mod behavior;
mod cell;
mod config;
mod dispatcher;
mod error;
mod message;
mod path;
mod supervision;
mod system;

//
// Core Actor Types
//

/// The trait implemented by every actor: message handler, lifecycle hooks and supervision
/// policy.
pub use actor::Actor;

/// Handle to the runtime given to handlers and hooks.
pub use actor::ActorContext;

/// Stable, possibly dangling handle to an actor.
pub use actor_ref::ActorRef;

/// Named message handlers stacked on top of [`Actor::receive`].
pub use behavior::{Behavior, BehaviorStack};

//
// Messages
//

/// Message envelope, user and system payloads.
pub use message::{
    Answer, ErrorMessage, Message, Payload, ReplyAction, SystemMessage,
};

//
// Error Handling
//

/// Error type for all actor system operations.
pub use error::Error;

//
// Actor Addressing
//

/// Hierarchical path identifying actors within the system tree.
pub use path::ActorPath;

//
// Scheduling
//

/// Queue assignment policies and the execution queue they hand out.
pub use dispatcher::{
    DefaultDispatcher, Dispatcher, ExecutionQueue, ShareDispatcher, Task,
};

//
// System Management
//

/// Entry point: owns the root guardian, the dispatcher and the registry of live actors.
pub use system::{ActorSystem, GUARDIAN, WaitResult};

/// System configuration.
pub use config::{
    DEFAULT_SHARED_QUEUES, DEFAULT_SYSTEM_NAME, DispatcherConfig, SystemConfig,
};
