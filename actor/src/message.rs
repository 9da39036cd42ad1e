// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Messages
//!
//! Actors only interact through [`Message`] values. A message is an immutable pair of an
//! optional sender and a payload. The payload is either a user value of any type or one of the
//! closed set of system messages the runtime uses to drive lifecycle, supervision, the ask
//! pattern and path selection.
//!

use crate::{ActorPath, ActorRef, Error};

use std::any::Any;
use std::fmt::{Debug, Formatter};

/// Value produced by an asked actor.
pub type Answer = Box<dyn Any + Send + Sync>;

/// Callback run with the answer of an ask or a selection. It runs exactly once, on the queue of
/// the asker when there is one.
pub type ReplyAction = Box<dyn FnOnce(Option<Answer>) + Send + Sync>;

/// Message exchanged between actors.
pub struct Message {
    /// The actor that sent this message, if any. Receivers use it to reply.
    sender: Option<ActorRef>,
    /// The content.
    payload: Payload,
}

/// Message content.
pub enum Payload {
    /// Application message.
    User(Box<dyn Any + Send + Sync>),
    /// Runtime control message.
    System(SystemMessage),
}

/// Control messages handled by the runtime itself.
pub enum SystemMessage {
    /// Starts the graceful shutdown of the receiver and its subtree.
    PoisonPill,
    /// A child notifies its parent that it finished terminating. The sender is the child.
    Terminated,
    /// A child reports a handler failure to its parent. The sender is the failing child.
    Error(Error),
    /// Wraps a message whose handler may capture a reply value.
    Ask {
        message: Box<Message>,
        reply: ReplyAction,
    },
    /// Carries the captured reply back to the asker.
    Answer {
        answer: Option<Answer>,
        reply: ReplyAction,
    },
    /// Asynchronous lookup of an actor by absolute path.
    Select { path: ActorPath, reply: ReplyAction },
}

/// Failure report handed to [`crate::Actor::supervisor_strategy`].
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    /// What went wrong.
    pub error: Error,
    /// The child whose handler failed.
    pub sender: ActorRef,
}

impl Message {
    /// Creates a user message without sender.
    pub fn new<T>(payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            sender: None,
            payload: Payload::User(Box::new(payload)),
        }
    }

    /// Sets the sender of the message.
    pub fn with_sender(mut self, sender: ActorRef) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Creates a poison pill.
    pub fn poison_pill(sender: Option<ActorRef>) -> Self {
        Self::system(SystemMessage::PoisonPill, sender)
    }

    /// Wraps `message` in an ask. Once the receiver has handled the wrapped message, `reply`
    /// is called with whatever the handler stored through
    /// [`crate::ActorContext::reply`]. The answer travels back to the sender of `message`;
    /// without a sender the reply runs on the receiver's queue.
    pub fn ask<F>(message: Message, reply: F) -> Self
    where
        F: FnOnce(Option<Answer>) + Send + Sync + 'static,
    {
        let sender = message.sender.clone();
        Self::system(
            SystemMessage::Ask {
                message: Box::new(message),
                reply: Box::new(reply),
            },
            sender,
        )
    }

    /// Creates a selection request for `path`. `reply` receives the matching reference or
    /// `None`.
    pub fn select<F>(path: ActorPath, sender: Option<ActorRef>, reply: F) -> Self
    where
        F: FnOnce(Option<ActorRef>) + Send + Sync + 'static,
    {
        let reply: ReplyAction = Box::new(move |answer: Option<Answer>| {
            reply(
                answer
                    .and_then(|answer| answer.downcast::<ActorRef>().ok())
                    .map(|actor| *actor),
            )
        });
        Self::system(SystemMessage::Select { path, reply }, sender)
    }

    pub(crate) fn terminated(sender: ActorRef) -> Self {
        Self::system(SystemMessage::Terminated, Some(sender))
    }

    pub(crate) fn error(error: Error, sender: ActorRef) -> Self {
        Self::system(SystemMessage::Error(error), Some(sender))
    }

    pub(crate) fn answer(
        sender: ActorRef,
        answer: Option<Answer>,
        reply: ReplyAction,
    ) -> Self {
        Self::system(SystemMessage::Answer { answer, reply }, Some(sender))
    }

    pub(crate) fn system(
        message: SystemMessage,
        sender: Option<ActorRef>,
    ) -> Self {
        Self {
            sender,
            payload: Payload::System(message),
        }
    }

    /// The sender, if any.
    pub fn sender(&self) -> Option<&ActorRef> {
        self.sender.as_ref()
    }

    /// The content of the message.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns `true` for runtime control messages.
    pub fn is_system(&self) -> bool {
        matches!(self.payload, Payload::System(_))
    }

    /// Returns `true` if this is a user message carrying a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Borrows the user payload as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::User(payload) => payload.downcast_ref::<T>(),
            Payload::System(_) => None,
        }
    }

    /// Takes the user payload out as a `T`, giving the message back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Message> {
        match self.payload {
            Payload::User(payload) => match payload.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(payload) => Err(Message {
                    sender: self.sender,
                    payload: Payload::User(payload),
                }),
            },
            payload => Err(Message {
                sender: self.sender,
                payload,
            }),
        }
    }

    pub(crate) fn from_parts(sender: Option<ActorRef>, payload: Payload) -> Self {
        Self { sender, payload }
    }

    pub(crate) fn into_parts(self) -> (Option<ActorRef>, Payload) {
        (self.sender, self.payload)
    }

    /// Splits a request that expects an answer into its sender and reply action.
    pub(crate) fn into_reply(self) -> Option<(Option<ActorRef>, ReplyAction)> {
        match self.payload {
            Payload::System(SystemMessage::Ask { reply, .. })
            | Payload::System(SystemMessage::Answer { reply, .. })
            | Payload::System(SystemMessage::Select { reply, .. }) => {
                Some((self.sender, reply))
            }
            _ => None,
        }
    }
}

impl Debug for SystemMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemMessage::PoisonPill => write!(f, "PoisonPill"),
            SystemMessage::Terminated => write!(f, "Terminated"),
            SystemMessage::Error(error) => write!(f, "ErrorMessage({})", error),
            SystemMessage::Ask { message, .. } => {
                write!(f, "AskMessage({:?})", message)
            }
            SystemMessage::Answer { answer, .. } => {
                write!(f, "AnswerMessage(answered: {})", answer.is_some())
            }
            SystemMessage::Select { path, .. } => {
                write!(f, "ActorSelect({})", path)
            }
        }
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Message");
        debug.field("sender", &self.sender.as_ref().map(|s| s.path()));
        match &self.payload {
            Payload::User(_) => debug.field("payload", &"User"),
            Payload::System(system) => debug.field("payload", system),
        };
        debug.finish()
    }
}
