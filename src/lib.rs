// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Theater, an actor-model runtime.
//! Provides supervised actor trees, serialized per-actor execution, path based lookup and
//! request/reply on top of one-way messages.

pub use actor::{
    Actor, ActorContext, ActorPath, ActorRef, ActorSystem, Answer, Behavior,
    BehaviorStack, DefaultDispatcher, Dispatcher, DispatcherConfig,
    Error as ActorError, ErrorMessage, ExecutionQueue, Message, Payload,
    ReplyAction, ShareDispatcher, SystemConfig, SystemMessage, WaitResult,
};
