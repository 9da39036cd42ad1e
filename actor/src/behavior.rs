// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Behaviors
//!
//! An actor can replace its `receive` handler at runtime by pushing named handlers on a LIFO
//! stack. The handler on top of the stack gets every user message; with an empty stack
//! [`crate::Actor::receive`] is used. The stack belongs to the actor instance, so a restart
//! starts over with an empty one.
//!

use crate::{ActorContext, Error, Message};

use std::sync::Arc;

/// Message handler pushed on the behavior stack.
pub type Behavior<A> = Arc<
    dyn Fn(&mut A, &mut ActorContext<'_, A>, Message) -> Result<(), Error>
        + Send
        + Sync,
>;

/// LIFO stack of named behaviors.
pub struct BehaviorStack<A> {
    states: Vec<(String, Behavior<A>)>,
}

impl<A> BehaviorStack<A> {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Pushes a behavior on top of the stack.
    pub fn push(&mut self, name: &str, behavior: Behavior<A>) {
        self.states.push((name.to_owned(), behavior));
    }

    /// Replaces the behavior on top of the stack, or pushes it if the stack is empty.
    pub fn replace_head(&mut self, name: &str, behavior: Behavior<A>) {
        self.states.pop();
        self.push(name, behavior);
    }

    /// Removes the top behavior and returns its name.
    pub fn pop(&mut self) -> Option<String> {
        self.states.pop().map(|(name, _)| name)
    }

    /// The behavior on top of the stack.
    pub fn head(&self) -> Option<(&str, Behavior<A>)> {
        self.states
            .last()
            .map(|(name, behavior)| (name.as_str(), behavior.clone()))
    }

    /// Pops behaviors until `name` is on top. If no behavior has that name the stack ends
    /// up empty.
    pub fn pop_to(&mut self, name: &str) {
        while let Some((head, _)) = self.states.last() {
            if head == name {
                break;
            }
            self.states.pop();
        }
    }

    /// Removes every behavior.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}

impl<A> Default for BehaviorStack<A> {
    fn default() -> Self {
        Self::new()
    }
}
