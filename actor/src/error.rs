// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor system.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An error occurred while sending a message to an actor.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// A child with the same name is already registered in the parent.
    #[error("Actor {0} exists.")]
    Exists(ActorPath),
    /// The parent is shutting down and does not accept new children.
    #[error("Actor {0} is dying and can not create children.")]
    Dying(ActorPath),
    /// The child name is empty or contains a path separator.
    #[error("Invalid actor name: {0:?}.")]
    InvalidName(String),
    /// No live actor is bound to the path.
    #[error("Actor {0} not found.")]
    NotFound(ActorPath),
    /// An error occurred while starting an actor.
    #[error("An error occurred while starting an actor: {0}.")]
    Start(String),
    /// An error occurred while stopping an actor.
    #[error("An error occurred while stopping an actor.")]
    Stop,
    /// The actor system has already shut down.
    #[error("The actor system is terminated.")]
    Terminated,
    /// The answer of an ask was lost before reaching the asker.
    #[error("An error occurred while waiting for an answer: {0}.")]
    Ask(String),
    /// A handler panicked while processing a message.
    #[error("Actor handler panicked: {0}")]
    Panic(String),
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::Exists(ActorPath::from("/user/counter"));
        assert_eq!(error.to_string(), "Actor /user/counter exists.");
        let error = Error::Functional("boom".to_owned());
        assert_eq!(error.to_string(), "Error: boom");
    }

    #[test]
    fn test_error_serde() {
        let error = Error::NotFound(ActorPath::from("/user/a/b"));
        let json = serde_json::to_string(&error).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }
}
