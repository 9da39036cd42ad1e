// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor path
//!
//! The `path` module provides the `ActorPath` type. The `ActorPath` type is a path to an actor in the actor system.
//!

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{Error, Formatter};

/// Hierarchical actor path providing unique addressing for actors within the actor system.
///
/// `ActorPath` represents the location of an actor within the supervision tree, similar to a
/// filesystem path. Every actor created by the system lives under `/user`, so an actor named
/// "worker" created by "manager" has the path `/user/manager/worker`.
///
/// Paths are stored as a sequence of segments. Two paths are equal if and only if their
/// textual forms are equal, and every comparison is done segment by segment, so `/user` is
/// never mistaken for an ancestor of `/user2`.
///
/// # Path Format
///
/// - Root: `/user`
/// - Child: `/user/manager`
/// - Deep: `/user/manager/worker/task`
/// - Empty: `/`
///
/// Relative paths (`.`, `..`, `name`) are resolved against an existing path with
/// [`ActorPath::resolve`].
///
/// ```ignore
/// use actor::ActorPath;
///
/// let manager = ActorPath::from("/user/manager");
/// let worker = manager.clone() / "worker";
/// assert!(manager.is_parent_of(&worker));
/// assert_eq!(worker.resolve("../auditor").to_string(), "/user/manager/auditor");
/// ```
///
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorPath(Vec<String>);

impl ActorPath {
    /// Returns the first segment of the path as a path of its own.
    /// For `/user/manager/worker` this is `/user`.
    pub fn root(&self) -> Self {
        ActorPath(self.0.iter().take(1).cloned().collect())
    }

    /// Returns the path of the supervising actor. Top-level and empty paths
    /// yield the empty path.
    pub fn parent(&self) -> Self {
        if self.0.len() > 1 {
            let mut tokens = self.0.clone();
            tokens.truncate(tokens.len() - 1);
            ActorPath(tokens)
        } else {
            ActorPath(Vec::new())
        }
    }

    /// Retrieves the final segment of this actor path, i.e. the name the actor was created with.
    /// The empty path has an empty key.
    pub fn key(&self) -> String {
        self.0.last().cloned().unwrap_or_default()
    }

    /// Number of segments.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// Segments of the path, from the root down.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Determines if this path is a proper ancestor of `other`. A path is never an
    /// ancestor of itself.
    pub fn is_ancestor_of(&self, other: &ActorPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Determines if this path is a proper descendant of `other`.
    pub fn is_descendant_of(&self, other: &ActorPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// Determines if `other` is a direct child of this path.
    pub fn is_parent_of(&self, other: &ActorPath) -> bool {
        !other.is_empty() && *self == other.parent()
    }

    /// Determines if this path is a direct child of `other`.
    pub fn is_child_of(&self, other: &ActorPath) -> bool {
        other.is_parent_of(self)
    }

    /// Returns `true` for single segment paths such as `/user`.
    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }

    /// Resolves a textual path against this one.
    ///
    /// Absolute paths (leading `/`) replace this path entirely. Relative paths are applied
    /// segment by segment: `.` stays in place, `..` moves to the parent and any other segment
    /// descends into the child with that name. Moving above the empty path is a no-op.
    ///
    pub fn resolve(&self, path: &str) -> ActorPath {
        if path.starts_with('/') {
            return ActorPath::from(path);
        }
        let mut tokens = self.0.clone();
        for segment in path.split('/').map(str::trim) {
            match segment {
                "" | "." => {}
                ".." => {
                    tokens.pop();
                }
                name => tokens.push(name.to_owned()),
            }
        }
        ActorPath(tokens)
    }
}

impl From<&str> for ActorPath {
    fn from(str: &str) -> Self {
        let tokens: Vec<String> = str
            .split('/')
            .filter(|x| !x.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
        ActorPath(tokens)
    }
}

impl From<String> for ActorPath {
    fn from(string: String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl From<&String> for ActorPath {
    fn from(string: &String) -> Self {
        ActorPath::from(string.as_str())
    }
}

/// Child path construction: `parent / "name"`.
impl std::ops::Div<&str> for ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        let mut keys = self.0;
        let mut tokens: Vec<String> = rhs
            .split('/')
            .filter(|x| !x.trim().is_empty())
            .map(|s| s.to_string())
            .collect();

        keys.append(&mut tokens);
        ActorPath(keys)
    }
}

impl std::fmt::Display for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.level().cmp(&1) {
            Ordering::Less => write!(f, "/"),
            Ordering::Equal => write!(f, "/{}", self.0[0]),
            Ordering::Greater => write!(f, "/{}", self.0.join("/")),
        }
    }
}

impl std::fmt::Debug for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        std::fmt::Display::fmt(self, f)
    }
}
