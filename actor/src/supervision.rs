// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Supervision
//!
//! Operations a supervisor applies to a failing actor. [`crate::Actor::supervisor_strategy`]
//! receives the failing child in [`crate::ErrorMessage::sender`] and usually ends up calling
//! one of these.
//!

use crate::ActorRef;

use tracing::{error, warn};

impl ActorRef {
    /// Replaces the actor instance with a fresh one built by the constructor given at creation.
    ///
    /// Path, reference, queue and children are kept. The swap is queued behind the messages
    /// already sent to the actor, so the next message after it reaches the new instance.
    /// Restarting a dead reference does nothing.
    ///
    pub fn restart(&self) {
        match self.cell() {
            Some(cell) => cell.restart(),
            None => warn!("Can not restart {}, the actor is gone.", self.path()),
        }
    }

    /// Stops the whole actor system owning this actor.
    pub fn escalate(&self) {
        match self.cell().and_then(|cell| cell.system()) {
            Some(system) => {
                error!("Actor {} escalated, stopping the system.", self.path());
                system.shutdown();
            }
            None => warn!("Can not escalate from {}, the actor is gone.", self.path()),
        }
    }
}

#[cfg(test)]
mod tests {

    use crate::{Actor, ActorContext, ActorPath, ActorRef, ActorSystem, Error, Message};

    use async_trait::async_trait;
    use tracing_test::traced_test;

    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        n: usize,
    }

    struct Increment;

    struct Get;

    #[async_trait]
    impl Actor for Counter {
        async fn receive(
            &mut self,
            ctx: &mut ActorContext<'_, Self>,
            msg: Message,
        ) -> Result<(), Error> {
            if msg.is::<Increment>() {
                self.n += 1;
            } else if msg.is::<Get>() {
                ctx.reply(self.n);
            }
            Ok(())
        }
    }

    async fn count(system: &ActorSystem, counter: &ActorRef) -> usize {
        let answer = system.ask(counter, Get).await.unwrap().unwrap();
        *answer.downcast::<usize>().unwrap()
    }

    #[tokio::test]
    async fn test_restart_resets_state() {
        let system = ActorSystem::new("test");
        let counter = system.actor_of("counter", Counter::default).unwrap();
        for _ in 0..3 {
            counter.tell(Message::new(Increment));
        }
        assert_eq!(count(&system, &counter).await, 3);

        counter.restart();
        assert_eq!(count(&system, &counter).await, 0);
        assert_eq!(system.actor_for("/user/counter"), Some(counter.clone()));
        assert_eq!(counter.path(), ActorPath::from("/user/counter"));
    }

    #[test]
    #[traced_test]
    fn test_restart_dead_ref() {
        let dead = ActorRef::new(ActorPath::from("/user/dead"));
        dead.restart();
        dead.escalate();
        assert!(logs_contain("Can not restart /user/dead"));
        assert!(logs_contain("Can not escalate from /user/dead"));
    }

    #[tokio::test]
    async fn test_escalate_stops_system() {
        let system = ActorSystem::new("test");
        let counter = system.actor_of("counter", Counter::default).unwrap();
        counter.escalate();
        system.wait().await;
        assert!(system.is_terminated());
        assert!(!counter.is_alive());
        assert_eq!(
            system.wait_for(Duration::from_millis(1)).await,
            crate::WaitResult::Completed
        );
    }
}
