// Edge case tests for the actor module

use actor::{
    Actor, ActorContext, ActorPath, ActorRef, ActorSystem, Error, ErrorMessage,
    Message, WaitResult,
};
use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use std::{collections::HashSet, sync::Arc, time::Duration};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn recv<T>(receiver: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(TIMEOUT, receiver.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

// Defines an actor whose shutdown waits for the test to release it.
pub struct Gate {
    stopping: mpsc::UnboundedSender<()>,
    release: Arc<Notify>,
}

#[async_trait]
impl Actor for Gate {
    async fn will_stop(&mut self, _ctx: &mut ActorContext<'_, Self>) {
        let _ = self.stopping.send(());
        self.release.notified().await;
    }
}

pub struct Idle;

impl Actor for Idle {}

#[tokio::test]
async fn test_dying_parent_refuses_children() {
    let system = ActorSystem::new("dying");
    let (sender, mut stopping) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let gate_release = release.clone();
    system
        .actor_of("gate", move || Gate {
            stopping: sender.clone(),
            release: gate_release.clone(),
        })
        .unwrap();

    system.shutdown();
    recv(&mut stopping).await;
    assert_eq!(
        system.actor_of("late", || Idle).unwrap_err(),
        Error::Dying(ActorPath::from("/user"))
    );

    // User messages to a dying actor are dropped, so the ask gets no value.
    let answer = system.ask(&system.root(), ()).await.unwrap();
    assert!(answer.is_none());

    release.notify_one();
    assert_eq!(system.wait_for(TIMEOUT).await, WaitResult::Completed);
}

// Defines an actor that fails to start.
pub struct Broken;

#[async_trait]
impl Actor for Broken {
    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        Err(Error::Functional("no database".to_owned()))
    }
}

// Defines a supervisor that only records failures.
pub struct Recorder {
    failures: mpsc::UnboundedSender<ErrorMessage>,
}

#[async_trait]
impl Actor for Recorder {
    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        ctx.actor_of("broken", || Broken)?;
        Ok(())
    }

    async fn supervisor_strategy(
        &mut self,
        _ctx: &mut ActorContext<'_, Self>,
        error: ErrorMessage,
    ) {
        let _ = self.failures.send(error);
    }
}

#[tokio::test]
async fn test_start_failure_is_reported() {
    let system = ActorSystem::new("start");
    let (sender, mut failures) = mpsc::unbounded_channel();
    system
        .actor_of("recorder", move || Recorder {
            failures: sender.clone(),
        })
        .unwrap();

    let failure = recv(&mut failures).await;
    assert_eq!(failure.sender.path(), ActorPath::from("/user/recorder/broken"));
    assert_eq!(
        failure.error,
        Error::Start("Error: no database".to_owned())
    );
    // The actor stays alive after a failed start.
    assert!(failure.sender.is_alive());
}

pub struct Find(String);

// Defines an actor resolving paths relative to itself.
pub struct Finder {
    found: mpsc::UnboundedSender<Option<ActorPath>>,
}

#[async_trait]
impl Actor for Finder {
    async fn receive(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
        msg: Message,
    ) -> Result<(), Error> {
        if let Some(Find(path)) = msg.downcast_ref::<Find>() {
            let found = self.found.clone();
            let sync = ctx.actor_for(path).map(|actor| actor.path());
            ctx.select_actor(path, move |actor| {
                assert_eq!(actor.as_ref().map(ActorRef::path), sync);
                let _ = found.send(actor.map(|actor| actor.path()));
            });
        }
        Ok(())
    }
}

pub struct Family {
    found: mpsc::UnboundedSender<Option<ActorPath>>,
}

#[async_trait]
impl Actor for Family {
    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        let found = self.found.clone();
        ctx.actor_of("finder", move || Finder {
            found: found.clone(),
        })?;
        ctx.actor_of("sibling", || Idle)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_relative_selection() {
    let system = ActorSystem::new("select");
    let (sender, mut found) = mpsc::unbounded_channel();
    let family = system
        .actor_of("family", move || Family {
            found: sender.clone(),
        })
        .unwrap();
    system.ask(&family, ()).await.unwrap();
    let finder = family.actor_for("finder").unwrap();

    for (path, expected) in [
        (".", Some("/user/family/finder")),
        ("..", Some("/user/family")),
        ("../sibling", Some("/user/family/sibling")),
        ("../../family/sibling", Some("/user/family/sibling")),
        ("/user/family", Some("/user/family")),
        ("../missing", None),
        ("child", None),
    ] {
        finder.tell(Message::new(Find(path.to_owned())));
        assert_eq!(recv(&mut found).await, expected.map(ActorPath::from));
    }
}

#[tokio::test]
async fn test_anonymous_names_are_unique() {
    let system = ActorSystem::new("anonymous");
    let names: HashSet<String> = (0..20)
        .map(|_| system.actor_of_anonymous(|| Idle).unwrap().path().key())
        .collect();
    assert_eq!(names.len(), 20);
    assert!(names.iter().all(|name| name.starts_with('$')));
}

#[tokio::test]
async fn test_ask_dead_reference() {
    let system = ActorSystem::new("dead");
    let idle = system.actor_of("idle", || Idle).unwrap();
    idle.stop();
    while idle.is_alive() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        system.ask(&idle, ()).await.unwrap_err(),
        Error::NotFound(ActorPath::from("/user/idle"))
    );
    assert!(system.actor_for("/user/idle").is_none());
    assert!(!system.is_registered(&ActorPath::from("/user/idle")));

    let (sender, receiver) = tokio::sync::oneshot::channel();
    system.select_actor("/user/idle", None, move |found| {
        let _ = sender.send(found.is_none());
    });
    assert!(receiver.await.unwrap());
}

pub struct Status;

// Defines a parent that recreates its worker once after the first one terminated.
pub struct Keeper {
    respawned: bool,
}

#[async_trait]
impl Actor for Keeper {
    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
    ) -> Result<(), Error> {
        ctx.actor_of("worker", || Idle)?;
        Ok(())
    }

    async fn receive(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
        msg: Message,
    ) -> Result<(), Error> {
        if msg.is::<Status>() {
            ctx.reply(ctx.child("worker").map(|worker| worker.is_alive()));
        }
        Ok(())
    }

    async fn child_terminated(
        &mut self,
        ctx: &mut ActorContext<'_, Self>,
        child: &ActorRef,
    ) {
        assert!(!child.is_alive());
        assert!(ctx.child("worker").is_none());
        if !self.respawned {
            self.respawned = true;
            ctx.actor_of("worker", || Idle).unwrap();
        }
    }
}

#[tokio::test]
async fn test_child_recreated_in_child_terminated() {
    let system = ActorSystem::new("respawn");
    let keeper = system
        .actor_of("keeper", || Keeper { respawned: false })
        .unwrap();
    system.ask(&keeper, ()).await.unwrap();

    let first = keeper.actor_for("worker").unwrap();
    first.stop();
    while first.is_alive() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let status = system
        .ask(&keeper, Status)
        .await
        .unwrap()
        .and_then(|answer| answer.downcast::<Option<bool>>().ok());
    assert_eq!(status.as_deref(), Some(&Some(true)));

    let second = keeper.actor_for("worker").unwrap();
    assert_ne!(second, first);
    assert!(second.is_alive());
    assert!(system.is_registered(&ActorPath::from("/user/keeper/worker")));
    assert_eq!(
        system.children(&ActorPath::from("/user/keeper")),
        vec![ActorPath::from("/user/keeper/worker")]
    );

    system.shutdown();
    assert_eq!(system.wait_for(TIMEOUT).await, WaitResult::Completed);
    assert!(system.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_name_reuse_under_concurrent_stop() {
    let system = ActorSystem::new("reuse");

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let system = system.clone();
        tasks.push(tokio::spawn(async move {
            let mut created = 0;
            while created < 25 {
                match system.actor_of("worker", || Idle) {
                    Ok(worker) => {
                        assert!(worker.is_alive());
                        created += 1;
                        worker.stop();
                    }
                    Err(Error::Exists(_)) => tokio::task::yield_now().await,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    let worker = loop {
        match system.actor_of("worker", || Idle) {
            Ok(worker) => break worker,
            Err(Error::Exists(_)) => {
                assert!(tokio::time::Instant::now() < deadline, "name never freed");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    };

    assert!(worker.is_alive());
    assert_eq!(system.actor_for("/user/worker"), Some(worker.clone()));
    for path in system.children(&ActorPath::from("/user")) {
        let child = system.actor_for(&path.to_string()).unwrap();
        assert!(child.is_alive());
    }
    assert_eq!(system.len(), 2);

    system.shutdown();
    assert_eq!(system.wait_for(TIMEOUT).await, WaitResult::Completed);
    assert!(!worker.is_alive());
}
