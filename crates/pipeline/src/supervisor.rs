//! Service trait and restarting supervisor
//!
//! Every long-lived component implements [`Service`] and is owned by a
//! [`Supervisor`]. A child returning an error is logged and restarted after
//! a short backoff; a child returning `Ok` is considered done. Root
//! cancellation cascades to every child, and the supervisor waits for all of
//! them before returning.
//!
//! Supervisors nest: a supervisor is itself a service, which is how the TCP
//! broadcast listener keeps its acceptor and broadcaster under one roof.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default delay before restarting a failed child
const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// A long-lived task with cooperative cancellation
///
/// `serve` returns only on fatal error or once `cancel` fires. Services must
/// return promptly on cancellation, also while blocked on channel sends or
/// I/O.
#[async_trait]
pub trait Service: Send + 'static {
    /// Name used in log events
    fn name(&self) -> String;

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// Lifecycle events reported through the event hook
#[derive(Debug)]
pub enum SupervisorEvent<'a> {
    /// A child returned an error and will be restarted
    ChildFailed {
        supervisor: &'a str,
        child: &'a str,
        error: &'a anyhow::Error,
    },
}

type EventHook = Arc<dyn Fn(SupervisorEvent<'_>) + Send + Sync>;

/// Runs services as independent tasks and keeps them running
pub struct Supervisor {
    name: String,
    children: Vec<Box<dyn Service>>,
    backoff: Duration,
    event_hook: Option<EventHook>,
}

impl Supervisor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            backoff: RESTART_BACKOFF,
            event_hook: None,
        }
    }

    /// Add a child service
    pub fn add(&mut self, service: impl Service) {
        self.children.push(Box::new(service));
    }

    /// Add an already boxed child service
    pub fn add_boxed(&mut self, service: Box<dyn Service>) {
        self.children.push(service);
    }

    /// Override the restart backoff
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Install an event hook, called in addition to the log output
    pub fn with_event_hook(
        mut self,
        hook: impl Fn(SupervisorEvent<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.event_hook = Some(Arc::new(hook));
        self
    }

    /// Number of children added so far
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Run all children until cancellation
    ///
    /// Children failing with an error are restarted after the backoff; a
    /// child returning `Ok` is left stopped. Returns once every child has
    /// returned after cancellation.
    pub async fn run(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        tracing::debug!(
            supervisor = %self.name,
            children = self.children.len(),
            "supervisor starting"
        );

        let mut tasks = JoinSet::new();
        for mut child in self.children.drain(..) {
            let cancel = cancel.clone();
            let backoff = self.backoff;
            let supervisor = self.name.clone();
            let hook = self.event_hook.clone();

            tasks.spawn(async move {
                let child_name = child.name();
                loop {
                    let result = child.serve(cancel.clone()).await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    match result {
                        Ok(()) => {
                            tracing::debug!(
                                supervisor = %supervisor,
                                child = %child_name,
                                "child finished"
                            );
                            break;
                        }
                        Err(error) => {
                            tracing::error!(
                                supervisor = %supervisor,
                                child = %child_name,
                                error = %error,
                                "child failed, restarting"
                            );
                            if let Some(hook) = &hook {
                                hook(SupervisorEvent::ChildFailed {
                                    supervisor: &supervisor,
                                    child: &child_name,
                                    error: &error,
                                });
                            }
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                _ = tokio::time::sleep(backoff) => {}
                            }
                        }
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}

        tracing::debug!(supervisor = %self.name, "supervisor stopped");
        Ok(())
    }
}

#[async_trait]
impl Service for Supervisor {
    fn name(&self) -> String {
        format!("supervisor/{}", self.name)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.run(cancel).await
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;
