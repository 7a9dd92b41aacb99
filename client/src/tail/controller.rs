//! Log tail controller
//!
//! Polls a deployment's log history until the last entry reports that the
//! deployment is no longer running. Each `start` opens a new session bound to
//! a child of the controller's cancellation token; `stop`, a newer `start`,
//! or dropping the controller cancels it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use swarmhub_models::LogEntry;

use crate::errors::ClientError;
use crate::http::{LogSubject, SwarmApi};
use crate::notify::Notifier;
use crate::tail::fsm::{TailEvent, TailFsm, TailPhase};
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Tail options
#[derive(Debug, Clone)]
pub struct TailOptions {
    /// Polling interval
    pub interval: Duration,

    /// Consecutive failed fetches before the session gives up
    pub max_consecutive_failures: u32,

    /// Upper bound for the retry delay after failures
    pub max_backoff: Duration,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_consecutive_failures: 5,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl TailOptions {
    /// Delay before the next tick given the current failure streak
    fn next_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let cooldown = CooldownOptions {
            base_delay: self.interval,
            max_delay: self.max_backoff.max(self.interval),
            multiplier: 2.0,
        };
        calc_exp_backoff(&cooldown, failures - 1)
    }
}

/// Observable state of the tail
#[derive(Debug, Clone, Default)]
pub struct TailView {
    /// What is being tailed
    pub subject: Option<LogSubject>,

    /// Full log history from the latest fetch
    pub entries: Vec<LogEntry>,

    /// `Running` flag of the last entry; unset before the first entry arrives
    pub running: Option<bool>,

    fsm: TailFsm,
    session: u64,
    cancel: Option<CancellationToken>,
}

impl TailView {
    pub fn phase(&self) -> TailPhase {
        self.fsm.phase()
    }

    /// Why polling gave up, if it did
    pub fn error(&self) -> Option<&str> {
        self.fsm.error()
    }

    /// Whether a tick task is armed
    pub fn has_active_timer(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }

    fn transition(&mut self, event: TailEvent) {
        if let Err(e) = self.fsm.process(event) {
            debug!("Ignoring tail event: {}", e);
        }
    }

    fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Shared state handed to the tick task
#[derive(Clone)]
struct Session {
    id: u64,
    subject: LogSubject,
    cancel: CancellationToken,
    api: Arc<dyn SwarmApi>,
    view: Arc<watch::Sender<TailView>>,
    notifier: Notifier,
    options: TailOptions,
}

impl Session {
    fn is_current(&self) -> bool {
        self.view.borrow().session == self.id
    }

    /// Replace the buffer with a fetch result. Returns false when the session
    /// has been superseded and the result was dropped.
    fn apply(&self, entries: Vec<LogEntry>) -> bool {
        let mut applied = false;
        self.view.send_if_modified(|view| {
            if view.session != self.id {
                return false;
            }
            if let Some(last) = entries.last() {
                view.running = Some(last.running);
            }
            view.entries = entries;
            applied = true;
            true
        });
        applied
    }

    fn finish(&self, event: TailEvent) {
        self.view.send_if_modified(|view| {
            if view.session != self.id {
                return false;
            }
            view.disarm();
            view.transition(event);
            true
        });
    }
}

/// Stops the session when `start` is dropped before the first fetch settles,
/// so no phase is left `Polling` without a tick task behind it.
struct StartGuard {
    session: Session,
    armed: bool,
}

impl StartGuard {
    fn new(session: Session) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn defuse(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("Tail start for {} abandoned", self.session.subject);
            self.session.finish(TailEvent::Stop);
        }
    }
}

/// Log tail controller
pub struct LogTailController {
    api: Arc<dyn SwarmApi>,
    options: TailOptions,
    notifier: Notifier,
    view: Arc<watch::Sender<TailView>>,
    root: CancellationToken,
}

impl LogTailController {
    /// Create a new controller in the idle phase
    pub fn new(api: Arc<dyn SwarmApi>, options: TailOptions, notifier: Notifier) -> Self {
        let (view, _rx) = watch::channel(TailView::default());
        Self {
            api,
            options,
            notifier,
            view: Arc::new(view),
            root: CancellationToken::new(),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> TailView {
        self.view.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<TailView> {
        self.view.subscribe()
    }

    /// Start tailing `subject`, replacing any previous session.
    ///
    /// Performs the first fetch before returning. If the deployment is still
    /// running a tick task is armed; otherwise the session stops right away.
    pub async fn start(&self, subject: LogSubject) -> Result<(), ClientError> {
        let cancel = self.root.child_token();
        let mut id = 0;
        self.view.send_modify(|view| {
            view.disarm();
            view.session += 1;
            view.subject = Some(subject.clone());
            view.entries.clear();
            view.running = None;
            view.cancel = Some(cancel.clone());
            view.transition(TailEvent::Start);
            id = view.session;
        });

        let session = Session {
            id,
            subject: subject.clone(),
            cancel,
            api: self.api.clone(),
            view: self.view.clone(),
            notifier: self.notifier.clone(),
            options: self.options.clone(),
        };

        info!("Tailing deploy logs for {}", subject);

        let guard = StartGuard::new(session.clone());
        let keep_polling = self.first_fetch(&session).await;
        guard.defuse();

        if keep_polling? {
            tokio::spawn(poll(session));
        }
        Ok(())
    }

    /// Fill the buffer once. Returns whether the tick task should take over.
    async fn first_fetch(&self, session: &Session) -> Result<bool, ClientError> {
        let subject = &session.subject;
        let fetched = tokio::select! {
            _ = session.cancel.cancelled() => return Ok(false),
            fetched = self.api.deploy_logs(subject) => fetched,
        };

        let entries = match fetched {
            Ok(entries) => entries,
            Err(e) => {
                session.finish(TailEvent::Abort(e.to_string()));
                if session.is_current() {
                    self.notifier
                        .error(format!("Unable to load deploy logs for {}: {}", subject, e));
                }
                return Err(e);
            }
        };

        let running = entries.last().map(|e| e.running);
        if !session.apply(entries) {
            return Ok(false);
        }

        if running == Some(false) {
            info!("Deployment of {} already finished", subject);
            session.finish(TailEvent::Complete);
            return Ok(false);
        }

        Ok(true)
    }

    /// Stop tailing and clear the buffer. Safe to call at any time.
    pub fn stop(&self) {
        self.view.send_modify(|view| {
            view.disarm();
            view.session += 1;
            view.subject = None;
            view.entries.clear();
            view.running = None;
            view.transition(TailEvent::Stop);
        });
        debug!("Log tail stopped");
    }
}

impl Drop for LogTailController {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Tick loop for one session
async fn poll(session: Session) {
    let mut failures = 0u32;

    loop {
        let delay = session.options.next_delay(failures);
        tokio::select! {
            _ = session.cancel.cancelled() => {
                debug!("Tail session for {} cancelled", session.subject);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        // Decide from the previously known state, not from a new fetch
        let previously_running = {
            let view = session.view.borrow();
            if view.session != session.id {
                return;
            }
            view.running
        };
        if previously_running == Some(false) {
            info!("Deployment of {} finished, stopping tail", session.subject);
            session.finish(TailEvent::Complete);
            return;
        }

        let fetched = tokio::select! {
            _ = session.cancel.cancelled() => return,
            fetched = session.api.deploy_logs(&session.subject) => fetched,
        };

        match fetched {
            Ok(entries) => {
                failures = 0;
                if !session.apply(entries) {
                    return;
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    "Fetching deploy logs for {} failed ({}/{}): {}",
                    session.subject, failures, session.options.max_consecutive_failures, e
                );
                if failures >= session.options.max_consecutive_failures {
                    session.finish(TailEvent::Abort(e.to_string()));
                    if session.is_current() {
                        session.notifier.error(format!(
                            "Stopped tailing {} after {} failed attempts: {}",
                            session.subject, failures, e
                        ));
                    }
                    return;
                }
            }
        }
    }
}
