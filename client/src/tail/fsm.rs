//! Tail session state machine

/// Phase of a tail session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailPhase {
    /// No subject, no timer
    #[default]
    Idle,

    /// Fetching on a fixed cadence
    Polling,

    /// Timer cleared; terminal for the session
    Stopped,
}

/// Tail session event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// Begin tailing a subject. Allowed from any phase; replaces the session.
    Start,

    /// A tick observed that the deployment already finished
    Complete,

    /// Polling gave up after repeated failures
    Abort(String),

    /// Operator stopped the tail
    Stop,
}

/// Tail FSM
#[derive(Debug, Clone, Default)]
pub struct TailFsm {
    phase: TailPhase,
    error: Option<String>,
}

impl TailFsm {
    /// Create a new FSM in the idle phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current phase
    pub fn phase(&self) -> TailPhase {
        self.phase
    }

    /// Get the abort reason if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition phase
    pub fn process(&mut self, event: TailEvent) -> Result<(), String> {
        let next = match (self.phase, &event) {
            (_, TailEvent::Start) => {
                self.error = None;
                TailPhase::Polling
            }

            (TailPhase::Polling, TailEvent::Complete) => TailPhase::Stopped,
            (TailPhase::Polling, TailEvent::Abort(err)) => {
                self.error = Some(err.clone());
                TailPhase::Stopped
            }

            // Manual stop is valid everywhere and idempotent
            (_, TailEvent::Stop) => {
                self.error = None;
                TailPhase::Stopped
            }

            (phase, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", phase, event));
            }
        };

        self.phase = next;
        Ok(())
    }
}
