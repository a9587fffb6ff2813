//! Submission state for the record editor.
//!
//! `Idle -> Submitting -> Succeeded -> (delay) -> navigate back`, or
//! `Submitting -> Failed`, after which the user may submit again.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Shown when the store accepts a write but replies with an empty body
pub const DEFAULT_CONFIRMATION: &str = "Record saved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitPhase {
  Idle,
  Submitting,
  Succeeded { message: String, at: Instant },
  Failed(String),
}

/// What the owner of a flow should do after polling it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Nothing to do
  Pending,
  /// The phase changed; redraw
  Changed,
  /// The confirmation has been on screen long enough; leave the editor
  Navigate,
}

/// Drives one write at a time and reports the result back to the UI loop.
pub struct SubmitFlow {
  phase: SubmitPhase,
  redirect_delay: Duration,
  sender: mpsc::UnboundedSender<Result<String, String>>,
  receiver: mpsc::UnboundedReceiver<Result<String, String>>,
}

impl SubmitFlow {
  pub fn new(redirect_delay: Duration) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      phase: SubmitPhase::Idle,
      redirect_delay,
      sender,
      receiver,
    }
  }

  pub fn phase(&self) -> &SubmitPhase {
    &self.phase
  }

  /// Whether a new submission may start.
  pub fn can_submit(&self) -> bool {
    matches!(self.phase, SubmitPhase::Idle | SubmitPhase::Failed(_))
  }

  /// Text for the banner, if any.
  pub fn banner(&self) -> Option<&str> {
    match &self.phase {
      SubmitPhase::Idle => None,
      SubmitPhase::Submitting => Some("Saving..."),
      SubmitPhase::Succeeded { message, .. } => Some(message),
      SubmitPhase::Failed(error) => Some(error),
    }
  }

  /// Start a submission. Returns `false` and does nothing while one is running
  /// or a confirmation is on screen.
  pub fn start<F>(&mut self, submit: F) -> bool
  where
    F: Future<Output = Result<String, String>> + Send + 'static,
  {
    if !self.can_submit() {
      return false;
    }

    self.phase = SubmitPhase::Submitting;
    let tx = self.sender.clone();
    tokio::spawn(async move {
      let result = submit.await;
      // Ignore send errors - the editor may have been closed
      let _ = tx.send(result);
    });
    true
  }

  /// Apply any finished submission and check the redirect delay.
  pub fn poll(&mut self, now: Instant) -> SubmitOutcome {
    let mut outcome = SubmitOutcome::Pending;

    while let Ok(result) = self.receiver.try_recv() {
      self.phase = match result {
        Ok(reply) => {
          let reply = reply.trim();
          let message = if reply.is_empty() {
            DEFAULT_CONFIRMATION.to_string()
          } else {
            reply.to_string()
          };
          info!(%message, "submit confirmed");
          SubmitPhase::Succeeded { message, at: now }
        }
        Err(error) => {
          warn!(%error, "submit failed");
          SubmitPhase::Failed(format!("Submit failed: {}", error))
        }
      };
      outcome = SubmitOutcome::Changed;
    }

    if let SubmitPhase::Succeeded { at, .. } = &self.phase {
      if now.duration_since(*at) >= self.redirect_delay {
        self.phase = SubmitPhase::Idle;
        return SubmitOutcome::Navigate;
      }
    }

    outcome
  }
}
