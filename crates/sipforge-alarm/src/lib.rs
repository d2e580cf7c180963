//! One-shot round alarm for Sipforge.
//!
//! A [`RoundAlarm`] is the owned, cancellable deadline a room actor arms
//! when a round starts. It holds at most one pending deadline; arming always
//! cancels whatever was pending first, so two rounds can never race each
//! other's timeouts.
//!
//! # Integration
//!
//! The alarm is designed to sit inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = alarm.fired() => { /* round timed out — open voting */ }
//!     }
//! }
//! ```
//!
//! While disarmed, [`RoundAlarm::fired`] pends forever — `select!` simply
//! keeps processing the other branches. The future is recreated on every
//! loop iteration, so an `arm` or `cancel` performed by a command handler
//! takes effect on the very next pass.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// A single cancellable deadline, owned by one room actor.
///
/// Not `Clone` and not thread-safe by design: exactly one task owns the
/// alarm, the same task that owns the room state it protects.
#[derive(Debug, Default)]
pub struct RoundAlarm {
    /// When the alarm should fire. `None` means disarmed.
    deadline: Option<Instant>,
    /// Total number of times `arm` has been called. Diagnostic only.
    armed_count: u64,
}

impl RoundAlarm {
    /// Creates a disarmed alarm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the alarm to fire `after` from now.
    ///
    /// Any previously pending deadline is cancelled first — the cancel
    /// happens-before the new deadline exists, so at most one deadline is
    /// ever pending.
    pub fn arm(&mut self, after: Duration) {
        self.cancel();
        self.deadline = Some(Instant::now() + after);
        self.armed_count += 1;
        debug!(after_ms = after.as_millis() as u64, "alarm armed");
    }

    /// Disarms the alarm. A no-op if nothing is pending.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!("alarm cancelled");
        }
    }

    /// Whether a deadline is currently pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the pending deadline, `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Total number of times the alarm has been armed.
    pub fn armed_count(&self) -> u64 {
        self.armed_count
    }

    /// Waits until the pending deadline, then disarms and returns.
    ///
    /// Pends forever while disarmed. Safe to drop at any point (e.g. when
    /// another `select!` branch wins): the deadline is only cleared when the
    /// future actually completes, so an interrupted wait resumes cleanly on
    /// the next call.
    pub async fn fired(&mut self) {
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => {
                // Disarmed: this future never completes on its own, but
                // `select!` still drives the other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(deadline).await;
        self.deadline = None;
        trace!("alarm fired");
    }
}
