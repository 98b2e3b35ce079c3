//! Reporting spin and ticket deltas to the host
//!
//! The engine never awaits a callback. Each report becomes a boxed future in
//! an outbox that the host drives. Markers advance when a callback is invoked,
//! so a failed report is logged and not retried.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;

use crate::error::ReportError;
use crate::instant_win::PrizeRecord;

/// Host callbacks for persisted session state
pub trait SessionReporter: Send + Sync {
    /// Player spins were used up
    fn spins_consumed(&self, count: u32) -> BoxFuture<'static, Result<(), ReportError>>;

    /// Tickets were added to the session total
    fn tickets_earned(&self, count: u64) -> BoxFuture<'static, Result<(), ReportError>>;

    /// An instant-win prize was won
    fn instant_win_claimed(&self, prize: PrizeRecord) -> BoxFuture<'static, Result<(), ReportError>>;
}

/// Reporter that accepts everything and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl SessionReporter for NullReporter {
    fn spins_consumed(&self, _count: u32) -> BoxFuture<'static, Result<(), ReportError>> {
        future::ok(()).boxed()
    }

    fn tickets_earned(&self, _count: u64) -> BoxFuture<'static, Result<(), ReportError>> {
        future::ok(()).boxed()
    }

    fn instant_win_claimed(&self, _prize: PrizeRecord) -> BoxFuture<'static, Result<(), ReportError>> {
        future::ok(()).boxed()
    }
}

/// One recorded callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    SpinsConsumed(u32),
    TicketsEarned(u64),
    InstantWinClaimed(String),
}

/// In-memory reporter. Records each call when it is invoked.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    log: Arc<Mutex<Vec<Report>>>,
    fail_with: Option<ReportError>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is recorded, then resolves to `error`
    pub fn failing(error: ReportError) -> Self {
        Self {
            log: Arc::default(),
            fail_with: Some(error),
        }
    }

    pub fn reports(&self) -> Vec<Report> {
        self.log.lock().clone()
    }

    pub fn total_spins_consumed(&self) -> u32 {
        self.log
            .lock()
            .iter()
            .map(|r| match r {
                Report::SpinsConsumed(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn total_tickets(&self) -> u64 {
        self.log
            .lock()
            .iter()
            .map(|r| match r {
                Report::TicketsEarned(n) => *n,
                _ => 0,
            })
            .sum()
    }

    fn record(&self, report: Report) -> BoxFuture<'static, Result<(), ReportError>> {
        self.log.lock().push(report);
        match &self.fail_with {
            Some(error) => future::err(error.clone()).boxed(),
            None => future::ok(()).boxed(),
        }
    }
}

impl SessionReporter for RecordingReporter {
    fn spins_consumed(&self, count: u32) -> BoxFuture<'static, Result<(), ReportError>> {
        self.record(Report::SpinsConsumed(count))
    }

    fn tickets_earned(&self, count: u64) -> BoxFuture<'static, Result<(), ReportError>> {
        self.record(Report::TicketsEarned(count))
    }

    fn instant_win_claimed(&self, prize: PrizeRecord) -> BoxFuture<'static, Result<(), ReportError>> {
        self.record(Report::InstantWinClaimed(prize.id))
    }
}

/// Delta tracker plus outbox
pub struct Reconciler {
    reporter: Arc<dyn SessionReporter>,
    last_spins_left: u32,
    last_tickets: u64,
    outbox: Vec<BoxFuture<'static, ()>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("last_spins_left", &self.last_spins_left)
            .field("last_tickets", &self.last_tickets)
            .field("pending", &self.outbox.len())
            .finish()
    }
}

impl Reconciler {
    pub fn new(reporter: Arc<dyn SessionReporter>, spins_left: u32, tickets: u64) -> Self {
        Self {
            reporter,
            last_spins_left: spins_left,
            last_tickets: tickets,
            outbox: Vec::new(),
        }
    }

    /// Report positive deltas since the last call
    pub fn reconcile(&mut self, spins_left: u32, tickets: u64) {
        let consumed = self.last_spins_left.saturating_sub(spins_left);
        self.last_spins_left = spins_left;
        if consumed > 0 {
            log::debug!("Reporting {consumed} spin(s) consumed");
            let call = self.reporter.spins_consumed(consumed);
            self.post("spins_consumed", call);
        }

        let earned = tickets.saturating_sub(self.last_tickets);
        self.last_tickets = tickets;
        if earned > 0 {
            log::debug!("Reporting {earned} ticket(s) earned");
            let call = self.reporter.tickets_earned(earned);
            self.post("tickets_earned", call);
        }
    }

    pub fn claim(&mut self, prize: PrizeRecord) {
        let id = prize.id.clone();
        let call = self.reporter.instant_win_claimed(prize);
        self.post("instant_win_claimed", call);
        log::debug!("Reporting instant-win claim {id}");
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Hand the outbox to the host
    pub fn take(&mut self) -> Vec<BoxFuture<'static, ()>> {
        std::mem::take(&mut self.outbox)
    }

    /// Drive every queued report to completion
    pub async fn flush(&mut self) {
        future::join_all(self.take()).await;
    }

    fn post(&mut self, label: &'static str, call: BoxFuture<'static, Result<(), ReportError>>) {
        self.outbox.push(
            async move {
                if let Err(e) = call.await {
                    log::warn!("{label} report failed: {e}");
                }
            }
            .boxed(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_positive_deltas_only() {
        let recorder = RecordingReporter::new();
        let mut reconciler = Reconciler::new(Arc::new(recorder.clone()), 10, 0);

        reconciler.reconcile(10, 0);
        assert_eq!(reconciler.pending(), 0);

        reconciler.reconcile(9, 4);
        reconciler.reconcile(9, 4);
        assert_eq!(reconciler.pending(), 2);
        reconciler.flush().await;

        assert_eq!(
            recorder.reports(),
            vec![Report::SpinsConsumed(1), Report::TicketsEarned(4)]
        );
    }

    #[tokio::test]
    async fn test_failures_are_not_retried() {
        let recorder = RecordingReporter::failing(ReportError::Unavailable("offline".into()));
        let mut reconciler = Reconciler::new(Arc::new(recorder.clone()), 3, 0);

        reconciler.reconcile(2, 0);
        reconciler.flush().await;
        reconciler.reconcile(2, 0);
        reconciler.flush().await;

        assert_eq!(recorder.total_spins_consumed(), 1);
    }

    #[tokio::test]
    async fn test_claim_goes_through_outbox() {
        let recorder = RecordingReporter::new();
        let mut reconciler = Reconciler::new(Arc::new(recorder.clone()), 0, 0);
        reconciler.claim(PrizeRecord::new("p1", "Cocoa"));

        let outbox = reconciler.take();
        assert_eq!(outbox.len(), 1);
        future::join_all(outbox).await;
        assert_eq!(
            recorder.reports(),
            vec![Report::InstantWinClaimed("p1".into())]
        );
    }
}
