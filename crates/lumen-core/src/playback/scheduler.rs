//! Periodic tick scheduling with cancellation
//!
//! The host calls [`TickScheduler::poll`] from its frame loop with the current time.
//! Each scheduled task fires at most once per poll: a slow frame coalesces missed
//! ticks instead of replaying them. Cancelling a token takes effect immediately, so no
//! tick of a cancelled task is ever returned after the cancel.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// The periodic jobs driven by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// High-rate playhead refresh and transition detection
    Playhead,
    /// Lower-rate re-layout of the timeline
    Layout,
    /// Drift correction against the transport clock
    Resync,
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug)]
struct ScheduledTick {
    kind: TickKind,
    interval: Duration,
    next_due: Instant,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct TickScheduler {
    tasks: Vec<ScheduledTick>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` every `interval`, first due at `now`
    ///
    /// Scheduling a kind that is already active replaces it.
    pub fn schedule(&mut self, kind: TickKind, interval: Duration, now: Instant) -> CancellationToken {
        self.cancel(kind);
        let token = CancellationToken::new();
        self.tasks.push(ScheduledTick {
            kind,
            interval: interval.max(Duration::from_millis(1)),
            next_due: now,
            token: token.clone(),
        });
        token
    }

    /// Kinds due at `now`, in scheduling order
    pub fn poll(&mut self, now: Instant) -> Vec<TickKind> {
        self.tasks.retain(|task| !task.token.is_cancelled());

        let mut due = Vec::new();
        for task in &mut self.tasks {
            if task.next_due > now {
                continue;
            }
            due.push(task.kind);
            task.next_due += task.interval;
            if task.next_due <= now {
                task.next_due = now + task.interval;
            }
        }
        due
    }

    pub fn cancel(&mut self, kind: TickKind) {
        for task in self.tasks.iter().filter(|task| task.kind == kind) {
            task.token.cancel();
        }
        self.tasks.retain(|task| task.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        for task in &self.tasks {
            task.token.cancel();
        }
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, kind: TickKind) -> bool {
        self.tasks
            .iter()
            .any(|task| task.kind == kind && !task.token.is_cancelled())
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks
            .iter()
            .filter(|task| !task.token.is_cancelled())
            .map(|task| task.next_due)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_two_cadences() {
        let t0 = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.schedule(TickKind::Playhead, ms(16), t0);
        scheduler.schedule(TickKind::Layout, ms(100), t0);

        assert_eq!(scheduler.poll(t0), vec![TickKind::Playhead, TickKind::Layout]);
        assert_eq!(scheduler.poll(t0 + ms(20)), vec![TickKind::Playhead]);
        assert!(scheduler.poll(t0 + ms(25)).is_empty());
        assert_eq!(
            scheduler.poll(t0 + ms(100)),
            vec![TickKind::Playhead, TickKind::Layout]
        );
    }

    #[test]
    fn test_missed_ticks_coalesce() {
        let t0 = Instant::now();
        let mut scheduler = TickScheduler::new();
        scheduler.schedule(TickKind::Playhead, ms(10), t0);
        scheduler.poll(t0);

        assert_eq!(scheduler.poll(t0 + ms(500)), vec![TickKind::Playhead]);
        assert!(scheduler.poll(t0 + ms(505)).is_empty());
    }

    #[test]
    fn test_cancelled_token_never_fires() {
        let t0 = Instant::now();
        let mut scheduler = TickScheduler::new();
        let token = scheduler.schedule(TickKind::Resync, ms(10), t0);

        token.cancel();

        assert!(scheduler.poll(t0 + ms(50)).is_empty());
        assert!(!scheduler.is_scheduled(TickKind::Resync));
    }

    #[test]
    fn test_cancel_all_cancels_handed_out_tokens() {
        let t0 = Instant::now();
        let mut scheduler = TickScheduler::new();
        let playhead = scheduler.schedule(TickKind::Playhead, ms(16), t0);
        let layout = scheduler.schedule(TickKind::Layout, ms(100), t0);

        scheduler.cancel_all();

        assert!(playhead.is_cancelled() && layout.is_cancelled());
        assert!(scheduler.poll(t0 + ms(1000)).is_empty());
        assert_eq!(scheduler.next_due(), None);
    }
}
