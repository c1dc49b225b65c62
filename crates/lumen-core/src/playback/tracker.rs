//! Playback position tracker
//!
//! The transport clock can only be sampled intermittently, so the playhead is
//! predicted from an anchor:
//!
//! ```text
//! predicted = anchor.position + (now − anchor.wall_clock)
//! ```
//!
//! computed on demand, never accumulated. The anchor is replaced on play, resume,
//! seek and whenever a status query returns the server's time.
//!
//! State machine:
//!
//! ```text
//!   Stopped ──play──► Starting ──ok──► Playing ◄──ok── Seeking
//!      ▲                 │ err            │  ──seek──►    │ err: pre-seek anchor
//!      │                 ▼                │               ▼
//!      └── stop / end ── prior ◄──────────┴── pause ──► Paused ──play──► Starting
//! ```
//!
//! Stop and pause take effect locally at once; a failing stop/pause command only
//! produces a notification. Replies to requests that were overtaken by a later local
//! change (stop during start, a second seek) are discarded.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::notification::Notification;
use super::scheduler::{TickKind, TickScheduler};
use super::transport::{
    IssuedRequest, PlaybackStatus, RequestId, StartResponse, TransportError, TransportReply,
    TransportRequest, TransportResult,
};
use crate::compensation::ChannelMap;
use crate::sequence::SequenceEvent;
use crate::track::TimelineExtent;

/// A server that reports "not playing" this close to the end is treated as finished
const END_TOLERANCE_SECONDS: f64 = 0.25;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Stopped,
    /// Start (or resume) issued, waiting for the transport
    Starting,
    Playing,
    /// Local seek applied, waiting for the transport to confirm
    Seeking,
    Paused,
}

impl PlaybackPhase {
    /// Whether the playhead is extrapolating
    pub fn is_running(&self) -> bool {
        matches!(self, PlaybackPhase::Playing | PlaybackPhase::Seeking)
    }
}

/// Known position at a known wall-clock instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: f64,
    pub wall_clock: Instant,
}

impl Anchor {
    pub fn new(position: f64, wall_clock: Instant) -> Self {
        Self { position, wall_clock }
    }

    /// Extrapolated position at `now`
    pub fn predict(&self, now: Instant) -> f64 {
        self.position + now.saturating_duration_since(self.wall_clock).as_secs_f64()
    }
}

/// Snapshot of the playback state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub predicted_position: f64,
    pub anchor_wall_clock: Instant,
    pub anchor_position: f64,
}

/// Refresh cadences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickIntervals {
    pub playhead: Duration,
    pub layout: Duration,
    pub resync: Duration,
}

impl Default for TickIntervals {
    fn default() -> Self {
        Self {
            playhead: Duration::from_millis(16),
            layout: Duration::from_millis(100),
            resync: Duration::from_millis(2000),
        }
    }
}

/// Result of a playhead tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub position: f64,
    /// Playback ran past the end of the track on this tick and is now stopped
    pub reached_end: bool,
}

/// What to do when an issued request completes
#[derive(Debug, Clone, Copy)]
enum Pending {
    Start {
        epoch: u64,
        prior_phase: PlaybackPhase,
        prior_anchor: Anchor,
        requested_start: f64,
    },
    Resume {
        epoch: u64,
        held: f64,
    },
    Seek {
        epoch: u64,
        prior_phase: PlaybackPhase,
        prior_anchor: Anchor,
    },
    Status {
        epoch: u64,
    },
    Pause,
    Stop,
    Compensate,
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Debug)]
pub struct PlaybackTracker {
    phase: PlaybackPhase,
    anchor: Anchor,
    extent: TimelineExtent,
    intervals: TickIntervals,
    scheduler: TickScheduler,
    pending: HashMap<RequestId, Pending>,
    next_request: u64,
    /// Bumped on every local change that invalidates in-flight replies
    epoch: u64,
    /// Seek requested while a start was in flight
    deferred_seek: Option<f64>,
    notifications: Vec<Notification>,
}

impl PlaybackTracker {
    pub fn new(intervals: TickIntervals) -> Self {
        Self {
            phase: PlaybackPhase::Stopped,
            anchor: Anchor::new(0.0, Instant::now()),
            extent: TimelineExtent::EMPTY,
            intervals,
            scheduler: TickScheduler::new(),
            pending: HashMap::new(),
            next_request: 0,
            epoch: 0,
            deferred_seek: None,
            notifications: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase.is_running()
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn extent(&self) -> TimelineExtent {
        self.extent
    }

    pub fn intervals(&self) -> TickIntervals {
        self.intervals
    }

    /// Predicted position while running, held position otherwise
    pub fn position(&self, now: Instant) -> f64 {
        if self.phase.is_running() {
            let predicted = self.anchor.predict(now);
            if self.extent.is_empty() {
                predicted
            } else {
                predicted.min(self.extent.duration())
            }
        } else {
            self.anchor.position
        }
    }

    pub fn state(&self, now: Instant) -> PlaybackState {
        PlaybackState {
            is_playing: self.phase.is_running(),
            predicted_position: self.position(now),
            anchor_wall_clock: self.anchor.wall_clock,
            anchor_position: self.anchor.position,
        }
    }

    /// Requests issued and not yet completed
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ------------------------------------------------------------------------
    // Track
    // ------------------------------------------------------------------------

    /// Replace the track extent; the held position is clamped into it
    pub fn set_extent(&mut self, extent: TimelineExtent, now: Instant) {
        self.extent = extent;
        if !self.phase.is_running() {
            let held = self.clamp_position(self.anchor.position);
            self.hold(held, now);
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Start (from Stopped) or resume (from Paused) playback
    pub fn request_play(&mut self, events: Vec<SequenceEvent>, now: Instant) -> Option<IssuedRequest> {
        match self.phase {
            PlaybackPhase::Stopped => {
                let mut start = self.anchor.position;
                if !self.extent.is_empty() && start >= self.extent.duration() {
                    start = 0.0;
                }

                self.epoch += 1;
                let prior_anchor = self.anchor;
                self.hold(start, now);
                self.phase = PlaybackPhase::Starting;
                log::info!("PlaybackTracker: starting at {:.3}s with {} events", start, events.len());

                Some(self.issue(
                    TransportRequest::Start {
                        events,
                        start_time: start,
                    },
                    Pending::Start {
                        epoch: self.epoch,
                        prior_phase: PlaybackPhase::Stopped,
                        prior_anchor,
                        requested_start: start,
                    },
                ))
            }
            PlaybackPhase::Paused => {
                self.epoch += 1;
                let held = self.anchor.position;
                self.phase = PlaybackPhase::Starting;
                log::info!("PlaybackTracker: resuming at {:.3}s", held);

                Some(self.issue(
                    TransportRequest::Resume,
                    Pending::Resume {
                        epoch: self.epoch,
                        held,
                    },
                ))
            }
            _ => {
                log::debug!("PlaybackTracker: play ignored in {:?}", self.phase);
                None
            }
        }
    }

    /// Pause at the current predicted position
    pub fn request_pause(&mut self, now: Instant) -> Option<IssuedRequest> {
        if !matches!(
            self.phase,
            PlaybackPhase::Playing | PlaybackPhase::Seeking | PlaybackPhase::Starting
        ) {
            return None;
        }

        let position = self.position(now);
        self.epoch += 1;
        self.scheduler.cancel_all();
        self.deferred_seek = None;
        self.phase = PlaybackPhase::Paused;
        self.hold(position, now);
        log::info!("PlaybackTracker: paused at {:.3}s", position);

        Some(self.issue(TransportRequest::Pause, Pending::Pause))
    }

    /// Stop and reset the position to 0
    ///
    /// Ticks are cancelled before this returns; no playhead tick fires afterwards.
    pub fn request_stop(&mut self, now: Instant) -> Option<IssuedRequest> {
        let was = self.phase;
        self.epoch += 1;
        self.scheduler.cancel_all();
        self.deferred_seek = None;
        self.phase = PlaybackPhase::Stopped;
        self.hold(0.0, now);

        if was == PlaybackPhase::Stopped {
            return None;
        }

        log::info!("PlaybackTracker: stopped (was {:?})", was);
        Some(self.issue(TransportRequest::Stop, Pending::Stop))
    }

    /// Move the playhead to `target` (clamped to the track)
    ///
    /// The local position changes immediately. While stopped no request is issued.
    pub fn request_seek(&mut self, target: f64, now: Instant) -> Option<IssuedRequest> {
        if target.is_nan() {
            return None;
        }
        let target = self.clamp_position(target);

        match self.phase {
            PlaybackPhase::Stopped => {
                self.hold(target, now);
                None
            }
            PlaybackPhase::Starting => {
                self.deferred_seek = Some(target);
                self.hold(target, now);
                None
            }
            PlaybackPhase::Playing | PlaybackPhase::Seeking | PlaybackPhase::Paused => {
                let prior_anchor = self.anchor;
                let prior_phase = match self.phase {
                    PlaybackPhase::Paused => PlaybackPhase::Paused,
                    _ => PlaybackPhase::Playing,
                };

                self.epoch += 1;
                self.hold(target, now);
                if prior_phase == PlaybackPhase::Playing {
                    self.phase = PlaybackPhase::Seeking;
                }
                log::debug!("PlaybackTracker: seek to {:.3}s", target);

                Some(self.issue(
                    TransportRequest::Seek { target },
                    Pending::Seek {
                        epoch: self.epoch,
                        prior_phase,
                        prior_anchor,
                    },
                ))
            }
        }
    }

    /// Drift correction query; only while playing and none already in flight
    pub fn request_resync(&mut self) -> Option<IssuedRequest> {
        if self.phase != PlaybackPhase::Playing {
            return None;
        }
        if self.pending.values().any(|p| matches!(p, Pending::Status { .. })) {
            return None;
        }
        Some(self.issue(TransportRequest::QueryStatus, Pending::Status { epoch: self.epoch }))
    }

    /// Wrap a compensating channel map in a request; empty maps issue nothing
    pub fn issue_compensation(&mut self, channels: ChannelMap) -> Option<IssuedRequest> {
        if channels.is_empty() {
            return None;
        }
        Some(self.issue(TransportRequest::Compensate(channels), Pending::Compensate))
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    /// Feed back the outcome of an issued request
    ///
    /// Returns a follow-up request (status query after start/resume/seek) when one is
    /// needed.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: TransportResult<TransportReply>,
        now: Instant,
    ) -> Option<IssuedRequest> {
        let Some(pending) = self.pending.remove(&id) else {
            log::debug!("PlaybackTracker: reply for unknown {}", id);
            return None;
        };

        match pending {
            Pending::Start {
                epoch,
                prior_phase,
                prior_anchor,
                requested_start,
            } => {
                if self.is_stale(epoch, id) {
                    return None;
                }
                match result {
                    Ok(TransportReply::Started(response)) => self.on_started(response, requested_start, now),
                    other => {
                        let error = reply_error(other);
                        self.phase = prior_phase;
                        self.anchor = prior_anchor;
                        if let Some(target) = self.deferred_seek.take() {
                            self.hold(target, now);
                        }
                        self.fail("Could not start playback", &error);
                        None
                    }
                }
            }
            Pending::Resume { epoch, held } => {
                if self.is_stale(epoch, id) {
                    return None;
                }
                match result {
                    Ok(TransportReply::Resumed) => {
                        self.phase = PlaybackPhase::Playing;
                        self.hold(held, now);
                        self.start_ticks(now);
                        log::info!("PlaybackTracker: playing (resumed at {:.3}s)", held);
                        Some(self.issue(TransportRequest::QueryStatus, Pending::Status { epoch: self.epoch }))
                    }
                    other => {
                        let error = reply_error(other);
                        self.phase = PlaybackPhase::Paused;
                        self.hold(held, now);
                        self.fail("Could not resume playback", &error);
                        None
                    }
                }
            }
            Pending::Seek {
                epoch,
                prior_phase,
                prior_anchor,
            } => {
                if self.is_stale(epoch, id) {
                    return None;
                }
                match result {
                    Ok(TransportReply::Seeked) => {
                        if prior_phase == PlaybackPhase::Playing {
                            self.phase = PlaybackPhase::Playing;
                            Some(self.issue(TransportRequest::QueryStatus, Pending::Status { epoch: self.epoch }))
                        } else {
                            None
                        }
                    }
                    other => {
                        let error = reply_error(other);
                        self.phase = prior_phase;
                        self.anchor = prior_anchor;
                        self.fail("Seek failed", &error);
                        None
                    }
                }
            }
            Pending::Status { epoch } => {
                if self.is_stale(epoch, id) {
                    return None;
                }
                match result {
                    Ok(TransportReply::Status(status)) => self.on_status(status, now),
                    other => {
                        let error = reply_error(other);
                        log::warn!("PlaybackTracker: resync unavailable ({}), keeping local anchor", error);
                    }
                }
                None
            }
            Pending::Pause => {
                if let Err(error) = result {
                    self.fail("Pause command failed", &error);
                }
                None
            }
            Pending::Stop => {
                if let Err(error) = result {
                    self.fail("Stop command failed", &error);
                }
                None
            }
            Pending::Compensate => {
                if let Err(error) = result {
                    log::warn!("PlaybackTracker: compensating command failed: {}", error);
                    self.notifications
                        .push(Notification::warning(format!("Channel reset failed: {}", error)));
                }
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------------

    /// Tick kinds due at `now`
    pub fn poll_ticks(&mut self, now: Instant) -> Vec<TickKind> {
        self.scheduler.poll(now)
    }

    /// Recompute the playhead; stops at the end of the track
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.phase.is_running() {
            return TickOutcome {
                position: self.anchor.position,
                reached_end: false,
            };
        }

        let predicted = self.anchor.predict(now);
        let duration = self.extent.duration();
        if !self.extent.is_empty() && predicted >= duration {
            self.epoch += 1;
            self.scheduler.cancel_all();
            self.deferred_seek = None;
            self.phase = PlaybackPhase::Stopped;
            self.hold(duration, now);
            log::info!("PlaybackTracker: reached end of track at {:.3}s", duration);
            return TickOutcome {
                position: duration,
                reached_end: true,
            };
        }

        TickOutcome {
            position: predicted,
            reached_end: false,
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn issue(&mut self, request: TransportRequest, pending: Pending) -> IssuedRequest {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.pending.insert(id, pending);
        log::debug!("PlaybackTracker: issued {} ({})", id, request.name());
        IssuedRequest { id, request }
    }

    fn hold(&mut self, position: f64, now: Instant) {
        self.anchor = Anchor::new(position, now);
    }

    fn clamp_position(&self, position: f64) -> f64 {
        if self.extent.is_empty() {
            if position.is_finite() {
                position.max(0.0)
            } else {
                0.0
            }
        } else {
            self.extent.clamp_time(position)
        }
    }

    fn is_stale(&self, epoch: u64, id: RequestId) -> bool {
        if epoch != self.epoch {
            log::debug!("PlaybackTracker: discarding stale reply for {}", id);
            true
        } else {
            false
        }
    }

    fn start_ticks(&mut self, now: Instant) {
        self.scheduler.schedule(TickKind::Playhead, self.intervals.playhead, now);
        self.scheduler.schedule(TickKind::Layout, self.intervals.layout, now);
        self.scheduler.schedule(TickKind::Resync, self.intervals.resync, now + self.intervals.resync);
    }

    fn on_started(&mut self, response: StartResponse, requested_start: f64, now: Instant) -> Option<IssuedRequest> {
        let start = response
            .authoritative_start_time
            .filter(|t| t.is_finite())
            .map(|t| self.clamp_position(t))
            .unwrap_or(requested_start);

        self.phase = PlaybackPhase::Playing;
        self.hold(start, now);
        self.start_ticks(now);
        log::info!("PlaybackTracker: playing from {:.3}s", start);

        if let Some(target) = self.deferred_seek.take() {
            let prior_anchor = self.anchor;
            self.epoch += 1;
            self.hold(target, now);
            self.phase = PlaybackPhase::Seeking;
            return Some(self.issue(
                TransportRequest::Seek { target },
                Pending::Seek {
                    epoch: self.epoch,
                    prior_phase: PlaybackPhase::Playing,
                    prior_anchor,
                },
            ));
        }

        Some(self.issue(TransportRequest::QueryStatus, Pending::Status { epoch: self.epoch }))
    }

    fn on_status(&mut self, status: PlaybackStatus, now: Instant) {
        if self.phase != PlaybackPhase::Playing {
            return;
        }

        let predicted = self.anchor.predict(now);
        if status.is_playing {
            if let Some(server_time) = status.current_time.filter(|t| t.is_finite()) {
                let server_time = self.clamp_position(server_time);
                log::debug!(
                    "PlaybackTracker: resync to {:.3}s (drift {:+.3}s)",
                    server_time,
                    server_time - predicted
                );
                self.hold(server_time, now);
            }
            return;
        }

        let duration = self.extent.duration();
        if !self.extent.is_empty() && predicted >= duration - END_TOLERANCE_SECONDS {
            // Next playhead tick ends playback
            self.hold(duration, now);
        } else {
            log::debug!("PlaybackTracker: transport reports not playing at {:.3}s, keeping anchor", predicted);
        }
    }

    fn fail(&mut self, context: &str, error: &TransportError) {
        log::warn!("PlaybackTracker: {}: {}", context, error);
        self.notifications
            .push(Notification::error(format!("{}: {}", context, error)));
    }
}

/// Error for a failed or mismatched reply
fn reply_error(result: TransportResult<TransportReply>) -> TransportError {
    match result {
        Err(error) => error,
        Ok(reply) => TransportError::Decode(format!("unexpected reply {:?}", reply)),
    }
}
