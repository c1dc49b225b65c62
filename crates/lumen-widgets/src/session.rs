//! Editor session: wires both surfaces to playback
//!
//! The sync bus and the playback tracker are built first and handed to the two
//! engines. The session never talks to a transport directly; every method that needs
//! one returns [`IssuedRequest`]s for the host to execute, and the host reports each
//! outcome through [`EditorSession::complete`].
//!
//! Per frame the session:
//!
//! - polls the tracker's tick scheduler
//! - on a playhead tick publishes the predicted position and advances the
//!   transition detector (exits become compensating channel commands)
//! - on a layout tick redraws dirty surfaces
//! - on a resync tick asks the transport where it really is
//! - applies pending sync messages on both surfaces

use std::rc::Rc;
use std::time::Instant;

use lumen_core::compensation::{compensating_channels, ChannelMap, ChannelResolver};
use lumen_core::config::LumenConfig;
use lumen_core::playback::{
    IssuedRequest, Notification, PlaybackPhase, PlaybackTracker, RequestId, TickKind, Transport, TransportReply,
    TransportResult,
};
use lumen_core::sequence::{EventDraft, EventId};
use lumen_core::sync::{SyncBus, SyncEndpoint, SyncMessage};
use lumen_core::transitions::{Transition, TransitionDetector};
use lumen_core::LoadedTrack;

use crate::canvas::{SurfaceGesture, SurfaceInput};
use crate::timeline::{CreateRequest, SequenceTimelineEngine};
use crate::waveform::WaveformEngine;

/// Surface width used until the canvas reports its real size
pub const INITIAL_WIDTH: f32 = 1024.0;
pub const INITIAL_TIMELINE_HEIGHT: f32 = 240.0;

pub struct EditorSession {
    bus: SyncBus,
    /// Publishes playhead positions and drains event-list revisions
    transport_endpoint: SyncEndpoint,
    tracker: PlaybackTracker,
    detector: TransitionDetector,
    resolver: Box<dyn ChannelResolver>,
    waveform: WaveformEngine,
    timeline: SequenceTimelineEngine,
    event_revision: u64,
}

impl EditorSession {
    pub fn new(config: &LumenConfig, resolver: Box<dyn ChannelResolver>) -> Self {
        let bus = SyncBus::new();
        let tracker = PlaybackTracker::new(config.refresh.intervals());
        let transport_endpoint = bus.subscribe("transport");

        let waveform = WaveformEngine::new(
            bus.subscribe("waveform"),
            config.waveform.clone(),
            config.zoom.wheel_step,
            INITIAL_WIDTH,
        );
        let timeline = SequenceTimelineEngine::new(
            bus.subscribe("timeline"),
            &config.timeline,
            config.zoom.wheel_step,
            INITIAL_WIDTH,
            INITIAL_TIMELINE_HEIGHT,
        );

        log::info!(
            "EditorSession: created with {} sync subscriber(s)",
            bus.subscriber_count()
        );

        Self {
            bus,
            transport_endpoint,
            tracker,
            detector: TransitionDetector::new(),
            resolver,
            waveform,
            timeline,
            event_revision: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    pub fn tracker(&self) -> &PlaybackTracker {
        &self.tracker
    }

    pub fn detector(&self) -> &TransitionDetector {
        &self.detector
    }

    pub fn waveform(&self) -> &WaveformEngine {
        &self.waveform
    }

    pub fn timeline(&self) -> &SequenceTimelineEngine {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut SequenceTimelineEngine {
        &mut self.timeline
    }

    /// Last event-list revision seen on the bus
    pub fn event_revision(&self) -> u64 {
        self.event_revision
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.tracker.take_notifications()
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load a track and its events on every surface
    ///
    /// A running playback is stopped first; the returned requests carry that stop.
    pub fn load(&mut self, track: LoadedTrack, drafts: Vec<EventDraft>, now: Instant) -> Vec<IssuedRequest> {
        let requests = if self.tracker.phase() == PlaybackPhase::Stopped {
            self.detector.reset();
            Vec::new()
        } else {
            self.stop(now)
        };

        let track = Rc::new(track);
        log::info!(
            "EditorSession: loading {:.2}s track ({:?} bands) with {} event(s)",
            track.extent.duration(),
            track.band_status(),
            drafts.len()
        );

        self.tracker.set_extent(track.extent, now);
        self.waveform.load_track(Rc::clone(&track));
        self.timeline.load(track.extent, drafts);
        self.publish_position(self.tracker.position(now));
        requests
    }

    /// Commit a record from the event dialog
    pub fn submit_event(&mut self, draft: EventDraft) -> EventId {
        self.timeline.on_event_submitted(draft)
    }

    // ------------------------------------------------------------------------
    // Transport commands
    // ------------------------------------------------------------------------

    pub fn play(&mut self, now: Instant) -> Option<IssuedRequest> {
        self.tracker.request_play(self.timeline.events(), now)
    }

    pub fn pause(&mut self, now: Instant) -> Option<IssuedRequest> {
        let request = self.tracker.request_pause(now);
        self.publish_position(self.tracker.position(now));
        request
    }

    /// Stop playback and reset every active event
    ///
    /// The stop command comes first, followed by one compensating command per
    /// active event that drove a patched channel.
    pub fn stop(&mut self, now: Instant) -> Vec<IssuedRequest> {
        let mut requests: Vec<IssuedRequest> = self.tracker.request_stop(now).into_iter().collect();

        let resolver = self.resolver.as_ref();
        let mut resets: Vec<ChannelMap> = Vec::new();
        self.detector
            .stop(|event| resets.push(compensating_channels(event, resolver)));
        requests.extend(self.issue_resets(resets));

        self.publish_position(self.tracker.position(now));
        requests
    }

    pub fn seek(&mut self, time: f64, now: Instant) -> Option<IssuedRequest> {
        let request = self.tracker.request_seek(time, now);
        self.publish_position(self.tracker.position(now));
        request
    }

    /// Feed back a transport outcome; may return a follow-up request
    pub fn complete(
        &mut self,
        id: RequestId,
        result: TransportResult<TransportReply>,
        now: Instant,
    ) -> Option<IssuedRequest> {
        let follow_up = self.tracker.complete(id, result, now);
        if !self.tracker.is_playing() {
            self.publish_position(self.tracker.position(now));
        }
        follow_up
    }

    /// Execute a request and its follow-ups synchronously
    pub fn execute_blocking<T: Transport + ?Sized>(&mut self, transport: &mut T, request: IssuedRequest, now: Instant) {
        let mut next = Some(request);
        while let Some(issued) = next.take() {
            let result = issued.execute(transport);
            next = self.complete(issued.id, result, now);
        }
    }

    // ------------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------------

    /// Route waveform input; the resize lands before the gesture
    pub fn waveform_input(&mut self, input: SurfaceInput, now: Instant) -> Option<IssuedRequest> {
        if let Some(size) = input.resize {
            self.waveform.resize(size.width, size.height);
        }
        input.gesture.and_then(|gesture| self.waveform_gesture(gesture, now))
    }

    /// Route timeline input; the resize lands before the gesture
    pub fn timeline_input(&mut self, input: SurfaceInput) -> Option<CreateRequest> {
        if let Some(size) = input.resize {
            self.timeline.resize(size.width, size.height);
        }
        input.gesture.and_then(|gesture| self.timeline_gesture(gesture))
    }

    /// Route a waveform gesture; a click seeks
    pub fn waveform_gesture(&mut self, gesture: SurfaceGesture, now: Instant) -> Option<IssuedRequest> {
        match gesture {
            SurfaceGesture::Wheel { notches, x } => {
                self.waveform.wheel_zoom(notches, x);
                None
            }
            SurfaceGesture::Pan { delta } => {
                self.waveform.pan(delta);
                None
            }
            SurfaceGesture::Pressed { x, .. } => {
                if self.waveform.extent().is_empty() {
                    return None;
                }
                let time = self.waveform.time_at(x);
                self.seek(time, now)
            }
            SurfaceGesture::SecondaryPressed { .. }
            | SurfaceGesture::Moved { .. }
            | SurfaceGesture::Released { .. }
            | SurfaceGesture::Cancel => None,
        }
    }

    /// Route a timeline gesture; a secondary click asks for a new event
    pub fn timeline_gesture(&mut self, gesture: SurfaceGesture) -> Option<CreateRequest> {
        match gesture {
            SurfaceGesture::Wheel { notches, x } => {
                self.timeline.wheel_zoom(notches, x);
            }
            SurfaceGesture::Pan { delta } => {
                self.timeline.pan(delta);
            }
            SurfaceGesture::Pressed { x, y } => {
                self.timeline.pointer_pressed(x, y);
            }
            SurfaceGesture::Moved { x, .. } => {
                self.timeline.pointer_moved(x);
            }
            SurfaceGesture::Released { x, .. } => {
                self.timeline.pointer_released(x);
            }
            SurfaceGesture::Cancel => {
                self.timeline.cancel_drag();
            }
            SurfaceGesture::SecondaryPressed { x, y } => return self.timeline.request_create_at(x, y),
        }
        None
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    /// Run due ticks and apply sync traffic; returns requests to execute
    pub fn frame(&mut self, now: Instant) -> Vec<IssuedRequest> {
        let mut requests = Vec::new();

        for kind in self.tracker.poll_ticks(now) {
            match kind {
                TickKind::Playhead => requests.extend(self.playhead_tick(now)),
                TickKind::Layout => self.render_dirty(),
                TickKind::Resync => requests.extend(self.tracker.request_resync()),
            }
        }

        self.sync_surfaces();

        // Without a layout tick running, edits and gestures redraw right away
        if !self.tracker.is_playing() {
            self.render_dirty();
        }

        requests
    }

    fn playhead_tick(&mut self, now: Instant) -> Vec<IssuedRequest> {
        let outcome = self.tracker.tick(now);
        self.publish_position(outcome.position);

        let resolver = self.resolver.as_ref();
        let mut resets: Vec<ChannelMap> = Vec::new();
        let transitions = if outcome.reached_end {
            self.detector
                .stop(|event| resets.push(compensating_channels(event, resolver)))
        } else {
            self.detector.update(outcome.position, self.timeline.sequence().iter(), |event| {
                resets.push(compensating_channels(event, resolver))
            })
        };

        if !transitions.is_empty() {
            let exits = transitions
                .iter()
                .filter(|t| matches!(t, Transition::Exit(_)))
                .count();
            log::debug!(
                "EditorSession: {} transition(s) at {:.3}s ({} exit)",
                transitions.len(),
                outcome.position,
                exits
            );
        }

        self.issue_resets(resets)
    }

    fn issue_resets(&mut self, resets: Vec<ChannelMap>) -> Vec<IssuedRequest> {
        resets
            .into_iter()
            .filter_map(|channels| self.tracker.issue_compensation(channels))
            .collect()
    }

    fn publish_position(&self, position: f64) {
        self.transport_endpoint
            .broadcast(SyncMessage::PositionChanged { position });
    }

    fn sync_surfaces(&mut self) {
        self.waveform.sync();
        self.timeline.sync();

        for message in self.transport_endpoint.drain() {
            if let SyncMessage::EventListChanged { revision } = message {
                self.event_revision = revision;
            }
        }
    }

    fn render_dirty(&mut self) {
        if self.waveform.is_dirty() {
            self.waveform.render();
        }
        if self.timeline.is_dirty() {
            self.timeline.render();
        }
    }

    /// Release both surfaces
    pub fn dispose(&mut self) {
        if self.tracker.phase() != PlaybackPhase::Stopped {
            log::info!("EditorSession: disposing while {:?}", self.tracker.phase());
        }
        self.detector.reset();
        self.waveform.dispose();
        self.timeline.dispose();
    }
}
