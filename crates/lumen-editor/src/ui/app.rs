//! Main application state and message routing
//!
//! The editor session is single-threaded; only the blocking transport calls leave
//! the UI thread (via `spawn_blocking`). Their results come back as
//! `Message::TransportDone` and are fed to the session in arrival order.

use std::time::{Duration, Instant};

use iced::widget::{column, container, text};
use iced::{time, Element, Length, Subscription, Task, Theme};

use lumen_core::config::LumenConfig;
use lumen_core::playback::{
    HttpTransport, IssuedRequest, Notification, RequestId, SequenceDocument, TransportError, TransportReply,
    TransportResult,
};
use lumen_core::sequence::DeviceId;
use lumen_widgets::{timeline_view, waveform_view, CreateRequest, EditorSession, SurfaceInput};

use super::dialog::{self, DialogMessage};
use super::transport;

/// Application messages
#[derive(Debug, Clone)]
pub enum Message {
    /// Refresh subscription
    Tick(Instant),

    // Loading
    OpenSequence(u64),
    SequenceLoaded(Result<SequenceDocument, TransportError>),
    Save,
    /// Save finished for the edits up to `revision`
    SequenceSaved {
        revision: u64,
        result: Result<u64, TransportError>,
    },

    // Surfaces
    Waveform(SurfaceInput),
    Timeline(SurfaceInput),

    // Transport bar
    Play,
    Pause,
    Stop,
    ToggleLayout,
    DeleteSelected,

    Dialog(DialogMessage),

    /// A transport request finished on the blocking pool
    TransportDone(RequestId, TransportResult<TransportReply>),
}

pub struct LumenApp {
    config: LumenConfig,
    session: EditorSession,
    transport: HttpTransport,
    sequence_id: Option<u64>,
    sequence_name: Option<String>,
    /// Event list revision last stored on the server
    saved_revision: u64,
    saving: bool,
    pending_create: Option<CreateRequest>,
    status: Option<Notification>,
}

impl LumenApp {
    pub fn new(config: LumenConfig) -> Self {
        let session = EditorSession::new(&config, Box::new(config.fixture_patch()));
        let transport = HttpTransport::new(
            config.transport.base_url.clone(),
            config.transport.song_id,
            config.transport.timeout(),
        );
        Self {
            config,
            session,
            transport,
            sequence_id: None,
            sequence_name: None,
            saved_revision: 0,
            saving: false,
            pending_create: None,
            status: None,
        }
    }

    /// Sequence to open once the window is up
    pub fn startup_sequence(&self) -> Option<u64> {
        self.config.transport.sequence_id
    }

    fn revision(&self) -> u64 {
        self.session.timeline().sequence().revision()
    }

    /// Whether the event list changed since the last load or save
    pub fn has_unsaved_changes(&self) -> bool {
        self.revision() != self.saved_revision
    }

    /// Device for events created on a row with no device (single-row layout)
    fn fallback_device(&self) -> DeviceId {
        self.config
            .fixtures
            .first()
            .map(|fixture| fixture.device_id)
            .unwrap_or(DeviceId(1))
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        let now = Instant::now();
        match message {
            Message::Tick(_) => {
                let requests = self.session.frame(now);
                self.collect_notifications();
                self.execute_all(requests)
            }

            Message::OpenSequence(id) => {
                log::info!("Opening sequence {}", id);
                let transport = self.transport.clone();
                Task::perform(
                    async move {
                        tokio::task::spawn_blocking(move || transport.fetch_sequence(id))
                            .await
                            .unwrap_or_else(|e| Err(TransportError::Request(e.to_string())))
                    },
                    Message::SequenceLoaded,
                )
            }
            Message::SequenceLoaded(Ok(document)) => {
                self.transport.set_song_id(document.song_id);
                let track = document
                    .song
                    .as_ref()
                    .map(|song| song.to_track())
                    .unwrap_or_default();
                let drafts = document.drafts();
                self.sequence_id = Some(document.id);
                self.sequence_name = Some(document.name.clone());
                let requests = self.session.load(track, drafts, now);
                self.saved_revision = self.revision();
                self.execute_all(requests)
            }
            Message::SequenceLoaded(Err(error)) => {
                log::warn!("Could not load sequence: {}", error);
                self.status = Some(Notification::error(format!("Could not load sequence: {}", error)));
                Task::none()
            }

            Message::Save => {
                if self.saving {
                    return Task::none();
                }
                self.saving = true;
                let revision = self.revision();
                let id = self.sequence_id;
                let name = self
                    .sequence_name
                    .clone()
                    .unwrap_or_else(|| String::from("Untitled"));
                let events = self.session.timeline().events();
                let transport = self.transport.clone();
                log::info!("Saving {} events (revision {})", events.len(), revision);
                Task::perform(
                    async move {
                        tokio::task::spawn_blocking(move || transport.save_sequence(id, &name, &events))
                            .await
                            .unwrap_or_else(|e| Err(TransportError::Request(e.to_string())))
                    },
                    move |result| Message::SequenceSaved { revision, result },
                )
            }
            Message::SequenceSaved { revision, result } => {
                self.saving = false;
                match result {
                    Ok(id) => {
                        self.sequence_id = Some(id);
                        self.saved_revision = revision;
                        self.status = Some(Notification::info(format!("Saved sequence {}", id)));
                    }
                    Err(error) => {
                        log::warn!("Could not save sequence: {}", error);
                        self.status = Some(Notification::error(format!("Could not save sequence: {}", error)));
                    }
                }
                Task::none()
            }

            Message::Waveform(input) => match self.session.waveform_input(input, now) {
                Some(request) => self.execute(request),
                None => Task::none(),
            },
            Message::Timeline(input) => {
                if let Some(request) = self.session.timeline_input(input) {
                    self.pending_create = Some(request);
                }
                Task::none()
            }

            Message::Play => {
                let request = self.session.play(now);
                self.execute_maybe(request)
            }
            Message::Pause => {
                let request = self.session.pause(now);
                self.execute_maybe(request)
            }
            Message::Stop => {
                let requests = self.session.stop(now);
                self.execute_all(requests)
            }
            Message::ToggleLayout => {
                let mode = self.session.timeline_mut().toggle_layout_mode();
                log::debug!("Timeline layout: {:?}", mode);
                Task::none()
            }
            Message::DeleteSelected => {
                if let Some(removed) = self.session.timeline_mut().remove_selected() {
                    log::info!("Removed {}", removed.id);
                }
                Task::none()
            }

            Message::Dialog(DialogMessage::Create(kind)) => {
                if let Some(request) = self.pending_create.take() {
                    let draft = dialog::draft_for(request, kind, self.fallback_device());
                    let id = self.session.submit_event(draft);
                    log::info!("Created {} ({}) at {:.3}s", id, kind.label(), request.time);
                }
                Task::none()
            }
            Message::Dialog(DialogMessage::Cancel) => {
                self.pending_create = None;
                Task::none()
            }

            Message::TransportDone(id, result) => {
                let follow_up = self.session.complete(id, result, now);
                self.collect_notifications();
                self.execute_maybe(follow_up)
            }
        }
    }

    fn collect_notifications(&mut self) {
        if let Some(last) = self.session.take_notifications().pop() {
            self.status = Some(last);
        }
    }

    fn execute_maybe(&self, request: Option<IssuedRequest>) -> Task<Message> {
        match request {
            Some(request) => self.execute(request),
            None => Task::none(),
        }
    }

    fn execute_all(&self, requests: Vec<IssuedRequest>) -> Task<Message> {
        Task::batch(requests.into_iter().map(|request| self.execute(request)))
    }

    /// Run one request on the blocking pool
    fn execute(&self, issued: IssuedRequest) -> Task<Message> {
        let mut transport = self.transport.clone();
        let id = issued.id;
        Task::perform(
            async move {
                tokio::task::spawn_blocking(move || issued.execute(&mut transport))
                    .await
                    .unwrap_or_else(|e| Err(TransportError::Request(e.to_string())))
            },
            move |result| Message::TransportDone(id, result),
        )
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let interval = self.session.tracker().intervals().playhead;
        time::every(interval.max(Duration::from_millis(8))).map(Message::Tick)
    }

    pub fn view(&self) -> Element<'_, Message> {
        let tracker = self.session.tracker();
        let header = transport::view(
            tracker.phase(),
            tracker.position(Instant::now()),
            tracker.extent().duration(),
            self.session.timeline().layout_mode(),
            self.has_unsaved_changes() && !self.saving,
            self.status.as_ref(),
        );

        let title = text(self.sequence_name.as_deref().unwrap_or("No sequence loaded")).size(16);

        let mut content = column![
            title,
            header,
            waveform_view(self.session.waveform(), Message::Waveform),
        ]
        .spacing(8);

        if let Some(request) = self.pending_create {
            content = content.push(dialog::view(request, self.fallback_device()));
        }

        content = content.push(timeline_view(self.session.timeline(), Message::Timeline));

        container(content)
            .padding(10)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl Drop for LumenApp {
    fn drop(&mut self) {
        self.session.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::sequence::{EventDraft, EventPayload};

    fn app() -> LumenApp {
        LumenApp::new(LumenConfig::default())
    }

    fn strobe_at(time: f64) -> EventDraft {
        EventDraft::new(time, DeviceId(1), EventPayload::Strobe { rate: 128 })
    }

    #[test]
    fn test_edits_are_unsaved_until_save_completes() {
        let mut app = app();
        assert!(!app.has_unsaved_changes());

        app.session.submit_event(strobe_at(1.0));
        assert!(app.has_unsaved_changes());

        let revision = app.revision();
        let _ = app.update(Message::SequenceSaved {
            revision,
            result: Ok(42),
        });

        assert!(!app.has_unsaved_changes());
        assert_eq!(app.sequence_id, Some(42));
        assert!(!app.saving);
    }

    #[test]
    fn test_edit_during_save_stays_unsaved() {
        let mut app = app();
        app.session.submit_event(strobe_at(1.0));
        let revision = app.revision();
        app.session.submit_event(strobe_at(2.0));

        let _ = app.update(Message::SequenceSaved {
            revision,
            result: Ok(3),
        });

        assert!(app.has_unsaved_changes());
    }

    #[test]
    fn test_failed_save_keeps_changes_and_reports() {
        let mut app = app();
        app.session.submit_event(strobe_at(1.0));
        let revision = app.revision();

        let _ = app.update(Message::SequenceSaved {
            revision,
            result: Err(TransportError::Rejected("Sequence not found".to_string())),
        });

        assert!(app.has_unsaved_changes());
        assert_eq!(app.sequence_id, None);
        assert!(app
            .status
            .as_ref()
            .is_some_and(|n| n.message.contains("Sequence not found")));
    }
}
