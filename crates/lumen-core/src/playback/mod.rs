//! Playback: transport commands, position prediction and refresh scheduling

mod http;
mod notification;
mod scheduler;
mod tracker;
mod transport;

pub use http::{HttpTransport, SequenceDocument, SongInfo, WaveformData};
pub use notification::{Notification, Severity};
pub use scheduler::{CancellationToken, TickKind, TickScheduler};
pub use tracker::{Anchor, PlaybackPhase, PlaybackState, PlaybackTracker, TickIntervals, TickOutcome};
pub use transport::{
    IssuedRequest, PlaybackStatus, RequestId, StartResponse, Transport, TransportError, TransportReply,
    TransportRequest, TransportResult,
};
