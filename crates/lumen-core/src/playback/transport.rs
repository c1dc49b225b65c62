//! Transport interface
//!
//! The transport is the server process that plays the audio and drives the lighting
//! hardware. The client only issues commands to it and samples its clock.
//!
//! Commands are plain values ([`TransportRequest`]) tagged with a [`RequestId`]. The
//! host executes them however it likes (blocking call, worker thread, async task) and
//! reports the outcome back to the [`PlaybackTracker`](super::PlaybackTracker).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compensation::ChannelMap;
use crate::sequence::SequenceEvent;

// ============================================================================
// Errors
// ============================================================================

/// Errors from transport commands
///
/// None of these are fatal: the tracker reverts or keeps its state and surfaces a
/// notification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connection, DNS or timeout failure
    #[error("Transport request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("Transport returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered but refused the command
    #[error("Transport rejected command: {0}")]
    Rejected(String),

    /// Response body could not be decoded
    #[error("Failed to decode transport response: {0}")]
    Decode(String),

    /// No transport endpoint configured
    #[error("Transport is not configured")]
    NotConfigured,
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

// ============================================================================
// Wire types
// ============================================================================

/// Reply to `start_playback`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    /// Position the server actually started from, when it reports one
    #[serde(default, alias = "start_time", skip_serializing_if = "Option::is_none")]
    pub authoritative_start_time: Option<f64>,
}

/// Reply to `query_playback_status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub total_time: Option<f64>,
}

/// Commands the core issues to the transport
pub trait Transport {
    fn start_playback(&mut self, events: &[SequenceEvent], start_time: f64) -> TransportResult<StartResponse>;

    fn pause_playback(&mut self) -> TransportResult<()>;

    fn resume_playback(&mut self) -> TransportResult<()>;

    fn stop_playback(&mut self) -> TransportResult<()>;

    fn seek_playback(&mut self, target_time: f64) -> TransportResult<()>;

    /// Best effort; callers fall back to their local anchor on error
    fn query_playback_status(&mut self) -> TransportResult<PlaybackStatus>;

    fn apply_compensating_command(&mut self, channels: &ChannelMap) -> TransportResult<()>;
}

// ============================================================================
// Requests
// ============================================================================

/// Identifies one issued request so late replies can be matched or discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// A transport command as a value
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRequest {
    Start { events: Vec<SequenceEvent>, start_time: f64 },
    Pause,
    Resume,
    Stop,
    Seek { target: f64 },
    QueryStatus,
    Compensate(ChannelMap),
}

/// Successful outcome of a [`TransportRequest`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportReply {
    Started(StartResponse),
    Paused,
    Resumed,
    Stopped,
    Seeked,
    Status(PlaybackStatus),
    Compensated,
}

impl TransportRequest {
    pub fn name(&self) -> &'static str {
        match self {
            TransportRequest::Start { .. } => "start",
            TransportRequest::Pause => "pause",
            TransportRequest::Resume => "resume",
            TransportRequest::Stop => "stop",
            TransportRequest::Seek { .. } => "seek",
            TransportRequest::QueryStatus => "status",
            TransportRequest::Compensate(_) => "compensate",
        }
    }

    /// Run the command against a transport
    pub fn execute<T: Transport + ?Sized>(&self, transport: &mut T) -> TransportResult<TransportReply> {
        match self {
            TransportRequest::Start { events, start_time } => transport
                .start_playback(events, *start_time)
                .map(TransportReply::Started),
            TransportRequest::Pause => transport.pause_playback().map(|_| TransportReply::Paused),
            TransportRequest::Resume => transport.resume_playback().map(|_| TransportReply::Resumed),
            TransportRequest::Stop => transport.stop_playback().map(|_| TransportReply::Stopped),
            TransportRequest::Seek { target } => transport.seek_playback(*target).map(|_| TransportReply::Seeked),
            TransportRequest::QueryStatus => transport.query_playback_status().map(TransportReply::Status),
            TransportRequest::Compensate(channels) => transport
                .apply_compensating_command(channels)
                .map(|_| TransportReply::Compensated),
        }
    }
}

/// A request handed to the host for execution
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedRequest {
    pub id: RequestId,
    pub request: TransportRequest,
}

impl IssuedRequest {
    pub fn execute<T: Transport + ?Sized>(&self, transport: &mut T) -> TransportResult<TransportReply> {
        log::debug!("Executing {} ({})", self.id, self.request.name());
        self.request.execute(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decodes_minimal_body() {
        let status: PlaybackStatus = serde_json::from_str(r#"{"is_playing": false}"#).unwrap();
        assert_eq!(status, PlaybackStatus::default());
    }

    #[test]
    fn test_status_decodes_full_body() {
        let status: PlaybackStatus =
            serde_json::from_str(r#"{"is_playing": true, "current_time": 12.5, "total_time": 180.0}"#).unwrap();
        assert!(status.is_playing);
        assert_eq!(status.current_time, Some(12.5));
    }

    #[test]
    fn test_start_response_accepts_server_field_name() {
        let response: StartResponse = serde_json::from_str(r#"{"success": true, "start_time": 4.0}"#).unwrap();
        assert_eq!(response.authoritative_start_time, Some(4.0));
    }
}
