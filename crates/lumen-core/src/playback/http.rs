//! HTTP transport for the lighting server
//!
//! Blocking JSON calls over `ureq`. Hosts with a UI thread run these on a worker
//! (see the editor's `spawn_blocking` wrapper); [`HttpTransport`] is cheap to clone.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::{PlaybackStatus, StartResponse, Transport, TransportError, TransportResult};
use crate::compensation::ChannelMap;
use crate::sequence::{EventDraft, SequenceEvent};
use crate::track::{grid_from_bpm, GridMarker, LoadedTrack, SampleSeries};

// ============================================================================
// Sequence documents
// ============================================================================

/// Waveform payload stored with a song: band object or a bare amplitude list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WaveformData {
    Series(SampleSeries),
    Amplitude(Vec<f32>),
}

impl WaveformData {
    pub fn into_series(self) -> SampleSeries {
        match self {
            WaveformData::Series(series) => series,
            WaveformData::Amplitude(amplitude) => SampleSeries::amplitude_only(amplitude),
        }
    }
}

/// Song metadata attached to a stored sequence
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongInfo {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub waveform_data: Option<WaveformData>,
    #[serde(default)]
    pub grid: Vec<GridMarker>,
}

impl SongInfo {
    /// Build the renderer-side track from the stored analysis
    pub fn to_track(&self) -> LoadedTrack {
        let samples = self
            .waveform_data
            .clone()
            .map(WaveformData::into_series)
            .unwrap_or_default();
        let track = LoadedTrack::load(samples, self.duration);

        let grid = if !self.grid.is_empty() {
            self.grid.clone()
        } else {
            self.bpm
                .map(|bpm| grid_from_bpm(bpm, self.duration))
                .unwrap_or_default()
        };
        track.with_grid(grid)
    }
}

/// A stored sequence as returned by `GET /api/get-sequence/<id>`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SequenceDocument {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub song_id: u64,
    #[serde(default)]
    pub events: Vec<Value>,
    pub song: Option<SongInfo>,
}

impl SequenceDocument {
    /// Decode stored events, skipping records that do not parse
    pub fn drafts(&self) -> Vec<EventDraft> {
        self.events
            .iter()
            .filter_map(|raw| match serde_json::from_value::<EventDraft>(raw.clone()) {
                Ok(draft) => Some(draft),
                Err(e) => {
                    log::warn!("SequenceDocument {}: skipping malformed event: {}", self.id, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct SequenceEnvelope {
    sequence: SequenceDocument,
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Serialize)]
struct PlayBody<'a> {
    song_id: u64,
    events: &'a [SequenceEvent],
    start_time: f64,
}

/// `POST /api/save-sequence`; no `id` creates a new sequence
#[derive(Serialize)]
struct SaveBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    song_id: u64,
    name: &'a str,
    events: &'a [SequenceEvent],
}

#[derive(Deserialize)]
struct SaveResponse {
    sequence_id: u64,
}

#[derive(Serialize)]
struct SeekBody {
    position: f64,
}

#[derive(Serialize)]
struct ChannelsBody {
    channels: BTreeMap<String, u8>,
}

// ============================================================================
// Response decoding
// ============================================================================

/// Parse a JSON body, mapping `{"error": ...}` and `{"success": false}` to rejections
fn decode_body(body: &str) -> TransportResult<Value> {
    let value: Value = serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    if let Some(error) = value.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(TransportError::Rejected(message));
    }
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(TransportError::Rejected("server reported failure".to_string()));
    }
    Ok(value)
}

fn decode_as<T: for<'de> Deserialize<'de>>(body: &str) -> TransportResult<T> {
    let value = decode_body(body)?;
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Error message carried by a non-2xx response body, if any
fn status_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

// ============================================================================
// Transport
// ============================================================================

/// JSON API client for one song on the lighting server
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    song_id: u64,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("song_id", &self.song_id)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, song_id: u64, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::info!("HttpTransport: {} (song {})", base_url, song_id);
        Self {
            agent,
            base_url,
            song_id,
        }
    }

    pub fn song_id(&self) -> u64 {
        self.song_id
    }

    pub fn set_song_id(&mut self, song_id: u64) {
        self.song_id = song_id;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read(result: Result<ureq::Response, ureq::Error>) -> TransportResult<String> {
        match result {
            Ok(response) => response
                .into_string()
                .map_err(|e| TransportError::Request(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(TransportError::Status {
                    status,
                    message: status_message(&body),
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(TransportError::Request(transport.to_string())),
        }
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> TransportResult<String> {
        let payload = serde_json::to_string(body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Self::read(
            self.agent
                .post(&self.url(path))
                .set("Content-Type", "application/json")
                .send_string(&payload),
        )
    }

    fn post_empty(&self, path: &str) -> TransportResult<String> {
        self.post(path, &serde_json::json!({}))
    }

    fn get(&self, path: &str) -> TransportResult<String> {
        Self::read(self.agent.get(&self.url(path)).call())
    }

    /// Fetch a stored sequence with its song and waveform
    pub fn fetch_sequence(&self, sequence_id: u64) -> TransportResult<SequenceDocument> {
        let body = self.get(&format!("/api/get-sequence/{}", sequence_id))?;
        let envelope: SequenceEnvelope = decode_as(&body)?;
        log::info!(
            "fetch_sequence: {} '{}' with {} events",
            envelope.sequence.id,
            envelope.sequence.name,
            envelope.sequence.events.len()
        );
        Ok(envelope.sequence)
    }

    /// Store `events` under `name` for the current song
    ///
    /// Updates sequence `id` when given, otherwise creates one. Returns the
    /// stored sequence's id.
    pub fn save_sequence(&self, id: Option<u64>, name: &str, events: &[SequenceEvent]) -> TransportResult<u64> {
        if name.trim().is_empty() {
            return Err(TransportError::Rejected("sequence name is required".to_string()));
        }
        let body = self.post(
            "/api/save-sequence",
            &SaveBody {
                id,
                song_id: self.song_id,
                name,
                events,
            },
        )?;
        let response: SaveResponse = decode_as(&body)?;
        log::info!(
            "save_sequence: {} '{}' with {} events",
            response.sequence_id,
            name,
            events.len()
        );
        Ok(response.sequence_id)
    }
}

impl Transport for HttpTransport {
    fn start_playback(&mut self, events: &[SequenceEvent], start_time: f64) -> TransportResult<StartResponse> {
        let body = self.post(
            "/api/play-sequence",
            &PlayBody {
                song_id: self.song_id,
                events,
                start_time,
            },
        )?;
        decode_as(&body)
    }

    fn pause_playback(&mut self) -> TransportResult<()> {
        decode_body(&self.post_empty("/api/pause-sequence")?).map(|_| ())
    }

    fn resume_playback(&mut self) -> TransportResult<()> {
        decode_body(&self.post_empty("/api/resume-sequence")?).map(|_| ())
    }

    fn stop_playback(&mut self) -> TransportResult<()> {
        decode_body(&self.post_empty("/api/stop-sequence")?).map(|_| ())
    }

    fn seek_playback(&mut self, target_time: f64) -> TransportResult<()> {
        let body = self.post("/api/seek-sequence", &SeekBody { position: target_time })?;
        decode_body(&body).map(|_| ())
    }

    fn query_playback_status(&mut self) -> TransportResult<PlaybackStatus> {
        decode_as(&self.get("/api/playback-status")?)
    }

    fn apply_compensating_command(&mut self, channels: &ChannelMap) -> TransportResult<()> {
        let body = ChannelsBody {
            channels: channels
                .iter()
                .map(|(address, value)| (address.to_string(), *value))
                .collect(),
        };
        decode_body(&self.post("/api/set-dmx-channels", &body)?).map(|_| ())
    }
}
