//! Compensating channel commands
//!
//! When an event leaves its active window the device it drove has to be returned to
//! rest. The channel roles of each patched fixture come from the patching
//! collaborator through [`ChannelResolver`]; this module turns an exited event into
//! the `{address → value}` map handed to the transport.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::sequence::{DeviceId, EventKind, SequenceEvent};

/// Lowest addressable DMX channel
pub const FIRST_ADDRESS: u16 = 1;

/// Highest addressable DMX channel (one universe)
pub const LAST_ADDRESS: u16 = 512;

/// Value written to every compensated channel
pub const REST_VALUE: u8 = 0;

/// Channel address → value
pub type ChannelMap = BTreeMap<u16, u8>;

/// What a fixture channel controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    #[serde(rename = "dimmer_channel")]
    Dimmer,
    #[serde(rename = "red_channel")]
    Red,
    #[serde(rename = "green_channel")]
    Green,
    #[serde(rename = "blue_channel")]
    Blue,
    #[serde(rename = "white_channel")]
    White,
    #[serde(rename = "pan_channel")]
    Pan,
    #[serde(rename = "tilt_channel")]
    Tilt,
    #[serde(rename = "strobe_channel")]
    Strobe,
    #[serde(other)]
    Other,
}

impl ChannelRole {
    /// Whether an event of `kind` drives this channel
    pub fn driven_by(&self, kind: EventKind) -> bool {
        matches!(
            (kind, self),
            (EventKind::Dimmer, ChannelRole::Dimmer)
                | (
                    EventKind::Color,
                    ChannelRole::Red | ChannelRole::Green | ChannelRole::Blue | ChannelRole::White
                )
                | (EventKind::Position, ChannelRole::Pan | ChannelRole::Tilt)
                | (EventKind::Strobe, ChannelRole::Strobe)
        )
    }
}

/// A patched fixture: consecutive channels starting at `start_address`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureLayout {
    pub start_address: u16,
    pub channels: Vec<ChannelRole>,
}

impl FixtureLayout {
    /// `(address, role)` pairs for every channel of the fixture
    pub fn addressed(&self) -> impl Iterator<Item = (u32, ChannelRole)> + '_ {
        self.channels
            .iter()
            .enumerate()
            .map(move |(index, role)| (self.start_address as u32 + index as u32, *role))
    }
}

/// Patch lookup provided by the device patching collaborator
pub trait ChannelResolver {
    fn fixture(&self, device: DeviceId) -> Option<FixtureLayout>;
}

impl ChannelResolver for HashMap<DeviceId, FixtureLayout> {
    fn fixture(&self, device: DeviceId) -> Option<FixtureLayout> {
        self.get(&device).cloned()
    }
}

/// Channel map that returns whatever `event` drove to rest
///
/// Unpatched devices yield an empty map. Addresses outside the universe are dropped.
pub fn compensating_channels(event: &SequenceEvent, resolver: &dyn ChannelResolver) -> ChannelMap {
    let Some(fixture) = resolver.fixture(event.device_id) else {
        log::debug!("compensating_channels: {} is not patched", event.device_id);
        return ChannelMap::new();
    };

    let kind = event.kind();
    fixture
        .addressed()
        .filter(|(_, role)| role.driven_by(kind))
        .filter_map(|(address, _)| {
            let address = u16::try_from(address).ok()?;
            (FIRST_ADDRESS..=LAST_ADDRESS)
                .contains(&address)
                .then_some((address, REST_VALUE))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{EventId, EventPayload, Rgbw};

    fn rgbw_dimmer_fixture(start_address: u16) -> FixtureLayout {
        FixtureLayout {
            start_address,
            channels: vec![
                ChannelRole::Dimmer,
                ChannelRole::Red,
                ChannelRole::Green,
                ChannelRole::Blue,
                ChannelRole::White,
            ],
        }
    }

    fn event_for(device: u32, payload: EventPayload) -> SequenceEvent {
        SequenceEvent {
            id: EventId(1),
            time: 0.0,
            duration_seconds: 1.0,
            device_id: DeviceId(device),
            payload,
        }
    }

    #[test]
    fn test_dimmer_event_zeroes_dimmer_only() {
        let mut patch = HashMap::new();
        patch.insert(DeviceId(1), rgbw_dimmer_fixture(10));

        let map = compensating_channels(&event_for(1, EventPayload::Dimmer { value: 80.0 }), &patch);

        assert_eq!(map, ChannelMap::from([(10, 0)]));
    }

    #[test]
    fn test_color_event_zeroes_color_channels() {
        let mut patch = HashMap::new();
        patch.insert(DeviceId(1), rgbw_dimmer_fixture(10));

        let color = EventPayload::Color { color: Rgbw { r: 1, g: 2, b: 3, w: 4 } };
        let map = compensating_channels(&event_for(1, color), &patch);

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![11, 12, 13, 14]);
        assert!(map.values().all(|v| *v == 0));
    }

    #[test]
    fn test_unpatched_device_yields_nothing() {
        let patch: HashMap<DeviceId, FixtureLayout> = HashMap::new();
        let map = compensating_channels(&event_for(9, EventPayload::Strobe { rate: 3 }), &patch);
        assert!(map.is_empty());
    }

    #[test]
    fn test_addresses_past_universe_dropped() {
        let mut patch = HashMap::new();
        patch.insert(DeviceId(1), rgbw_dimmer_fixture(510));

        let color = EventPayload::Color { color: Rgbw::default() };
        let map = compensating_channels(&event_for(1, color), &patch);

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![511, 512]);
    }

    #[test]
    fn test_roles_deserialize_from_patch_names() {
        let roles: Vec<ChannelRole> =
            serde_json::from_str(r#"["dimmer_channel", "pan_channel", "gobo_channel"]"#).unwrap();
        assert_eq!(roles, vec![ChannelRole::Dimmer, ChannelRole::Pan, ChannelRole::Other]);
    }
}
