//! New-event dialog
//!
//! Opened by a right-click on the timeline background. Picking a kind submits an
//! event with that kind's default payload at the clicked time.

use iced::widget::{button, container, row, text};
use iced::{Alignment, Element};

use lumen_core::sequence::{DeviceId, EventDraft, EventKind, EventPayload};
use lumen_widgets::CreateRequest;

use super::app::Message;
use super::transport::format_time;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogMessage {
    Create(EventKind),
    Cancel,
}

/// Record submitted for `request`; rows without a device use `fallback`
pub fn draft_for(request: CreateRequest, kind: EventKind, fallback: DeviceId) -> EventDraft {
    EventDraft::new(
        request.time,
        request.device.unwrap_or(fallback),
        EventPayload::default_for(kind),
    )
}

pub fn view<'a>(request: CreateRequest, fallback: DeviceId) -> Element<'a, Message> {
    let device = request.device.unwrap_or(fallback);
    let mut content = row![text(format!("New event at {} on {}", format_time(request.time), device)).size(14)]
        .spacing(8)
        .align_y(Alignment::Center);

    for kind in EventKind::ALL {
        content = content.push(button(text(kind.label())).on_press(Message::Dialog(DialogMessage::Create(kind))));
    }
    content = content.push(button(text("Cancel")).on_press(Message::Dialog(DialogMessage::Cancel)));

    container(content).padding(6).into()
}
