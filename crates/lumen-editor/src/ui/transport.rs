//! Transport bar: play/pause/stop, position readout and the last notification

use iced::widget::{button, row, text, Space};
use iced::{Alignment, Color, Element, Length};

use lumen_core::playback::{Notification, PlaybackPhase, Severity};
use lumen_widgets::LayoutMode;

use super::app::Message;

/// `m:ss.mmm`
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_millis = (seconds * 1000.0).round() as u64;
    let minutes = total_millis / 60_000;
    let secs = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;
    format!("{}:{:02}.{:03}", minutes, secs, millis)
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::from_rgb(0.7, 0.7, 0.75),
        Severity::Warning => Color::from_rgb(0.95, 0.75, 0.3),
        Severity::Error => Color::from_rgb(0.95, 0.4, 0.4),
    }
}

pub fn view<'a>(
    phase: PlaybackPhase,
    position: f64,
    duration: f64,
    layout: LayoutMode,
    unsaved: bool,
    status: Option<&'a Notification>,
) -> Element<'a, Message> {
    let play_label = if phase == PlaybackPhase::Paused { "Resume" } else { "Play" };
    let play = button(text(play_label)).on_press_maybe(
        matches!(phase, PlaybackPhase::Stopped | PlaybackPhase::Paused).then_some(Message::Play),
    );
    let pause = button(text("Pause")).on_press_maybe(phase.is_running().then_some(Message::Pause));
    let stop = button(text("Stop")).on_press_maybe((phase != PlaybackPhase::Stopped).then_some(Message::Stop));

    let layout_label = match layout {
        LayoutMode::Grouped => "Single row",
        LayoutMode::Single => "By device",
    };

    let mut bar = row![
        play,
        pause,
        stop,
        text(format!("{} / {}", format_time(position), format_time(duration))).size(14),
        button(text(layout_label)).on_press(Message::ToggleLayout),
        button(text("Delete")).on_press(Message::DeleteSelected),
        button(text(if unsaved { "Save*" } else { "Save" })).on_press_maybe(unsaved.then_some(Message::Save)),
        Space::new().width(Length::Fill),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    if let Some(notification) = status {
        bar = bar.push(
            text(notification.message.as_str())
                .size(13)
                .color(severity_color(notification.severity)),
        );
    }

    bar.into()
}
