//! Lumen - lighting sequence editor
//!
//! Loads `~/.config/lumen/config.yaml`, opens the configured sequence from the
//! lighting server and runs the iced editor.

mod ui;

use iced::{Size, Task};

use lumen_core::config::{default_config_path, load_config, LumenConfig};
use ui::{app::Message, LumenApp};

const CONFIG_FILE: &str = "config.yaml";

fn main() -> iced::Result {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("lumen-editor starting up");

    let config_path = default_config_path(CONFIG_FILE);
    let config: LumenConfig = load_config(&config_path);
    log::info!(
        "Server {} (song {}), {} fixture(s) patched",
        config.transport.base_url,
        config.transport.song_id,
        config.fixtures.len()
    );

    // The boot closure must be Fn; it only runs once
    let config_cell = std::cell::RefCell::new(Some(config));

    iced::application(
        move || {
            let config = config_cell.borrow_mut().take().unwrap_or_default();
            let app = LumenApp::new(config);
            let startup = match app.startup_sequence() {
                Some(id) => Task::done(Message::OpenSequence(id)),
                None => Task::none(),
            };
            (app, startup)
        },
        update,
        view,
    )
    .subscription(subscription)
    .theme(theme)
    .title("Lumen Sequence Editor")
    .window_size(Size::new(1280.0, 720.0))
    .run()
}

fn update(app: &mut LumenApp, message: Message) -> Task<Message> {
    app.update(message)
}

fn view(app: &LumenApp) -> iced::Element<'_, Message> {
    app.view()
}

fn subscription(app: &LumenApp) -> iced::Subscription<Message> {
    app.subscription()
}

fn theme(app: &LumenApp) -> iced::Theme {
    app.theme()
}
