//! User interface for the lumen editor

pub mod app;
pub mod dialog;
pub mod transport;

pub use app::LumenApp;
