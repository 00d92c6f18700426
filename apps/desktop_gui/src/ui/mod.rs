//! UI layer for the desktop shell: app frame and the status bar widget.

pub mod app;
pub mod status_bar;

pub use app::DesktopGuiApp;
