// Library interface for jurai-cli, shared by the binary and integration tests.

pub mod app;
pub mod render;

pub use app::{load_context, run_screening};
pub use render::{render_event, render_report};
