mod core;

pub use core::{failure_text, Agent, LogSink};
