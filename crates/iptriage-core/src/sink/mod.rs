// # Verdict Sink Implementations
//
// - `LogSink`: one tracing event per verdict (the daemon's output)
// - `ChannelSink`: bounded channel for embedding applications

pub mod channel;
pub mod log;

pub use channel::ChannelSink;
pub use log::LogSink;
