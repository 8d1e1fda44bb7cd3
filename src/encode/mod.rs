//! Frame sinks consume rendered frames in commit order.

/// `ffmpeg`-based MP4 output via the system binary.
pub mod ffmpeg;
/// PNG file output.
pub mod png;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
