//! Replay engine: explicit playback state machine over an action trace.

pub mod clock;
pub mod engine;
pub mod timer;
