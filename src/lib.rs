//! Replay sorting-algorithm action traces as bar-chart frames.
//!
//! - Fetch and validate a [`TraceBundle`] through a [`TraceSource`]
//! - Drive a [`ReplayEngine`] with play / pause / reset / step / change-rate commands
//! - Observe committed frames with a [`Presenter`] that renders into a [`FrameSink`]
#![forbid(unsafe_code)]

pub mod encode;
mod foundation;
pub mod present;
pub mod render;
pub mod replay;
pub mod trace;

pub use crate::foundation::core::{Rgba8, Viewport};
pub use crate::foundation::error::{EngineError, ReplayError, ReplayResult, TraceError};

pub use crate::encode::ffmpeg::FfmpegSink;
pub use crate::encode::png::{PngSequenceSink, write_png};
pub use crate::encode::sink::{FrameMeta, FrameSink, InMemorySink, SinkConfig};
pub use crate::present::Presenter;
pub use crate::render::cpu::CpuBarRenderer;
pub use crate::render::layout::{BarGeometry, Highlight, layout_bars};
pub use crate::render::{FrameRGBA, Palette, RenderSettings};
pub use crate::replay::clock::{Clock, ManualClock, MonotonicClock};
pub use crate::replay::engine::{
    DEFAULT_INTERVAL, FrameView, NullObserver, PlaybackObserver, PlaybackState, ReplayEngine,
};
pub use crate::trace::model::{Action, SortDirection, Trace, TraceBundle, TraceRequest};
pub use crate::trace::transport::{ClientConfig, HttpTraceSource, TraceSource, decode_response};
