use crate::{
    foundation::error::ReplayResult, render::FrameRGBA, replay::engine::PlaybackState,
};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    /// Output frames-per-second for sinks that produce video.
    pub fps: u32,
    /// Straight RGBA8 background used when flattening alpha.
    pub bg_rgba: [u8; 4],
}

/// Where a frame sits in the replay timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameMeta {
    /// Sequence number of the frame within this sink, starting at 0.
    pub seq: u64,
    /// Engine position the frame was rendered at.
    pub position: usize,
    pub state: PlaybackState,
}

/// Consumer of rendered frames.
///
/// Ordering contract: `push_frame` is called in commit order, with strictly increasing `seq`.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReplayResult<()>;
    fn push_frame(&mut self, meta: FrameMeta, frame: &FrameRGBA) -> ReplayResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ReplayResult<()>;

    /// Whether every frame must match the size given to [`FrameSink::begin`].
    fn fixed_frame_size(&self) -> bool {
        false
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameMeta, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameMeta, FrameRGBA)] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReplayResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, meta: FrameMeta, frame: &FrameRGBA) -> ReplayResult<()> {
        self.frames.push((meta, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReplayResult<()> {
        self.ended = true;
        Ok(())
    }
}
