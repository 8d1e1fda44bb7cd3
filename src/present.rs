use crate::{
    encode::sink::{FrameMeta, FrameSink, SinkConfig},
    foundation::{
        core::Viewport,
        error::{ReplayError, ReplayResult},
    },
    render::{RenderSettings, cpu::CpuBarRenderer},
    replay::engine::{FrameView, PlaybackObserver},
};

pub const DEFAULT_FPS: u32 = 30;

/// Engine observer that renders every committed frame into a [`FrameSink`].
///
/// The sink is started lazily on the first frame, with the viewport current at that moment.
pub struct Presenter<S: FrameSink> {
    renderer: CpuBarRenderer,
    sink: S,
    fps: u32,
    started: bool,
    seq: u64,
}

impl<S: FrameSink> Presenter<S> {
    pub fn new(settings: RenderSettings, sink: S) -> ReplayResult<Self> {
        Ok(Self {
            renderer: CpuBarRenderer::new(settings)?,
            sink,
            fps: DEFAULT_FPS,
            started: false,
            seq: 0,
        })
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Change the output surface. Follow with [`ReplayEngine::refresh`] to redraw.
    ///
    /// Fails once a fixed-size sink (such as [`FfmpegSink`]) has started at a different size.
    ///
    /// [`ReplayEngine::refresh`]: crate::ReplayEngine::refresh
    /// [`FfmpegSink`]: crate::FfmpegSink
    pub fn resize(&mut self, viewport: Viewport) -> ReplayResult<()> {
        let current = self.renderer.viewport();
        if self.started && self.sink.fixed_frame_size() && viewport != current {
            return Err(ReplayError::validation(format!(
                "sink started at {}x{} cannot take {}x{} frames",
                current.width, current.height, viewport.width, viewport.height
            )));
        }
        tracing::debug!(?viewport, "presenter resized");
        self.renderer.set_viewport(viewport)
    }

    pub fn viewport(&self) -> Viewport {
        self.renderer.viewport()
    }

    pub fn frames_presented(&self) -> u64 {
        self.seq
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// End the sink (if it was started) and hand it back.
    pub fn finish(mut self) -> ReplayResult<S> {
        if self.started {
            self.sink.end()?;
        }
        Ok(self.sink)
    }
}

impl<S: FrameSink> PlaybackObserver for Presenter<S> {
    fn on_commit(&mut self, view: &FrameView<'_>) -> ReplayResult<()> {
        if !self.started {
            let vp = self.renderer.viewport();
            self.sink.begin(SinkConfig {
                width: vp.width,
                height: vp.height,
                fps: self.fps,
                bg_rgba: self.renderer.settings().palette.background.to_array(),
            })?;
            self.started = true;
        }

        let frame = self.renderer.render_view(view)?;
        let meta = FrameMeta {
            seq: self.seq,
            position: view.position,
            state: view.state,
        };
        self.sink.push_frame(meta, &frame)?;
        self.seq += 1;
        Ok(())
    }
}
