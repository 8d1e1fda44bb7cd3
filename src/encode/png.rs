use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    encode::{
        ffmpeg::{ensure_dir, flatten_to_opaque_rgba8},
        sink::{FrameMeta, FrameSink, SinkConfig},
    },
    foundation::error::{ReplayError, ReplayResult},
    render::FrameRGBA,
};

/// Write a single frame as an opaque PNG.
pub fn write_png(path: &Path, frame: &FrameRGBA, bg_rgba: [u8; 4]) -> ReplayResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut flat = vec![0u8; frame.data.len()];
    flatten_to_opaque_rgba8(&mut flat, &frame.data, frame.premultiplied, bg_rgba)?;
    image::save_buffer_with_format(
        path,
        &flat,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    bg_rgba: [u8; 4],
    written: Vec<PathBuf>,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            bg_rgba: [0, 0, 0, 255],
            written: Vec::new(),
        }
    }

    pub fn frame_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("frame_{seq:06}.png"))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReplayResult<()> {
        ensure_dir(&self.dir)?;
        self.bg_rgba = cfg.bg_rgba;
        self.written.clear();
        Ok(())
    }

    fn push_frame(&mut self, meta: FrameMeta, frame: &FrameRGBA) -> ReplayResult<()> {
        let path = self.frame_path(meta.seq);
        write_png(&path, frame, self.bg_rgba)
            .map_err(|e| ReplayError::encode(format!("frame {}: {e}", meta.seq)))?;
        tracing::trace!(path = %path.display(), position = meta.position, "wrote frame");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> ReplayResult<()> {
        tracing::info!(
            frames = self.written.len(),
            dir = %self.dir.display(),
            "png sequence complete"
        );
        Ok(())
    }
}
