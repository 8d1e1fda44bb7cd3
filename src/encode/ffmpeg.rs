use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    encode::sink::{FrameMeta, FrameSink, SinkConfig},
    foundation::error::{ReplayError, ReplayResult},
    render::FrameRGBA,
};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub(crate) fn ensure_dir(dir: &Path) -> ReplayResult<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    Ok(())
}

fn validate_config(cfg: &SinkConfig) -> ReplayResult<()> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(ReplayError::validation(
            "encode width/height must be non-zero",
        ));
    }
    if cfg.fps == 0 {
        return Err(ReplayError::validation("encode fps must be non-zero"));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        // yuv420p output needs even dimensions.
        return Err(ReplayError::validation(
            "encode width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    Ok(())
}

struct Running {
    cfg: SinkConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

/// Pipes raw frames into the system `ffmpeg` and produces an H.264 MP4.
pub struct FfmpegSink {
    out_path: PathBuf,
    overwrite: bool,
    running: Option<Running>,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite,
            running: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }
}

impl FrameSink for FfmpegSink {
    fn fixed_frame_size(&self) -> bool {
        true
    }

    fn begin(&mut self, cfg: SinkConfig) -> ReplayResult<()> {
        validate_config(&cfg)?;
        if self.running.is_some() {
            return Err(ReplayError::encode("ffmpeg sink already started"));
        }
        if let Some(parent) = self.out_path.parent() {
            ensure_dir(parent)?;
        }
        if !self.overwrite && self.out_path.exists() {
            return Err(ReplayError::validation(format!(
                "output file '{}' already exists",
                self.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReplayError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ReplayError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReplayError::encode("failed to open ffmpeg stdin"))?;

        tracing::debug!(out = %self.out_path.display(), ?cfg, "ffmpeg started");
        self.running = Some(Running {
            scratch: vec![0u8; cfg.width as usize * cfg.height as usize * 4],
            cfg,
            child,
            stdin: Some(stdin),
        });
        Ok(())
    }

    fn push_frame(&mut self, _meta: FrameMeta, frame: &FrameRGBA) -> ReplayResult<()> {
        let Some(run) = self.running.as_mut() else {
            return Err(ReplayError::encode("ffmpeg sink was not started"));
        };
        if frame.width != run.cfg.width || frame.height != run.cfg.height {
            return Err(ReplayError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, run.cfg.width, run.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(
            &mut run.scratch,
            &frame.data,
            frame.premultiplied,
            run.cfg.bg_rgba,
        )?;

        let Some(stdin) = run.stdin.as_mut() else {
            return Err(ReplayError::encode("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&run.scratch).map_err(|e| {
            ReplayError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> ReplayResult<()> {
        let Some(mut run) = self.running.take() else {
            return Ok(());
        };
        drop(run.stdin.take());

        let output = run.child.wait_with_output().map_err(|e| {
            ReplayError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReplayError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        tracing::info!(out = %self.out_path.display(), "mp4 written");
        Ok(())
    }
}

/// Composite RGBA8 over an opaque background, producing alpha = 255 everywhere.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> ReplayResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReplayError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let [bg_r, bg_g, bg_b, _] = bg_rgba.map(u16::from);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255 - a;
        let over = |c: u8, bg: u16| -> u8 {
            let c = u16::from(c);
            let fg = if src_is_premul { c } else { mul_div255(c, a) };
            (fg + mul_div255(bg, inv)).min(255) as u8
        };
        d[0] = over(s[0], bg_r);
        d[1] = over(s[1], bg_g);
        d[2] = over(s[2], bg_b);
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}
