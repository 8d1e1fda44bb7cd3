//! Frame renderer: array snapshot + current action → RGBA8 bar chart.

pub mod cpu;
pub mod layout;

use crate::{
    foundation::core::{Rgba8, Viewport},
    render::layout::Highlight,
};

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Raw RGBA8 bytes at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Two-stop vertical gradient, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BarFill {
    pub top: Rgba8,
    pub bottom: Rgba8,
}

/// Colors used by the bar renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Rgba8,
    pub grid: Rgba8,
    pub outline: Rgba8,
    pub default: BarFill,
    pub compare: BarFill,
    pub swap: BarFill,
    pub set: BarFill,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba8::rgb(0x0d, 0x11, 0x17),
            grid: Rgba8::rgb(0x21, 0x26, 0x2d),
            outline: Rgba8::rgb(0x30, 0x36, 0x3d),
            default: BarFill {
                top: Rgba8::rgb(0x58, 0xa6, 0xff),
                bottom: Rgba8::rgb(0x1f, 0x6f, 0xeb),
            },
            compare: BarFill {
                top: Rgba8::rgb(0xf8, 0x51, 0x49),
                bottom: Rgba8::rgb(0xda, 0x36, 0x33),
            },
            swap: BarFill {
                top: Rgba8::rgb(0xfb, 0x85, 0x00),
                bottom: Rgba8::rgb(0xd2, 0x99, 0x22),
            },
            set: BarFill {
                top: Rgba8::rgb(0xa8, 0x55, 0xf7),
                bottom: Rgba8::rgb(0x7c, 0x3a, 0xed),
            },
        }
    }
}

impl Palette {
    pub fn fill_for(&self, highlight: Highlight) -> BarFill {
        match highlight {
            Highlight::None => self.default,
            Highlight::Compare => self.compare,
            Highlight::Swap => self.swap,
            Highlight::Set => self.set,
        }
    }
}

/// Renderer configuration, loadable from JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub viewport: Viewport,
    pub palette: Palette,
}

impl RenderSettings {
    pub fn validate(&self) -> crate::ReplayResult<()> {
        self.viewport.validate()
    }
}
