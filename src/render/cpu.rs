use vello_cpu::{
    Pixmap, RenderContext,
    kurbo::{BezPath, Point, Rect, RoundedRect, RoundedRectRadii, Shape as _, Stroke},
    peniko::{Color, Gradient},
};

use crate::{
    foundation::{
        core::{Rgba8, Viewport},
        error::{ReplayError, ReplayResult},
    },
    render::{
        FrameRGBA, RenderSettings,
        layout::{BarGeometry, ChartArea, layout_bars},
    },
    replay::engine::FrameView,
    trace::model::Action,
};

const BAR_CORNER_RADIUS: f64 = 4.0;
const GRID_LINES: u32 = 4;
const PATH_TOLERANCE: f64 = 0.1;

/// CPU bar-chart rasterizer powered by `vello_cpu`.
///
/// Stateless apart from its settings: every call renders a full frame from the snapshot it is
/// given.
#[derive(Clone, Debug)]
pub struct CpuBarRenderer {
    settings: RenderSettings,
}

impl CpuBarRenderer {
    pub fn new(settings: RenderSettings) -> ReplayResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn viewport(&self) -> Viewport {
        self.settings.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> ReplayResult<()> {
        viewport.validate()?;
        self.settings.viewport = viewport;
        Ok(())
    }

    pub fn render_view(&self, view: &FrameView<'_>) -> ReplayResult<FrameRGBA> {
        self.render(view.array, view.action, view.fixed_max)
    }

    /// Draw one frame: background, bars highlighted by `action`, then the dashed grid.
    pub fn render(
        &self,
        values: &[f64],
        action: Option<&Action>,
        fixed_max: f64,
    ) -> ReplayResult<FrameRGBA> {
        let vp = self.settings.viewport;
        let width: u16 = vp
            .width
            .try_into()
            .map_err(|_| ReplayError::render("surface width exceeds u16"))?;
        let height: u16 = vp
            .height
            .try_into()
            .map_err(|_| ReplayError::render("surface height exceeds u16"))?;

        let palette = &self.settings.palette;
        let mut ctx = RenderContext::new(width, height);

        ctx.set_paint(to_color(palette.background));
        ctx.fill_rect(&Rect::new(0.0, 0.0, f64::from(width), f64::from(height)));

        let bars = layout_bars(values, action, fixed_max, vp);
        for bar in &bars {
            draw_bar(&mut ctx, bar, &self.settings);
        }
        if !bars.is_empty() {
            draw_grid(&mut ctx, ChartArea::for_viewport(vp), palette.grid);
        }

        ctx.flush();
        let mut pixmap = Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: vp.width,
            height: vp.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn draw_bar(ctx: &mut RenderContext, bar: &BarGeometry, settings: &RenderSettings) {
    if bar.width <= 0.0 || bar.height <= 0.0 {
        return;
    }

    let rect = Rect::new(bar.x, bar.y, bar.x + bar.width, bar.y + bar.height);
    let r = BAR_CORNER_RADIUS.min(bar.width / 2.0).min(bar.height);
    let shape = RoundedRect::from_rect(rect, RoundedRectRadii::new(r, r, 0.0, 0.0))
        .to_path(PATH_TOLERANCE);

    let fill = settings.palette.fill_for(bar.highlight);
    if bar.height >= 1.0 {
        let gradient = Gradient::new_linear(
            Point::new(bar.x, bar.y),
            Point::new(bar.x, bar.y + bar.height),
        )
        .with_stops([to_color(fill.top), to_color(fill.bottom)]);
        ctx.set_paint(gradient);
    } else {
        ctx.set_paint(to_color(fill.top));
    }
    ctx.fill_path(&shape);

    ctx.set_paint(to_color(settings.palette.outline));
    ctx.set_stroke(Stroke::new(1.0));
    ctx.stroke_path(&shape);
}

fn draw_grid(ctx: &mut RenderContext, area: ChartArea, color: Rgba8) {
    ctx.set_paint(to_color(color));
    ctx.set_stroke(Stroke::new(1.0).with_dashes(0.0, [2.0, 2.0]));
    for i in 1..=GRID_LINES {
        let y = area.bottom() - area.height / f64::from(GRID_LINES) * f64::from(i);
        let mut line = BezPath::new();
        line.move_to(Point::new(area.left, y));
        line.line_to(Point::new(area.right(), y));
        ctx.stroke_path(&line);
    }
}

fn to_color(c: Rgba8) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_viewport_is_rejected_up_front() {
        let settings = RenderSettings {
            viewport: Viewport {
                width: 100_000,
                height: 10,
            },
            ..RenderSettings::default()
        };
        assert!(CpuBarRenderer::new(settings).is_err());
    }

    #[test]
    fn empty_array_renders_background_only() {
        let r = CpuBarRenderer::new(RenderSettings {
            viewport: Viewport::new(32, 16).unwrap(),
            ..RenderSettings::default()
        })
        .unwrap();
        let frame = r.render(&[], None, 0.0).unwrap();
        assert_eq!(frame.data.len(), 32 * 16 * 4);
        let bg = r.settings().palette.background.premultiplied();
        assert!(frame.data.chunks_exact(4).all(|px| px == bg));
    }
}
