use crate::{
    foundation::core::Viewport,
    trace::model::{Action, ActionKind},
};

pub const CHART_PADDING: f64 = 40.0;
pub const BAR_SPACING: f64 = 2.0;

/// How a bar is highlighted in the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Highlight {
    None,
    Compare,
    Swap,
    Set,
}

impl Highlight {
    /// Highlight of `index` under `action`. Only the action's own positions are highlighted.
    pub fn for_index(action: Option<&Action>, index: usize) -> Self {
        match action {
            Some(a) if a.positions().contains(index) => match a.kind() {
                ActionKind::Compare => Self::Compare,
                ActionKind::Swap => Self::Swap,
                ActionKind::Set => Self::Set,
            },
            _ => Self::None,
        }
    }
}

/// Placement of one bar in viewport pixels. `y` is the top edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarGeometry {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub highlight: Highlight,
}

/// Plot area inside the padding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ChartArea {
    pub fn for_viewport(viewport: Viewport) -> Self {
        let w = f64::from(viewport.width);
        let h = f64::from(viewport.height);
        // Shrink padding on tiny surfaces so the plot never collapses.
        let pad = CHART_PADDING.min(w / 4.0).min(h / 4.0);
        Self {
            left: pad,
            top: pad,
            width: (w - 2.0 * pad).max(0.0),
            height: (h - 2.0 * pad).max(0.0),
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Lay out one bar per array cell.
///
/// Heights scale against `fixed_max` (the original input's maximum), never the live array, so
/// the chart keeps the same scale for the whole playback. Heights are clamped to the plot area.
pub fn layout_bars(
    values: &[f64],
    action: Option<&Action>,
    fixed_max: f64,
    viewport: Viewport,
) -> Vec<BarGeometry> {
    if values.is_empty() {
        return Vec::new();
    }

    let area = ChartArea::for_viewport(viewport);
    let n = values.len() as f64;
    let bar_width = ((area.width - (n - 1.0) * BAR_SPACING) / n).max(0.0);
    let scale_ok = fixed_max.is_finite() && fixed_max > 0.0;

    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let height = if scale_ok && value.is_finite() {
                ((value / fixed_max) * area.height).clamp(0.0, area.height)
            } else {
                0.0
            };
            BarGeometry {
                index,
                x: area.left + index as f64 * (bar_width + BAR_SPACING),
                y: area.bottom() - height,
                width: bar_width,
                height,
                highlight: Highlight::for_index(action, index),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(w: u32, h: u32) -> Viewport {
        Viewport::new(w, h).unwrap()
    }

    #[test]
    fn heights_scale_against_fixed_max() {
        let bars = layout_bars(&[5.0, 10.0], None, 10.0, vp(200, 200));
        // 200 - 2*40 = 120px plot height.
        assert_eq!(bars[0].height, 60.0);
        assert_eq!(bars[1].height, 120.0);
        assert_eq!(bars[1].y, 40.0);
        assert_eq!(bars[0].y + bars[0].height, 160.0);
    }

    #[test]
    fn values_above_fixed_max_are_clamped() {
        let bars = layout_bars(&[30.0], None, 10.0, vp(200, 200));
        assert_eq!(bars[0].height, 120.0);
    }

    #[test]
    fn bars_tile_the_plot_width() {
        let bars = layout_bars(&[1.0; 4], None, 1.0, vp(200, 200));
        // (120 - 3*2) / 4
        assert_eq!(bars[0].width, 28.5);
        assert_eq!(bars[0].x, 40.0);
        let last = bars[3];
        assert!((last.x + last.width - 160.0).abs() < 1e-9);
    }

    #[test]
    fn only_current_action_positions_are_highlighted() {
        let bars = layout_bars(&[1.0, 2.0, 3.0], Some(&Action::Swap(0, 2)), 3.0, vp(100, 100));
        let kinds: Vec<_> = bars.iter().map(|b| b.highlight).collect();
        assert_eq!(kinds, vec![Highlight::Swap, Highlight::None, Highlight::Swap]);

        let bars = layout_bars(
            &[1.0, 2.0, 3.0],
            Some(&Action::Set {
                index: 1,
                value: 2.0,
            }),
            3.0,
            vp(100, 100),
        );
        assert_eq!(bars[1].highlight, Highlight::Set);
        assert_eq!(bars[0].highlight, Highlight::None);
    }

    #[test]
    fn degenerate_scale_draws_flat_bars() {
        for max in [0.0, -1.0, f64::NAN] {
            let bars = layout_bars(&[1.0, 2.0], None, max, vp(100, 100));
            assert!(bars.iter().all(|b| b.height == 0.0));
        }
    }

    #[test]
    fn tiny_viewport_keeps_positive_plot() {
        let area = ChartArea::for_viewport(vp(8, 8));
        assert_eq!(area.left, 2.0);
        assert_eq!(area.height, 4.0);
    }
}
