//! Legend graphics.
//!
//! Continuous styles draw a vertical colour bar, highest value at the top,
//! with a labelled tick at each breakpoint. Enumerated styles (step
//! interpolation with every stop labelled) draw one swatch per category
//! instead. Either way a `[units]` heading sits above when the style names
//! its units.

use std::sync::OnceLock;

use image::RgbaImage;
use imageproc::drawing::draw_text_mut;
use ogc_common::{Rgba, Style};
use rusttype::{point, Font, Scale};

use crate::compose::blend_pixel;

/// Embedded DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

const MARGIN: usize = 4;
const TICK_LENGTH: usize = 6;
const LABEL_GAP: usize = 2;
const FONT_SIZE: f32 = 11.0;
const BACKGROUND: Rgba = [255, 255, 255, 255];
const INK: Rgba = [0, 0, 0, 255];

fn font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(|| {
        let font = Font::try_from_bytes(FONT_DATA);
        if font.is_none() {
            tracing::warn!("Failed to load legend font, legends are drawn without text");
        }
        font
    })
    .as_ref()
}

/// Draw the legend for `style` into a `width * height` RGBA buffer.
pub fn render_legend(style: &Style, width: usize, height: usize) -> Vec<u8> {
    let mut canvas = Canvas::new(width, height);
    if width <= 2 * MARGIN || height <= 2 * MARGIN {
        return canvas.into_raw();
    }

    let mut top = MARGIN;
    if let Some(heading) = heading(style) {
        let line = canvas.line_height();
        // keep room for at least a few rows of bar
        if height > 2 * MARGIN + 2 * line {
            let x = width.saturating_sub(canvas.text_width(&heading)) / 2;
            canvas.text(x, MARGIN, &heading);
            top += line + LABEL_GAP;
        }
    }
    let area = Area {
        top,
        bottom: height - MARGIN - 1,
        left: MARGIN,
        bar_width: ((width - 2 * MARGIN) * 2 / 5).max(1),
    };

    if style.is_enumerated() {
        draw_categories(&mut canvas, style, &area);
    } else {
        draw_ramp(&mut canvas, style, &area);
    }
    canvas.into_raw()
}

/// `[units]`, prefixed by the legend title when there is one.
fn heading(style: &Style) -> Option<String> {
    let legend = style.legend();
    let units = legend.units.as_deref().map(|u| format!("[{}]", u));
    match (legend.title.as_deref(), units) {
        (Some(title), Some(units)) => Some(format!("{} {}", title, units)),
        (Some(title), None) => Some(title.to_string()),
        (None, units) => units,
    }
}

/// Drawing region below the heading.
struct Area {
    top: usize,
    bottom: usize,
    left: usize,
    bar_width: usize,
}

impl Area {
    fn right(&self) -> usize {
        self.left + self.bar_width - 1
    }
}

fn draw_ramp(canvas: &mut Canvas, style: &Style, area: &Area) {
    let (min, max) = style.value_range();
    let span = area.bottom - area.top;
    let right = area.right();

    for y in area.top..=area.bottom {
        let value = if span == 0 || max == min {
            max
        } else {
            let t = (y - area.top) as f64 / span as f64;
            max - t * (max - min)
        };
        let color = style.color_for(value);
        for x in area.left..=right {
            canvas.blend(x, y, color);
        }
    }
    canvas.rect_outline(area.left, area.top, right, area.bottom, INK);

    let tick_end = right + TICK_LENGTH;
    for bp in style.breakpoints() {
        let y = if max == min {
            area.top
        } else {
            let t = (max - bp.value) / (max - min);
            area.top + (t * span as f64).round() as usize
        };
        for x in right..=tick_end {
            canvas.put(x, y, INK);
        }
        let label = bp.label.clone().unwrap_or_else(|| tick_text(bp.value));
        canvas.text_centered_on(tick_end + LABEL_GAP, y, &label);
    }
}

/// One swatch per stop, highest value at the top.
fn draw_categories(canvas: &mut Canvas, style: &Style, area: &Area) {
    let stops = style.breakpoints();
    let row = ((area.bottom - area.top + 1) / stops.len()).max(1);
    let side = row.saturating_sub(2).clamp(1, area.bar_width);

    for (i, bp) in stops.iter().rev().enumerate() {
        let y0 = area.top + i * row;
        if y0 + side > area.bottom + 1 {
            break;
        }
        let (x0, x1, y1) = (area.left, area.left + side - 1, y0 + side - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                canvas.blend(x, y, bp.color);
            }
        }
        canvas.rect_outline(x0, y0, x1, y1, INK);
        if let Some(label) = &bp.label {
            canvas.text_centered_on(x1 + 1 + LABEL_GAP * 2, y0 + side / 2, label);
        }
    }
}

/// Stop value as printed next to its tick.
fn tick_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            image: RgbaImage::from_pixel(width as u32, height as u32, image::Rgba(BACKGROUND)),
        }
    }

    fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    fn contains(&self, x: usize, y: usize) -> bool {
        x < self.image.width() as usize && y < self.image.height() as usize
    }

    fn put(&mut self, x: usize, y: usize, color: Rgba) {
        if self.contains(x, y) {
            self.image.put_pixel(x as u32, y as u32, image::Rgba(color));
        }
    }

    fn blend(&mut self, x: usize, y: usize, color: Rgba) {
        if self.contains(x, y) {
            blend_pixel(&mut self.image.get_pixel_mut(x as u32, y as u32).0, &color);
        }
    }

    fn rect_outline(&mut self, left: usize, top: usize, right: usize, bottom: usize, color: Rgba) {
        for x in left..=right {
            self.put(x, top, color);
            self.put(x, bottom, color);
        }
        for y in top..=bottom {
            self.put(left, y, color);
            self.put(right, y, color);
        }
    }

    fn line_height(&self) -> usize {
        FONT_SIZE.ceil() as usize
    }

    fn text_width(&self, text: &str) -> usize {
        let Some(font) = font() else { return 0 };
        font.layout(text, Scale::uniform(FONT_SIZE), point(0.0, 0.0))
            .filter_map(|glyph| glyph.pixel_bounding_box())
            .map(|bb| bb.max.x.max(0) as usize)
            .max()
            .unwrap_or(0)
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Glyphs falling
    /// outside the canvas are clipped.
    fn text(&mut self, x: usize, y: usize, text: &str) {
        let Some(font) = font() else { return };
        if !self.contains(x, y) {
            return;
        }
        draw_text_mut(
            &mut self.image,
            image::Rgba(INK),
            x as i32,
            y as i32,
            Scale::uniform(FONT_SIZE),
            font,
            text,
        );
    }

    /// Draw `text` starting at `x`, vertically centred on `y` and kept
    /// inside the canvas.
    fn text_centered_on(&mut self, x: usize, y: usize, text: &str) {
        let line = self.line_height();
        let max_top = (self.image.height() as usize).saturating_sub(line);
        let top = y.saturating_sub(line / 2).min(max_top);
        self.text(x, top, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogc_common::style::{Breakpoint, Interpolation, LegendInfo};

    fn pixel(buf: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
        let o = (y * width + x) * 4;
        [buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]
    }

    /// Pixels in the box that differ from the background.
    fn inked(buf: &[u8], width: usize, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(buf, width, x, y) != BACKGROUND)
            .count()
    }

    fn blue_to_red() -> Style {
        Style::new(
            "temp",
            vec![
                Breakpoint::new(0.0, [0, 0, 255, 255]),
                Breakpoint::new(50.0, [0, 255, 0, 255]),
                Breakpoint::new(100.0, [255, 0, 0, 255]),
            ],
            Interpolation::Linear,
        )
        .unwrap()
    }

    fn land_cover() -> Style {
        let class = |value: f64, color: Rgba, label: &str| Breakpoint {
            value,
            color,
            label: Some(label.to_string()),
        };
        Style::new(
            "land_cover",
            vec![
                class(1.0, [0, 0, 255, 255], "water"),
                class(2.0, [0, 160, 0, 255], "forest"),
                class(3.0, [200, 200, 0, 255], "crops"),
            ],
            Interpolation::Step,
        )
        .unwrap()
    }

    #[test]
    fn test_legend_size_and_orientation() {
        let (w, h) = (40, 100);
        let buf = render_legend(&blue_to_red(), w, h);
        assert_eq!(buf.len(), w * h * 4);

        // inside the bar, just below the top border: max value
        let top = pixel(&buf, w, MARGIN + 2, MARGIN + 1);
        assert!(top[0] > 240 && top[2] < 15);
        let bottom = pixel(&buf, w, MARGIN + 2, h - MARGIN - 2);
        assert!(bottom[2] > 240 && bottom[0] < 15);
    }

    #[test]
    fn test_legend_has_middle_tick() {
        let (w, h) = (40, 101);
        let buf = render_legend(&blue_to_red(), w, h);
        let bar_right = MARGIN + (w - 2 * MARGIN) * 2 / 5 - 1;
        // 50 sits half way down the bar
        let y = MARGIN + (h - 2 * MARGIN - 1) / 2;
        assert_eq!(pixel(&buf, w, bar_right + TICK_LENGTH, y), INK);
    }

    #[test]
    fn test_tick_labels_are_drawn() {
        let (w, h) = (80, 120);
        let buf = render_legend(&blue_to_red(), w, h);
        let label_x = MARGIN + (w - 2 * MARGIN) * 2 / 5 + TICK_LENGTH + LABEL_GAP;
        // text right of the middle tick ("50")
        let mid = h / 2;
        assert!(inked(&buf, w, label_x..w, mid - 5..mid + 5) > 0);
        // nothing right of the bar between ticks
        assert_eq!(inked(&buf, w, label_x..w, 30..40), 0);
    }

    #[test]
    fn test_units_heading_pushes_bar_down() {
        let (w, h) = (80, 120);
        let style = blue_to_red().with_legend(LegendInfo {
            title: None,
            units: Some("degC".to_string()),
        });
        let buf = render_legend(&style, w, h);
        // heading text in the top band
        assert!(inked(&buf, w, 0..w, MARGIN..MARGIN + FONT_SIZE as usize) > 0);
        // the bar no longer starts at the margin
        assert_eq!(pixel(&buf, w, MARGIN + 2, MARGIN + 1), BACKGROUND);
    }

    #[test]
    fn test_enumerated_style_draws_swatches() {
        let (w, h) = (90, 90);
        let style = land_cover();
        assert!(style.is_enumerated());
        let buf = render_legend(&style, w, h);

        let row = (h - 2 * MARGIN) / 3;
        // top row is the highest class
        assert_eq!(pixel(&buf, w, MARGIN + 3, MARGIN + 3), [200, 200, 0, 255]);
        assert_eq!(pixel(&buf, w, MARGIN + 3, MARGIN + 2 * row + 3), [0, 0, 255, 255]);
        // labels beside the swatches
        let label_x = MARGIN + (w - 2 * MARGIN) * 2 / 5 + LABEL_GAP;
        assert!(inked(&buf, w, label_x..w, MARGIN..MARGIN + row) > 0);
    }

    #[test]
    fn test_tick_text() {
        assert_eq!(tick_text(50.0), "50");
        assert_eq!(tick_text(-2.5), "-2.5");
        assert_eq!(tick_text(0.125), "0.13");
    }

    #[test]
    fn test_tiny_legend_is_blank() {
        let buf = render_legend(&blue_to_red(), 4, 4);
        assert!(buf.chunks_exact(4).all(|p| p == BACKGROUND));
    }
}
