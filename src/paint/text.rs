//! Places styled runs on a surface.
//!
//! Canvas-style text drawing has no notion of inline spans, so a run that must
//! continue on the same baseline as the previous one is placed in two steps:
//! paint and measure run N, then pass its width as the leading offset of run
//! N+1. Only the first line of the continuation is shifted; wrapped lines go
//! back to the left margin.

use resvg::render;
use tiny_skia::{FilterQuality, PixmapPaint, Transform};
use tracing::{debug, warn};

use super::font::FontBook;
use super::surface::Surface;
use crate::card::StyledText;
use crate::template::TemplateImage;

/// Extra vertical space between lines, on top of the font size.
pub const LINE_GAP_PX: f32 = 15.0;

pub fn line_pitch(font_size: f32) -> f32 {
    font_size + LINE_GAP_PX
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Result of one paint call. `width` is `None` when nothing could be painted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaintedRun {
    pub lines: Vec<PlacedLine>,
    pub width: Option<f32>,
}

/// Splits on newlines and stacks the lines so the last one sits on `y`.
pub fn stack_upward(text: &StyledText) -> Vec<PlacedLine> {
    let lines: Vec<&str> = text.text.split('\n').collect();
    let pitch = line_pitch(text.font_size);
    let above = lines.len().saturating_sub(1) as f32 * pitch;
    lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| PlacedLine {
            text: line.to_string(),
            x: text.x,
            y: text.y - above + idx as f32 * pitch,
        })
        .collect()
}

/// Splits on newlines; the first line sits on `y` shifted right by
/// `leading_offset`, the rest follow below it at `x`.
pub fn flow_downward(text: &StyledText, leading_offset: f32) -> Vec<PlacedLine> {
    let pitch = line_pitch(text.font_size);
    text.text
        .split('\n')
        .enumerate()
        .map(|(idx, line)| PlacedLine {
            text: line.to_string(),
            x: if idx == 0 {
                text.x + leading_offset
            } else {
                text.x
            },
            y: text.y + idx as f32 * pitch,
        })
        .collect()
}

/// Stretches the template over the whole surface. Returns `false` when the
/// surface is not allocated.
pub fn draw_background(surface: &mut Surface, template: &TemplateImage) -> bool {
    let Some(pixmap) = surface.pixmap_mut() else {
        return false;
    };
    let scale_x = pixmap.width() as f32 / template.width() as f32;
    let scale_y = pixmap.height() as f32 / template.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        template.pixmap().as_ref(),
        &paint,
        Transform::from_scale(scale_x, scale_y),
        None,
    );
    true
}

pub fn draw_single_style_text(
    surface: &mut Surface,
    fonts: &mut FontBook,
    text: &StyledText,
) -> PaintedRun {
    paint_lines(surface, fonts, text, stack_upward(text))
}

pub fn draw_continuation_text(
    surface: &mut Surface,
    fonts: &mut FontBook,
    text: &StyledText,
    leading_offset: f32,
) -> PaintedRun {
    paint_lines(surface, fonts, text, flow_downward(text, leading_offset))
}

fn paint_lines(
    surface: &mut Surface,
    fonts: &mut FontBook,
    text: &StyledText,
    lines: Vec<PlacedLine>,
) -> PaintedRun {
    let Some(pixmap) = surface.pixmap_mut() else {
        debug!("surface not allocated; skipped {:?}", text.text);
        return PaintedRun::default();
    };
    let families = fonts.family_list(&text.font_family, text.weight);
    let svg = run_svg(pixmap.width(), pixmap.height(), text, &families, &lines);
    let options = usvg::Options {
        font_family: text.font_family.clone(),
        fontdb: fonts.database(),
        ..usvg::Options::default()
    };
    let tree = match usvg::Tree::from_str(&svg, &options) {
        Ok(tree) => tree,
        Err(err) => {
            warn!("failed to lay out {:?}: {}", text.text, err);
            return PaintedRun::default();
        }
    };
    render(&tree, Transform::identity(), &mut pixmap.as_mut());

    let width = lines
        .iter()
        .map(|line| fonts.measure(&line.text, text.font_size, &text.font_family, text.weight))
        .fold(0.0, f32::max);
    PaintedRun {
        lines,
        width: Some(width),
    }
}

/// `families` is a ready CSS `font-family` list.
pub(crate) fn run_svg(
    width: u32,
    height: u32,
    text: &StyledText,
    families: &str,
    lines: &[PlacedLine],
) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    for line in lines {
        svg.push('\n');
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="{weight}" font-style="{style}" fill="{fill}" text-anchor="{anchor}" dominant-baseline="{baseline}" xml:space="preserve">{text}</text>"#,
            x = line.x,
            y = line.y,
            family = escape_xml(families),
            size = text.font_size,
            weight = if text.weight.is_bold() { "bold" } else { "normal" },
            style = if text.weight.is_italic() { "italic" } else { "normal" },
            fill = text.color.to_hex(),
            anchor = text.align.svg_anchor(),
            baseline = text.baseline.svg_baseline(),
            text = escape_xml(&line.text)
        ));
    }
    svg.push_str("\n</svg>");
    svg
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
