mod font;
mod surface;
mod text;

pub use font::{FontBook, FontMetrics, ResolvedFace, measure_text_width_px};
pub use surface::Surface;
pub use text::{
    LINE_GAP_PX, PaintedRun, PlacedLine, draw_background, draw_continuation_text,
    draw_single_style_text, flow_downward, line_pitch, stack_upward,
};
