//! Frame annotation overlays.
//!
//! Draws a hollow rectangle in the class color and the resolved label text
//! near the box's top-left corner. Purely a visual mutation of the frame
//! buffer; drawing never fails and out-of-bounds shapes are clipped by the
//! drawing primitives.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detect::Detection;

/// Label text color, independent of the box color.
const COLOR_TEXT: Rgb<u8> = Rgb([0, 255, 0]);

/// Boxes whose top edge is within this many pixels of the frame top get their
/// label below the corner instead of above it.
const TOP_EDGE_MARGIN: u32 = 20;

const LABEL_OFFSET_ABOVE: i32 = -10;
const LABEL_OFFSET_BELOW: i32 = 20;

const RECT_THICKNESS: i32 = 2;
const TEXT_SCALE: f32 = 16.0;

/// Draws detection overlays onto frame buffers.
///
/// When no usable system font is found the rectangle is still drawn and the
/// label is skipped; annotation must never fail the pipeline.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self { font: load_font() }
    }

    /// Annotator that never draws text. Keeps tests deterministic across
    /// hosts with different font installations.
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw one detection onto the frame.
    pub fn draw(&self, frame: &mut RgbImage, detection: &Detection) {
        let bbox = detection.bbox;
        let color = detection.class.color();

        for i in 0..RECT_THICKNESS {
            let rect = Rect::at(bbox.x as i32 - i, bbox.y as i32 - i)
                .of_size(bbox.w + 2 * i as u32, bbox.h + 2 * i as u32);
            draw_hollow_rect_mut(frame, rect, color);
        }

        if let Some(font) = &self.font {
            let text_y = if bbox.y > TOP_EDGE_MARGIN {
                bbox.y as i32 + LABEL_OFFSET_ABOVE - TEXT_SCALE as i32 / 2
            } else {
                bbox.y as i32 + LABEL_OFFSET_BELOW
            };
            draw_text_mut(
                frame,
                COLOR_TEXT,
                bbox.x as i32,
                text_y.max(0),
                PxScale::from(TEXT_SCALE),
                font,
                &detection.label,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font() -> Option<FontVec> {
    // Common font paths; annotation degrades to box-only when none exist.
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in &font_paths {
        if let Ok(font_data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(font_data) {
                return Some(font);
            }
        }
    }
    None
}
