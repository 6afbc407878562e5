//! Drawing detection boxes and captions onto an image.
//!
//! Boxes are drawn as 4 px outlines growing right/down from each edge, in
//! a colour picked by class id. The caption sits on a filled band of the
//! same colour directly above the box's top-left corner.

use detectq_core::detection::{Detection, PixelRect};
use detectq_core::labels::LabelSet;
use image::{Rgb, RgbImage};

use crate::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Outline thickness of detection boxes, in pixels.
pub const BOX_THICKNESS: i32 = 4;

/// Padding around caption text inside its band.
const LABEL_PADDING: i32 = 1;

/// Height of the caption band.
pub const LABEL_HEIGHT: i32 = GLYPH_HEIGHT + 2 * LABEL_PADDING;

const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Class colours, cycled by class id.
const PALETTE: [Rgb<u8>; 16] = [
    Rgb([240, 248, 255]), // aliceblue
    Rgb([255, 0, 0]),     // red
    Rgb([0, 255, 0]),     // lime
    Rgb([0, 0, 255]),     // blue
    Rgb([255, 255, 0]),   // yellow
    Rgb([0, 255, 255]),   // cyan
    Rgb([255, 0, 255]),   // magenta
    Rgb([255, 165, 0]),   // orange
    Rgb([127, 255, 212]), // aquamarine
    Rgb([255, 105, 180]), // hotpink
    Rgb([173, 255, 47]),  // greenyellow
    Rgb([135, 206, 235]), // skyblue
    Rgb([255, 215, 0]),   // gold
    Rgb([250, 128, 114]), // salmon
    Rgb([152, 251, 152]), // palegreen
    Rgb([238, 130, 238]), // violet
];

/// What was drawn for one retained detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub class_id: u32,
    pub label: String,
    pub score: f32,
    pub rect: PixelRect,
    pub color: [u8; 3],
}

/// Colour used for `class_id`.
pub fn class_color(class_id: u32) -> Rgb<u8> {
    PALETTE[class_id as usize % PALETTE.len()]
}

/// Caption text, e.g. `person (95%)`.
pub fn caption(label: &str, score: f32) -> String {
    format!("{label} ({:.0}%)", score * 100.0)
}

/// Draw every detection onto `image` and report what was drawn.
///
/// `detections` should already be filtered by confidence; all of them are
/// drawn.
pub fn annotate(image: &mut RgbImage, detections: &[Detection], labels: &LabelSet) -> Vec<Annotation> {
    let (width, height) = image.dimensions();

    detections
        .iter()
        .map(|detection| {
            let rect = detection.bbox.to_pixels(width, height);
            let color = class_color(detection.class_id);
            let label = labels.label_for(detection.class_id).into_owned();

            draw_box(image, rect, color);
            draw_label(image, (rect.x1, rect.y1), &caption(&label, detection.score), color);

            Annotation {
                class_id: detection.class_id,
                label,
                score: detection.score,
                rect,
                color: color.0,
            }
        })
        .collect()
}

/// Draw a [`BOX_THICKNESS`] px rectangle outline. Clipped to the image.
pub fn draw_box(image: &mut RgbImage, rect: PixelRect, color: Rgb<u8>) {
    for i in 0..BOX_THICKNESS {
        hline(image, rect.x1, rect.x2, rect.y1 + i, color);
        hline(image, rect.x1, rect.x2, rect.y2 + i, color);
        vline(image, rect.x1 + i, rect.y1, rect.y2, color);
        vline(image, rect.x2 + i, rect.y1, rect.y2, color);
    }
}

/// Draw `text` on a filled band whose bottom-left corner is `point`.
///
/// When the band would leave the top of the image it is moved down to
/// start at row 0.
pub fn draw_label(image: &mut RgbImage, point: (i32, i32), text: &str, color: Rgb<u8>) {
    let (x, y) = point;
    let top = (y - LABEL_HEIGHT).max(0);
    let right = x + font::text_width(text) + 2 * LABEL_PADDING - 1;

    fill_rect(image, x, top, right, top + LABEL_HEIGHT - 1, color);
    draw_text(image, x + LABEL_PADDING, top + LABEL_PADDING, text, TEXT_COLOR);
}

fn draw_text(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    for ch in text.chars() {
        if let Some(rows) = font::glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        put(image, x + col, y + row as i32, color);
                    }
                }
            }
        }
        x += ADVANCE;
    }
}

fn hline(image: &mut RgbImage, x1: i32, x2: i32, y: i32, color: Rgb<u8>) {
    for x in x1..=x2 {
        put(image, x, y, color);
    }
}

fn vline(image: &mut RgbImage, x: i32, y1: i32, y2: i32, color: Rgb<u8>) {
    for y in y1..=y2 {
        put(image, x, y, color);
    }
}

fn fill_rect(image: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    for y in y1..=y2 {
        hline(image, x1, x2, y, color);
    }
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use detectq_core::detection::NormalizedBox;

    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn labels() -> LabelSet {
        LabelSet::parse("???\nperson\nbicycle\ncar")
    }

    fn person_at(bbox: NormalizedBox, score: f32) -> Detection {
        Detection {
            bbox,
            class_id: 1,
            score,
        }
    }

    #[test]
    fn single_detection_draws_box_at_scaled_corners() {
        let mut image = RgbImage::new(640, 480);
        let drawn = annotate(
            &mut image,
            &[person_at(NormalizedBox::new(0.1, 0.1, 0.5, 0.5), 0.95)],
            &labels(),
        );

        assert_eq!(drawn.len(), 1);
        assert_eq!(
            drawn[0].rect,
            PixelRect {
                x1: 64,
                y1: 48,
                x2: 320,
                y2: 240
            }
        );
        assert_eq!(drawn[0].label, "person");

        let color = class_color(1);
        assert_eq!(*image.get_pixel(64, 48), color);
        assert_eq!(*image.get_pixel(320, 240), color);
        assert_eq!(*image.get_pixel(323, 240), color);
        assert_eq!(*image.get_pixel(320, 243), color);
        assert_eq!(*image.get_pixel(64, 200), color);
        // Interior and outside stay untouched.
        assert_eq!(*image.get_pixel(200, 200), BLACK);
        assert_eq!(*image.get_pixel(63, 200), BLACK);
        assert_eq!(*image.get_pixel(324, 200), BLACK);
    }

    #[test]
    fn caption_band_sits_above_the_box() {
        let mut image = RgbImage::new(640, 480);
        annotate(
            &mut image,
            &[person_at(NormalizedBox::new(0.1, 0.1, 0.5, 0.5), 0.95)],
            &labels(),
        );

        let color = class_color(1);
        // Band spans rows 39..=47; the padding row at the top is band colour.
        assert_eq!(*image.get_pixel(64, (48 - LABEL_HEIGHT) as u32), color);
        assert_eq!(*image.get_pixel(64, (48 - LABEL_HEIGHT - 1) as u32), BLACK);
        // Some caption pixel is drawn in the text colour.
        let text_pixels = (65..65 + font::text_width("person (95%)"))
            .flat_map(|x| (40..47).map(move |y| (x, y)))
            .filter(|&(x, y)| *image.get_pixel(x as u32, y as u32) == TEXT_COLOR)
            .count();
        assert!(text_pixels > 0);
    }

    #[test]
    fn label_near_top_edge_is_clamped_inside() {
        let mut image = RgbImage::new(100, 100);
        draw_label(&mut image, (10, 2), "car", class_color(3));
        assert_eq!(*image.get_pixel(10, 0), class_color(3));
    }

    #[test]
    fn boxes_touching_the_edge_are_clipped() {
        let mut image = RgbImage::new(50, 40);
        draw_box(
            &mut image,
            PixelRect {
                x1: 0,
                y1: 0,
                x2: 50,
                y2: 40,
            },
            class_color(2),
        );
        assert_eq!(*image.get_pixel(0, 0), class_color(2));
        assert_eq!(*image.get_pixel(49, 39), class_color(2));
    }

    #[test]
    fn caption_formats_percentage() {
        assert_eq!(caption("person", 0.95), "person (95%)");
        assert_eq!(caption("dog", 0.404), "dog (40%)");
    }

    #[test]
    fn palette_wraps_by_class_id() {
        assert_eq!(class_color(1), class_color(17));
        assert_ne!(class_color(1), class_color(2));
    }

    #[test]
    fn unknown_class_uses_fallback_label() {
        let mut image = RgbImage::new(10, 10);
        let drawn = annotate(
            &mut image,
            &[Detection {
                bbox: NormalizedBox::new(0.0, 0.0, 0.5, 0.5),
                class_id: 77,
                score: 0.9,
            }],
            &labels(),
        );
        assert_eq!(drawn[0].label, "class 77");
    }
}
