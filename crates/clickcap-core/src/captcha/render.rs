//! Debug rendering of solve results.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::models::{BoundingBox, ClickPoint, Region};

use super::solver::SolveObserver;

const DETECTED: Rgb<u8> = Rgb([255, 0, 0]);
const RECOGNIZED: Rgb<u8> = Rgb([0, 255, 0]);
const CLICK: Rgb<u8> = Rgb([0, 0, 255]);
const CLICK_RADIUS: i32 = 5;

/// Observer that writes an annotated copy of each solved captcha.
///
/// Every detected box gets a red frame, boxes with recognized text get an
/// inner green frame and each click point a filled blue dot. Glyph text is
/// not drawn (no CJK font is bundled); the recognized strings go to a `.txt`
/// file next to the image, one line per numbered region.
pub struct DebugRenderer {
    output: PathBuf,
}

impl DebugRenderer {
    /// Render to `output` (overwritten on every solve).
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Where the region labels are written.
    pub fn labels_path(&self) -> PathBuf {
        self.output.with_extension("txt")
    }

    /// Draw regions and click points onto a copy of `image`.
    pub fn render(
        &self,
        image: &DynamicImage,
        regions: &[Region],
        click_points: &[ClickPoint],
    ) -> RgbImage {
        let mut canvas = image.to_rgb8();

        for region in regions {
            if let Some(rect) = to_rect(&region.bbox, 0) {
                draw_hollow_rect_mut(&mut canvas, rect, DETECTED);
            }
            if region.is_labeled() {
                if let Some(rect) = to_rect(&region.bbox, 1) {
                    draw_hollow_rect_mut(&mut canvas, rect, RECOGNIZED);
                }
            }
        }

        for point in click_points {
            draw_filled_circle_mut(
                &mut canvas,
                (point.x as i32, point.y as i32),
                CLICK_RADIUS,
                CLICK,
            );
        }

        canvas
    }
}

impl SolveObserver for DebugRenderer {
    fn on_solved(&self, image: &DynamicImage, regions: &[Region], click_points: &[ClickPoint]) {
        let canvas = self.render(image, regions, click_points);
        match canvas.save(&self.output) {
            Ok(()) => info!("Debug image written to {}", self.output.display()),
            Err(e) => warn!(
                "Failed to write debug image {}: {}",
                self.output.display(),
                e
            ),
        }

        let labels_path = self.labels_path();
        if let Err(e) = std::fs::write(&labels_path, region_labels(regions)) {
            warn!(
                "Failed to write region labels {}: {}",
                labels_path.display(),
                e
            );
        }
    }
}

/// `index x1,y1,x2,y2 text confidence` per region; unread regions show `-`.
fn region_labels(regions: &[Region]) -> String {
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let b = &region.bbox;
            let text = if region.is_labeled() {
                region.text.as_str()
            } else {
                "-"
            };
            format!(
                "{} {},{},{},{} {} {:.2}\n",
                i + 1,
                b.x1,
                b.y1,
                b.x2,
                b.y2,
                text,
                region.confidence
            )
        })
        .collect()
}

/// Box outline shrunk by `inset` pixels on every side.
fn to_rect(bbox: &BoundingBox, inset: u32) -> Option<Rect> {
    let width = bbox.width().checked_sub(2 * inset)?;
    let height = bbox.height().checked_sub(2 * inset)?;
    if width == 0 || height == 0 {
        return None;
    }

    Some(Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32).of_size(width, height))
}
