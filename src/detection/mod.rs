//! 检测器 (Detector)
//! 职责: 单帧检测 → 叠加检测框 → 返回 (标注帧, 检测列表)

pub mod types;
pub use types::Detection;

use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::models::Model;

/// Box outline thickness in pixels.
const BOX_THICKNESS: i32 = 3;

/// Wraps a model behind the opaque per-frame contract:
/// frame in, annotated frame + detections out.
pub struct Detector {
    model: Box<dyn Model>,
}

impl Detector {
    pub fn new(model: Box<dyn Model>) -> Self {
        Self { model }
    }

    pub fn set_thresholds(&mut self, conf: f32, iou: f32) {
        self.model.set_conf(conf);
        self.model.set_iou(iou);
    }

    /// One synchronous detection pass. No retry, no timeout; a slow model
    /// stalls the caller's tick.
    pub fn detect(&mut self, frame: &RgbImage) -> Result<(RgbImage, Vec<Detection>)> {
        let bboxes = self.model.forward(frame)?;

        let names = self.model.names();
        let detections: Vec<Detection> = bboxes
            .iter()
            .map(|bbox| Detection {
                label: names
                    .get(bbox.id())
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", bbox.id())),
                confidence: bbox.confidence(),
                bbox: bbox.clone(),
            })
            .collect();

        let mut annotated = frame.clone();
        let palette = self.model.color_palette();
        for bbox in &bboxes {
            let (r, g, b) = palette
                .get(bbox.id())
                .copied()
                .unwrap_or((0, 255, 0));
            draw_bbox(&mut annotated, bbox, Rgb([r, g, b]));
        }

        Ok((annotated, detections))
    }
}

/// 绘制检测框 (空心矩形, 向内收缩加粗)
fn draw_bbox(img: &mut RgbImage, bbox: &crate::Bbox, color: Rgb<u8>) {
    let (iw, ih) = (img.width() as f32, img.height() as f32);
    for inset in 0..BOX_THICKNESS {
        let x = (bbox.xmin() + inset as f32).clamp(0.0, iw - 2.0);
        let y = (bbox.ymin() + inset as f32).clamp(0.0, ih - 2.0);
        let w = (bbox.width() - 2.0 * inset as f32).max(1.0).min(iw - x);
        let h = (bbox.height() - 2.0 * inset as f32).max(1.0).min(ih - y);
        let rect = Rect::at(x as i32, y as i32).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}
