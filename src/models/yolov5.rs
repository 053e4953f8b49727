//! YOLOv5 完整模型实现
//! 包含: 模型加载、预处理、推理、后处理

use std::path::Path;

use anyhow::{Context, Result};
use fast_image_resize as fr;
use image::RgbImage;
use ndarray::{s, Array, Axis, IxDyn};

use crate::config::{Args, Settings};
use crate::models::{Model, COCO_NAMES};
use crate::{non_max_suppression, Bbox, OrtBackend, OrtConfig, OrtEP};

/// Letterbox pad value, 144/255 (same gray the exporter assumes).
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv5 完整模型结构
pub struct YOLOv5 {
    engine: OrtBackend,
    size: u32,
    conf: f32,
    iou: f32,
    names: Vec<String>,
    color_palette: Vec<(u8, u8, u8)>,
}

impl YOLOv5 {
    /// 从配置创建 YOLOv5 模型
    pub fn new(args: &Args, settings: &Settings, weights: &Path) -> Result<Self> {
        // execution provider
        let ep = if args.trt {
            OrtEP::Trt(args.device_id)
        } else if args.cuda {
            OrtEP::CUDA(args.device_id)
        } else {
            OrtEP::CPU
        };

        let engine = OrtBackend::build(OrtConfig {
            model: weights.to_path_buf(),
            ep,
        })?;

        // class names: exporter metadata first, COCO-80 otherwise
        let names = engine
            .names()
            .cloned()
            .unwrap_or_else(|| COCO_NAMES.iter().map(|s| s.to_string()).collect());

        let bright_colors = [
            (255, 0, 0),     // 红色
            (0, 255, 0),     // 绿色
            (0, 0, 255),     // 蓝色
            (255, 255, 0),   // 黄色
            (255, 0, 255),   // 品红
            (0, 255, 255),   // 青色
            (255, 128, 0),   // 橙色
            (255, 0, 128),   // 粉红
            (128, 255, 0),   // 黄绿
            (0, 128, 255),   // 天蓝
            (255, 255, 255), // 白色
            (128, 0, 255),   // 紫色
        ];
        let color_palette: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, _)| bright_colors[i % bright_colors.len()])
            .collect();

        Ok(Self {
            engine,
            size: args.size,
            conf: settings.conf_threshold,
            iou: settings.iou_threshold,
            names,
            color_palette,
        })
    }

    fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
        let r = (w1 / w0).min(h1 / h0);
        (r, (w0 * r).round(), (h0 * r).round())
    }

    /// Aspect-preserving resize into a padded square NCHW tensor.
    pub fn preprocess(&self, x: &RgbImage) -> Result<Array<f32, IxDyn>> {
        let (w0, h0) = x.dimensions();
        let (_, w_new, h_new) =
            Self::scale_wh(w0 as f32, h0 as f32, self.size as f32, self.size as f32);
        let (w_new, h_new) = (w_new as u32, h_new as u32);

        let src = fr::images::ImageRef::new(w0, h0, x.as_raw(), fr::PixelType::U8x3)
            .context("failed to create resize source")?;
        let mut dst = fr::images::Image::new(w_new, h_new, fr::PixelType::U8x3);
        let mut resizer = fr::Resizer::new();
        resizer
            .resize(
                &src,
                &mut dst,
                &fr::ResizeOptions::new()
                    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
            )
            .context("resize failed")?;

        let mut ys = Array::ones((1, 3, self.size as usize, self.size as usize)).into_dyn();
        ys.fill(PAD_VALUE);
        let raw = dst.buffer();
        for y in 0..h_new as usize {
            for x in 0..w_new as usize {
                let i = (y * w_new as usize + x) * 3;
                ys[[0, 0, y, x]] = (raw[i] as f32) / 255.0;
                ys[[0, 1, y, x]] = (raw[i + 1] as f32) / 255.0;
                ys[[0, 2, y, x]] = (raw[i + 2] as f32) / 255.0;
            }
        }
        Ok(ys)
    }

    pub fn postprocess(&self, preds: &Array<f32, IxDyn>, w0: f32, h0: f32) -> Vec<Bbox> {
        let postprocessor = Yolov5Postprocessor {
            nc: self.names.len(),
            conf: self.conf,
            iou: self.iou,
            size: self.size,
        };
        postprocessor.postprocess(preds, w0, h0)
    }

    pub fn summary(&self) {
        println!(
            "\nSummary:\n\
            > Model: YOLOv5 ({} classes)\n\
            > EP: {:?} {}\n\
            > Input: 1x3x{}x{}\n\
            > conf: {}, iou: {}\n\
            > IO: {} -> {}\n",
            self.names.len(),
            self.engine.ep(),
            if let OrtEP::CPU = self.engine.ep() {
                ""
            } else {
                "(May still fall back to CPU)"
            },
            self.size,
            self.size,
            self.conf,
            self.iou,
            self.engine.input_name(),
            self.engine.output_name(),
        );
    }
}

impl Model for YOLOv5 {
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<Bbox>> {
        let xs = self.preprocess(image)?;
        let ys = self.engine.run(xs)?;
        Ok(self.postprocess(&ys, image.width() as f32, image.height() as f32))
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn color_palette(&self) -> &[(u8, u8, u8)] {
        &self.color_palette
    }

    fn set_conf(&mut self, val: f32) {
        self.conf = val;
    }

    fn set_iou(&mut self, val: f32) {
        self.iou = val;
    }

    fn summary(&self) {
        YOLOv5::summary(self)
    }
}

/// YOLOv5 后处理器
///
/// Decodes the raw `[batch, anchors, 4 + 1 + nc]` output: cx/cy/w/h,
/// objectness, per-class scores. Standalone so it can run without a session.
pub struct Yolov5Postprocessor {
    pub nc: usize,
    pub conf: f32,
    pub iou: f32,
    pub size: u32,
}

impl Yolov5Postprocessor {
    pub fn postprocess(&self, preds: &Array<f32, IxDyn>, w0: f32, h0: f32) -> Vec<Bbox> {
        const CXYWH_OFFSET: usize = 4;
        const CLS_OFFSET: usize = 5;

        // ratio used by the letterbox preprocess; boxes come back in model space
        let ratio = (self.size as f32 / w0).min(self.size as f32 / h0);

        let mut data: Vec<Bbox> = Vec::new();
        let anchors = preds.index_axis(Axis(0), 0);
        for pred in anchors.axis_iter(Axis(0)) {
            let objectness = pred[CXYWH_OFFSET];
            let clss = pred.slice(s![CLS_OFFSET..CLS_OFFSET + self.nc]);
            let (id, &class_score) = clss
                .into_iter()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
                .unwrap();

            let confidence = objectness * class_score;
            if confidence < self.conf {
                continue;
            }

            let cx = pred[0] / ratio;
            let cy = pred[1] / ratio;
            let w = pred[2] / ratio;
            let h = pred[3] / ratio;
            let x = cx - w / 2.;
            let y = cy - h / 2.;
            data.push(Bbox::new(
                x.max(0.0f32).min(w0),
                y.max(0.0f32).min(h0),
                w,
                h,
                id,
                confidence,
            ));
        }

        non_max_suppression(&mut data, self.iou);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_preds(rows: &[[f32; 85]]) -> Array<f32, IxDyn> {
        let mut preds = Array::zeros((1, rows.len(), 85)).into_dyn();
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                preds[[0, i, j]] = v;
            }
        }
        preds
    }

    #[test]
    fn test_scale_wh_landscape() {
        let (r, w, h) = YOLOv5::scale_wh(1280.0, 720.0, 640.0, 640.0);
        assert_eq!(r, 0.5);
        assert_eq!(w, 640.0);
        assert_eq!(h, 360.0);
    }

    #[test]
    fn test_postprocess_decodes_and_rescales() {
        // one confident detection on a 1280x960 frame, ratio = 0.5
        let mut row = [0.0f32; 85];
        row[0] = 320.0; // cx
        row[1] = 240.0; // cy
        row[2] = 100.0; // w
        row[3] = 80.0; // h
        row[4] = 0.9; // objectness
        row[5 + 2] = 0.9; // class 2 ("car")
        let preds = synthetic_preds(&[row]);

        let post = Yolov5Postprocessor {
            nc: 80,
            conf: 0.25,
            iou: 0.45,
            size: 640,
        };
        let boxes = post.postprocess(&preds, 1280.0, 960.0);
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!(b.id(), 2);
        assert!((b.confidence() - 0.81).abs() < 1e-5);
        assert!((b.xmin() - 540.0).abs() < 1e-3);
        assert!((b.ymin() - 400.0).abs() < 1e-3);
        assert!((b.width() - 200.0).abs() < 1e-3);
        assert!((b.height() - 160.0).abs() < 1e-3);
    }

    #[test]
    fn test_postprocess_drops_low_confidence() {
        // objectness * class score below threshold
        let mut row = [0.0f32; 85];
        row[0] = 320.0;
        row[1] = 240.0;
        row[2] = 100.0;
        row[3] = 80.0;
        row[4] = 0.2;
        row[5] = 0.5; // 0.2 * 0.5 = 0.10 < 0.25
        let preds = synthetic_preds(&[row]);

        let post = Yolov5Postprocessor {
            nc: 80,
            conf: 0.25,
            iou: 0.45,
            size: 640,
        };
        assert!(post.postprocess(&preds, 1280.0, 960.0).is_empty());
    }

    #[test]
    fn test_postprocess_nms_merges_duplicates() {
        let mut a = [0.0f32; 85];
        a[0] = 320.0;
        a[1] = 240.0;
        a[2] = 100.0;
        a[3] = 80.0;
        a[4] = 0.9;
        a[5] = 0.9;
        let mut b = a;
        b[0] = 322.0; // nearly the same box, lower score
        b[4] = 0.8;
        let preds = synthetic_preds(&[a, b]);

        let post = Yolov5Postprocessor {
            nc: 80,
            conf: 0.25,
            iou: 0.45,
            size: 640,
        };
        let boxes = post.postprocess(&preds, 1280.0, 960.0);
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].confidence() - 0.81).abs() < 1e-5);
    }
}
