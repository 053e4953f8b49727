//! Model interface and weight resolution.
//!
//! A model is an opaque collaborator: RGB frame in, bounding boxes out.
//! The trait is the seam that keeps the capture/render loop testable
//! without an ONNX session behind it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbImage;

use crate::Bbox;

pub mod yolov5;
pub use yolov5::{Yolov5Postprocessor, YOLOv5};

/// Unified model interface: frame in, boxes out.
pub trait Model {
    /// Full inference pass on one frame.
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<Bbox>>;

    /// Class-id to label table.
    fn names(&self) -> &[String];

    /// Per-class box colors.
    fn color_palette(&self) -> &[(u8, u8, u8)];

    fn set_conf(&mut self, val: f32);

    fn set_iou(&mut self, val: f32);

    /// 打印模型信息
    fn summary(&self);
}

/// Where the weights come from: a pretrained release asset resolved through
/// the local cache, or a custom export on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Pretrained(String),
    Custom(PathBuf),
}

const WEIGHTS_RELEASE: &str = "https://github.com/ultralytics/yolov5/releases/download/v7.0";

impl ModelSource {
    /// A bare name ("yolov5s") selects a pretrained weight set; anything that
    /// looks like a filesystem path selects a custom export.
    pub fn parse(arg: &str) -> Self {
        let looks_like_path = arg.ends_with(".onnx")
            || arg.contains('/')
            || arg.contains(std::path::MAIN_SEPARATOR);
        if looks_like_path {
            ModelSource::Custom(PathBuf::from(arg))
        } else {
            ModelSource::Pretrained(arg.to_string())
        }
    }

    /// Resolve to a weight file on disk, downloading a pretrained set into
    /// the user cache on first use. A missing custom file is a hard error,
    /// never silently ignored.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            ModelSource::Custom(path) => {
                if !path.is_file() {
                    bail!("custom model weights not found: {}", path.display());
                }
                Ok(path.clone())
            }
            ModelSource::Pretrained(name) => {
                let cache = dirs::cache_dir()
                    .context("no user cache directory available")?
                    .join("yolov5-monitor");
                let target = cache.join(format!("{}.onnx", name));
                if target.is_file() {
                    return Ok(target);
                }
                fs::create_dir_all(&cache)
                    .with_context(|| format!("failed to create {}", cache.display()))?;
                download_weights(name, &target)?;
                Ok(target)
            }
        }
    }
}

fn download_weights(name: &str, target: &Path) -> Result<()> {
    let url = format!("{}/{}.onnx", WEIGHTS_RELEASE, name);
    println!("📦 下载预训练权重: {}", url);
    let response = ureq::get(&url)
        .call()
        .with_context(|| format!("failed to download {}", url))?;
    let mut reader = response.into_reader();
    let mut file = fs::File::create(target)
        .with_context(|| format!("failed to create {}", target.display()))?;
    std::io::copy(&mut reader, &mut file)
        .with_context(|| format!("failed to write {}", target.display()))?;
    println!("✅ 权重已缓存: {}", target.display());
    Ok(())
}

/// COCO-80 labels, the fallback when the export carries no names metadata.
pub static COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
