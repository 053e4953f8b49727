pub mod app; // 主界面 (视频面板 + 控制面板 + 日志面板)
pub mod config; // CLI参数与设置文件
pub mod detection; // 检测器封装
pub mod event_log; // 追加式日志
pub mod input; // 摄像头输入
pub mod models; // 模型接口与具体实现
pub mod ort_backend;
pub mod session; // 会话状态机 (摄像头句柄 + 运行标志)

pub use crate::config::{Args, Settings};
pub use crate::models::{Model, ModelSource, YOLOv5};
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};

/// Greedy NMS over candidate boxes, highest confidence first.
pub fn non_max_suppression(xs: &mut Vec<Bbox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence().partial_cmp(&b1.confidence()).unwrap());

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

pub fn gen_time_string() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bbox {
    // a bounding box around an object
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    id: usize,
    confidence: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32, id: usize, confidence: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            id,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = (self.xmin + self.width).min(another.xmin + another.width);
        let t = self.ymin.max(another.ymin);
        let b = (self.ymin + self.height).min(another.ymin + another.height);
        (r - l + 1.).max(0.) * (b - t + 1.).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        self.intersection_area(another) / self.union(another)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let b = Bbox::new(10.0, 20.0, 30.0, 40.0, 0, 0.9);
        assert_eq!(b.xmax(), 40.0);
        assert_eq!(b.ymax(), 60.0);
        assert_eq!(b.area(), 1200.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = Bbox::new(0.0, 0.0, 10.0, 10.0, 0, 0.9);
        let b = Bbox::new(100.0, 100.0, 10.0, 10.0, 0, 0.9);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_identical() {
        let a = Bbox::new(5.0, 5.0, 20.0, 20.0, 0, 0.9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let mut boxes = vec![
            Bbox::new(0.0, 0.0, 100.0, 100.0, 0, 0.6),
            Bbox::new(5.0, 5.0, 100.0, 100.0, 0, 0.9),
            Bbox::new(300.0, 300.0, 50.0, 50.0, 1, 0.5),
        ];
        non_max_suppression(&mut boxes, 0.45);
        assert_eq!(boxes.len(), 2);
        // kept boxes ordered by descending confidence
        assert_eq!(boxes[0].confidence(), 0.9);
        assert_eq!(boxes[1].confidence(), 0.5);
    }

    #[test]
    fn test_nms_keeps_distinct_boxes() {
        let mut boxes = vec![
            Bbox::new(0.0, 0.0, 10.0, 10.0, 0, 0.8),
            Bbox::new(50.0, 50.0, 10.0, 10.0, 0, 0.7),
            Bbox::new(200.0, 0.0, 10.0, 10.0, 2, 0.6),
        ];
        non_max_suppression(&mut boxes, 0.45);
        assert_eq!(boxes.len(), 3);
    }
}
