//! 检测系统数据结构定义

use crate::Bbox;

/// 检测结果 (检测模块 → 渲染模块)
///
/// One recognized object: label, confidence and box in frame coordinates.
/// Produced fresh per frame, never retained across frames.
#[derive(Clone, Debug)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: Bbox,
}

impl Detection {
    /// Log panel line, two decimals as the panel shows it.
    pub fn log_line(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence)
    }
}
