//! CLI参数与设置文件

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;

/// 网络摄像头实时检测参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "YOLOv5 webcam monitor", long_about = None)]
pub struct Args {
    /// Model weights: a pretrained name ("yolov5s") or a path to a custom ONNX export
    #[arg(short, long, default_value = "yolov5s")]
    pub model: String,

    /// Camera device index
    #[arg(short, long, default_value_t = 0)]
    pub camera: u32,

    /// Inference input size (square)
    #[arg(long, default_value_t = 640)]
    pub size: u32,

    /// Delay between detection ticks, in milliseconds
    #[arg(long, default_value_t = 30)]
    pub tick_ms: u64,

    /// Use the CUDA execution provider (requires the `cuda` feature)
    #[arg(long)]
    pub cuda: bool,

    /// Use the TensorRT execution provider (requires the `tensorrt` feature)
    #[arg(long)]
    pub trt: bool,

    /// GPU device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// Settings file, created with defaults if absent
    #[arg(long, default_value = "monitor.json")]
    pub settings: String,

    /// List available cameras and exit
    #[arg(long)]
    pub list: bool,
}

/// 检测阈值设置 - 通过JSON文件调整参数
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub conf_threshold: f32, // 检测置信度阈值
    pub iou_threshold: f32,  // NMS IOU阈值
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

impl Settings {
    /// 从JSON文件加载设置
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    println!("✅ 设置已从 {} 加载", path);
                    settings
                }
                Err(e) => {
                    eprintln!("⚠️ 设置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                println!("📝 设置文件不存在,创建默认设置...");
                let settings = Self::default();
                settings.save(path);
                settings
            }
        }
    }

    /// 保存设置到JSON文件
    pub fn save(&self, path: &str) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    eprintln!("❌ 保存设置失败: {}", e);
                }
            }
            Err(e) => eprintln!("❌ 序列化设置失败: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let s = Settings::default();
        assert_eq!(s.conf_threshold, 0.25);
        assert_eq!(s.iou_threshold, 0.45);
    }

    #[test]
    fn test_settings_roundtrip() {
        let path = std::env::temp_dir().join("monitor_settings_roundtrip.json");
        let path = path.to_str().unwrap().to_string();
        let s = Settings {
            conf_threshold: 0.5,
            iou_threshold: 0.6,
        };
        s.save(&path);
        let loaded = Settings::load(&path);
        assert_eq!(loaded.conf_threshold, 0.5);
        assert_eq!(loaded.iou_threshold, 0.6);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_settings_missing_file_creates_defaults() {
        let path = std::env::temp_dir().join("monitor_settings_missing.json");
        let _ = std::fs::remove_file(&path);
        let path = path.to_str().unwrap().to_string();
        let loaded = Settings::load(&path);
        assert_eq!(loaded.conf_threshold, Settings::default().conf_threshold);
        // the load created the file with defaults
        assert!(std::path::Path::new(&path).exists());
        let _ = std::fs::remove_file(&path);
    }
}
