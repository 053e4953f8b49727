//! 摄像头输入模块
//!
//! 网络摄像头采集, 支持 MediaFoundation(Windows) / AVFoundation(macOS) / V4L2(Linux)

use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// One frame per call, pull-based. `Ok(None)` is a failed read: the caller
/// skips the tick and keeps looping.
pub trait FrameSource {
    fn read(&mut self) -> Result<Option<RgbImage>>;

    fn describe(&self) -> String;
}

/// 摄像头采集结构
pub struct CameraSource {
    camera: Camera,
    name: String,
}

impl CameraSource {
    /// 打开摄像头并启动采集流
    pub fn open(device_index: u32) -> Result<Self> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(device_index), requested)
            .with_context(|| format!("camera {} could not be opened", device_index))?;
        camera
            .open_stream()
            .with_context(|| format!("camera {} stream failed to start", device_index))?;

        let name = camera.info().human_name();
        let resolution = camera.resolution();
        println!(
            "📷 摄像头已连接: {} ({}x{})",
            name,
            resolution.width(),
            resolution.height()
        );

        Ok(Self { camera, name })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                eprintln!("⚠️ 读取帧失败: {}", e);
                return Ok(None);
            }
        };
        match buffer.decode_image::<RgbFormat>() {
            Ok(img) => Ok(Some(img)),
            Err(e) => {
                eprintln!("⚠️ 帧解码失败: {}", e);
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

/// 获取可用的摄像头设备列表
pub fn get_camera_devices() -> Vec<(u32, String)> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(devices) => devices
            .into_iter()
            .enumerate()
            .map(|(i, info)| (i as u32, info.human_name()))
            .collect(),
        Err(e) => {
            eprintln!("⚠️ 获取摄像头列表失败: {}", e);
            vec![]
        }
    }
}
