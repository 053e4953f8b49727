//! 主界面
//!
//! 单线程协作式调度: 每帧回调中依次执行 捕获 → 检测 → 渲染 → 日志,
//! 通过 running 标志取消, 不使用线程与锁。

use std::time::{Duration, Instant};

use anyhow::Result;
use egui_macroquad::egui;
use image::RgbImage;
use macroquad::prelude::*;

use crate::config::Settings;
use crate::detection::{Detection, Detector};
use crate::event_log::EventLog;
use crate::input::{CameraSource, FrameSource};
use crate::session::Session;

pub struct App {
    session: Session<CameraSource>,
    detector: Detector,
    log: EventLog,

    settings: Settings,
    settings_path: String,
    camera_index: u32,

    // 检测节拍: 上一轮完成后固定延时
    tick: Duration,
    last_tick: Instant,
    tick_count: u64,

    // 视频面板
    last_frame: Option<Texture2D>,
    frame_size: (u32, u32),
    last_detections: Vec<Detection>,

    // 渲染统计
    render_count: u64,
    render_last: Instant,
    render_fps: f64,

    error_dialog: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(
        detector: Detector,
        camera_index: u32,
        tick_ms: u64,
        settings: Settings,
        settings_path: String,
    ) -> Self {
        Self {
            session: Session::new(),
            detector,
            log: EventLog::new(),
            settings,
            settings_path,
            camera_index,
            tick: Duration::from_millis(tick_ms),
            last_tick: Instant::now(),
            tick_count: 0,
            last_frame: None,
            frame_size: (0, 0),
            last_detections: Vec::new(),
            render_count: 0,
            render_last: Instant::now(),
            render_fps: 0.0,
            error_dialog: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn on_start(&mut self) {
        let index = self.camera_index;
        match self.session.start(|| CameraSource::open(index)) {
            Ok(true) => {
                self.log.push("object detection started");
                // first tick fires immediately
                self.last_tick = Instant::now() - self.tick;
            }
            Ok(false) => {}
            Err(e) => {
                eprintln!("❌ 摄像头打开失败: {:#}", e);
                self.error_dialog = Some(format!("{:#}", e));
            }
        }
    }

    fn on_stop(&mut self) {
        if self.session.stop() {
            self.log.push("object detection stopped");
        }
    }

    fn on_exit(&mut self) {
        self.session.release();
        self.settings.save(&self.settings_path);
        self.should_quit = true;
    }

    /// One cooperative step: run a tick when running and the fixed delay
    /// since the previous tick's completion has elapsed.
    pub fn update(&mut self) {
        if !self.session.is_running() {
            return;
        }
        if self.last_tick.elapsed() < self.tick {
            return;
        }

        if let Err(e) = self.tick_once() {
            // no recovery policy for detector errors: surface and stop
            eprintln!("❌ 检测失败: {:#}", e);
            let line = format!("detector error: {:#}", e);
            self.log.push(&line);
            self.session.stop();
        }

        // fixed delay measured from completion, not from start
        self.last_tick = Instant::now();
    }

    fn tick_once(&mut self) -> Result<()> {
        let Some(frame) = self.session.read_frame()? else {
            // read failure or raced stop: skip this tick, keep looping
            return Ok(());
        };

        let (annotated, detections) = self.detector.detect(&frame)?;
        self.update_texture(&annotated);
        self.log.append_detections(&detections);
        self.last_detections = detections;
        self.tick_count += 1;
        Ok(())
    }

    fn update_texture(&mut self, frame: &RgbImage) {
        let (width, height) = frame.dimensions();

        // RGB → RGBA
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for chunk in frame.as_raw().chunks_exact(3) {
            rgba.push(chunk[0]);
            rgba.push(chunk[1]);
            rgba.push(chunk[2]);
            rgba.push(255);
        }

        // 只在分辨率变化时重建纹理, 否则更新像素数据
        let needs_rebuild = self.last_frame.is_none() || self.frame_size != (width, height);
        if needs_rebuild {
            let texture = Texture2D::from_rgba8(width as u16, height as u16, &rgba);
            texture.set_filter(FilterMode::Linear);
            self.last_frame = Some(texture);
            self.frame_size = (width, height);
        } else if let Some(ref tex) = self.last_frame {
            let img = Image {
                bytes: rgba,
                width: width as u16,
                height: height as u16,
            };
            tex.update(&img);
        }
    }

    pub fn draw(&mut self) {
        clear_background(BLACK);

        if let Some(texture) = &self.last_frame {
            let scale_x = screen_width() / texture.width();
            let scale_y = screen_height() / texture.height();

            let scaled_width = texture.width() * scale_x;
            let scaled_height = texture.height() * scale_y;
            let center_x = (screen_width() - scaled_width) / 2.0;
            let center_y = (screen_height() - scaled_height) / 2.0;

            draw_texture_ex(
                texture,
                center_x,
                center_y,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(scaled_width, scaled_height)),
                    ..Default::default()
                },
            );

            // 绘制标签 (检测框已叠加在帧上)
            for detection in &self.last_detections {
                let x1 = detection.bbox.xmin() * scale_x + center_x;
                let y1 = detection.bbox.ymin() * scale_y + center_y;
                draw_text(&detection.log_line(), x1, y1 - 5.0, 20.0, GREEN);
            }
        } else {
            let message = "等待摄像头画面...";
            let size = measure_text(message, None, 30, 1.0);
            draw_text(
                message,
                (screen_width() - size.width) / 2.0,
                screen_height() / 2.0,
                30.0,
                WHITE,
            );
        }

        // FPS统计
        self.render_count += 1;
        let now = Instant::now();
        if now.duration_since(self.render_last).as_secs() >= 1 {
            self.render_fps =
                self.render_count as f64 / now.duration_since(self.render_last).as_secs_f64();
            self.render_count = 0;
            self.render_last = now;
        }
    }

    pub fn draw_egui(&mut self) {
        let mut start_clicked = false;
        let mut stop_clicked = false;
        let mut exit_clicked = false;
        let mut thresholds_changed = false;

        egui_macroquad::ui(|egui_ctx| {
            egui::Window::new("控制面板")
                .default_pos(egui::pos2(10.0, 10.0))
                .resizable(false)
                .show(egui_ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("渲染 FPS:");
                        ui.colored_label(egui::Color32::GREEN, format!("{:.1}", self.render_fps));
                        ui.label("| 检测帧数:");
                        ui.colored_label(egui::Color32::YELLOW, format!("{}", self.tick_count));
                    });
                    if let Some(source) = self.session.source() {
                        ui.label(format!("摄像头: {}", source.describe()));
                    }

                    ui.separator();

                    let running = self.session.is_running();
                    ui.horizontal(|ui| {
                        if ui.add_enabled(!running, egui::Button::new("▶ 开始")).clicked() {
                            start_clicked = true;
                        }
                        if ui.add_enabled(running, egui::Button::new("⏸ 停止")).clicked() {
                            stop_clicked = true;
                        }
                        if ui.button("✖ 退出").clicked() {
                            exit_clicked = true;
                        }
                    });

                    ui.separator();

                    ui.label("阈值设置:");
                    if ui
                        .add(
                            egui::Slider::new(&mut self.settings.conf_threshold, 0.0..=1.0)
                                .text("置信度"),
                        )
                        .changed()
                    {
                        thresholds_changed = true;
                    }
                    if ui
                        .add(
                            egui::Slider::new(&mut self.settings.iou_threshold, 0.0..=1.0)
                                .text("IOU"),
                        )
                        .changed()
                    {
                        thresholds_changed = true;
                    }
                });

            egui::Window::new("检测日志")
                .default_pos(egui::pos2(screen_width() - 360.0, screen_height() - 300.0))
                .default_size(egui::vec2(340.0, 260.0))
                .show(egui_ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for line in self.log.lines() {
                                ui.label(line);
                            }
                        });
                });

            if let Some(message) = self.error_dialog.clone() {
                egui::Window::new("Error")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                    .show(egui_ctx, |ui| {
                        ui.label(message);
                        if ui.button("确定").clicked() {
                            self.error_dialog = None;
                        }
                    });
            }
        });

        egui_macroquad::draw();

        if thresholds_changed {
            self.detector
                .set_thresholds(self.settings.conf_threshold, self.settings.iou_threshold);
        }
        if start_clicked {
            self.on_start();
        }
        if stop_clicked {
            self.on_stop();
        }
        if exit_clicked {
            self.on_exit();
        }
    }
}
