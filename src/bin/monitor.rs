//! YOLOv5 实时目标检测监控
//!
//! 摄像头采集 → ONNX 推理 → 视频面板 + 日志面板

use clap::Parser;
use macroquad::prelude::*;

use yolov5_monitor::app::App;
use yolov5_monitor::detection::Detector;
use yolov5_monitor::input::get_camera_devices;
use yolov5_monitor::models::ModelSource;
use yolov5_monitor::{Args, Settings, YOLOv5};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn window_conf() -> Conf {
    Conf {
        window_title: "YOLOv5 Object Detection".to_owned(),
        window_width: 1000,
        window_height: 600,
        window_resizable: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let args = Args::parse();

    if args.list {
        let devices = get_camera_devices();
        if devices.is_empty() {
            println!("⚠️ 未发现可用摄像头");
        } else {
            for (index, name) in devices {
                println!("  [{}] {}", index, name);
            }
        }
        return;
    }

    let settings = Settings::load(&args.settings);

    // 模型加载失败直接退出, 不吞掉错误
    let weights = match ModelSource::parse(&args.model).resolve() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ 模型权重获取失败: {:#}", e);
            std::process::exit(1);
        }
    };
    let model = match YOLOv5::new(&args, &settings, &weights) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("❌ 模型加载失败: {:#}", e);
            std::process::exit(1);
        }
    };
    model.summary();

    let detector = Detector::new(Box::new(model));
    let mut app = App::new(
        detector,
        args.camera,
        args.tick_ms,
        settings,
        args.settings.clone(),
    );

    loop {
        app.update();
        app.draw();
        app.draw_egui();

        if app.should_quit() {
            break;
        }
        next_frame().await;
    }
}
