//! 追加式日志
//!
//! Append-only text sink for the log panel. No filtering, no rotation,
//! no levels; the panel scrolls to the end on every append.

use crate::detection::Detection;
use crate::gen_time_string;

#[derive(Default)]
pub struct EventLog {
    lines: Vec<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: &str) {
        let line = format!("[{}] {}", gen_time_string(), message);
        println!("{}", line);
        self.lines.push(line);
    }

    /// One status line, then one line per detection in detection order.
    pub fn append_detections(&mut self, detections: &[Detection]) {
        self.push("detections updated");
        for detection in detections {
            self.push(&detection.log_line());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
