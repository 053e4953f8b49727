//! 会话状态机
//!
//! State owned between Start and Exit: an optional camera handle and the
//! running flag. Invariant: no handle ⇒ not running. Generic over
//! [`FrameSource`] so the transitions are testable without hardware.

use anyhow::Result;
use image::RgbImage;

use crate::input::FrameSource;

pub struct Session<S> {
    source: Option<S>,
    running: bool,
}

impl<S> Default for Session<S> {
    fn default() -> Self {
        Self {
            source: None,
            running: false,
        }
    }
}

impl<S: FrameSource> Session<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session, opening a source through `open` only when none is
    /// held. Returns `Ok(true)` when the session newly started, `Ok(false)`
    /// when it was already running. On open failure the session stays idle
    /// and no handle is retained.
    pub fn start<F>(&mut self, open: F) -> Result<bool>
    where
        F: FnOnce() -> Result<S>,
    {
        if self.running {
            return Ok(false);
        }
        if self.source.is_none() {
            self.source = Some(open()?);
        }
        self.running = true;
        Ok(true)
    }

    /// Clear the running flag; the source stays open for a quick restart.
    /// Returns whether the session was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        was_running
    }

    /// Release the source on the way out, whatever the running state.
    pub fn release(&mut self) {
        self.running = false;
        self.source = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// One frame for the current tick. `Ok(None)` when not running, or when
    /// the source dropped this read (the tick is skipped, the loop goes on).
    pub fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.running {
            return Ok(None);
        }
        match self.source.as_mut() {
            Some(source) => source.read(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct FakeSource {
        reads: Vec<Option<RgbImage>>,
    }

    impl FakeSource {
        fn with_frames(n: usize) -> Self {
            Self {
                reads: (0..n).map(|_| Some(RgbImage::new(4, 4))).collect(),
            }
        }
    }

    impl FrameSource for FakeSource {
        fn read(&mut self) -> Result<Option<RgbImage>> {
            if self.reads.is_empty() {
                return Ok(None);
            }
            Ok(self.reads.remove(0))
        }
        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    #[test]
    fn test_start_failure_stays_idle() {
        let mut session: Session<FakeSource> = Session::new();
        let result = session.start(|| bail!("no camera attached"));
        assert!(result.is_err());
        assert!(!session.is_running());
        assert!(!session.has_source());
    }

    #[test]
    fn test_double_start_is_noop() {
        let mut session = Session::new();
        assert!(session.start(|| Ok(FakeSource::with_frames(1))).unwrap());
        assert!(!session.start(|| panic!("must not reopen")).unwrap());
        assert!(session.is_running());
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut session: Session<FakeSource> = Session::new();
        assert!(!session.stop());
        assert!(!session.is_running());
        assert!(!session.has_source());
    }

    #[test]
    fn test_stop_keeps_source_for_restart() {
        let mut session = Session::new();
        session.start(|| Ok(FakeSource::with_frames(1))).unwrap();
        assert!(session.stop());
        assert!(!session.is_running());
        assert!(session.has_source());
        // restart does not reopen
        assert!(session.start(|| panic!("must not reopen")).unwrap());
        assert!(session.is_running());
    }

    #[test]
    fn test_release_drops_source_regardless_of_state() {
        let mut session = Session::new();
        session.start(|| Ok(FakeSource::with_frames(1))).unwrap();
        session.release();
        assert!(!session.is_running());
        assert!(!session.has_source());

        // and from the stopped state too
        let mut session = Session::new();
        session.start(|| Ok(FakeSource::with_frames(1))).unwrap();
        session.stop();
        session.release();
        assert!(!session.has_source());
    }

    #[test]
    fn test_invariant_no_source_implies_not_running() {
        let mut session: Session<FakeSource> = Session::new();
        assert!(!session.has_source() && !session.is_running());
        session.start(|| Ok(FakeSource::with_frames(0))).unwrap();
        session.release();
        assert!(!session.has_source());
        assert!(!session.is_running());
    }

    #[test]
    fn test_read_frame_only_while_running() {
        let mut session = Session::new();
        session.start(|| Ok(FakeSource::with_frames(2))).unwrap();
        assert!(session.read_frame().unwrap().is_some());
        session.stop();
        assert!(session.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_read_failure_skips_tick() {
        let mut session = Session::new();
        session
            .start(|| {
                Ok(FakeSource {
                    reads: vec![None, Some(RgbImage::new(4, 4))],
                })
            })
            .unwrap();
        // failed read is not an error, the loop keeps going
        assert!(session.read_frame().unwrap().is_none());
        assert!(session.is_running());
        assert!(session.read_frame().unwrap().is_some());
    }
}
