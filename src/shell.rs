//! Event surface the native host shell drives. The host owns the window,
//! the global shortcuts, the capture devices; this module owns what happens
//! when its events arrive.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::ai::transcription::TranscriptionClient;
use crate::orchestrator::Orchestrator;
use crate::queue;

const MIC_TOGGLE_DEBOUNCE: Duration = Duration::from_millis(500);
const MOVE_STEP: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

/// One global-shortcut event from the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    MoveWindow(MoveDirection),
    TakeScreenshot,
    StartOver,
    SolveScreenshots,
    ToggleMic,
}

/// Raw RGBA frame handed over by the host's capture service.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Native services the core consumes but never implements.
pub trait HostShell: Send + Sync {
    fn capture_screen(&self) -> Result<CapturedFrame, String>;
    fn move_window(&self, direction: MoveDirection, step: i32);
}

/// Microphone recorder owned by the host. One recognition session holds it
/// exclusively; `release` must be safe to call on every exit path.
pub trait Recorder: Send + Sync {
    fn start(&self) -> Result<(), String>;
    /// Stop recording and hand back the captured audio bytes.
    fn stop(&self) -> Result<Vec<u8>, String>;
    /// Release the recorder and the media stream tracks.
    fn release(&self);
}

/// Releases the recorder no matter which way the enclosing scope exits.
struct ReleaseOnDrop<'a>(&'a dyn Recorder);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

pub struct ShellController {
    orchestrator: Arc<Orchestrator>,
    host: Arc<dyn HostShell>,
    recorder: Arc<dyn Recorder>,
    transcription: TranscriptionClient,
    last_mic_toggle: Mutex<Option<Instant>>,
}

impl ShellController {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        host: Arc<dyn HostShell>,
        recorder: Arc<dyn Recorder>,
        transcription: TranscriptionClient,
    ) -> Self {
        Self {
            orchestrator,
            host,
            recorder,
            transcription,
            last_mic_toggle: Mutex::new(None),
        }
    }

    pub async fn handle_shortcut(&self, action: ShortcutAction) {
        match action {
            ShortcutAction::MoveWindow(direction) => self.host.move_window(direction, MOVE_STEP),
            ShortcutAction::TakeScreenshot => self.take_screenshot(),
            ShortcutAction::StartOver => self.start_over(),
            ShortcutAction::SolveScreenshots => {
                self.orchestrator.solve_screenshots().await;
            }
            ShortcutAction::ToggleMic => self.toggle_mic().await,
        }
    }

    fn take_screenshot(&self) {
        let encoded = self
            .host
            .capture_screen()
            .and_then(|frame| queue::encode_capture(&frame.rgba, frame.width, frame.height));
        match encoded {
            Ok(image) => {
                if !self.orchestrator.enqueue_screenshot(image) {
                    log::debug!("duplicate screenshot dropped");
                }
            }
            Err(err) => {
                log::error!("screen capture failed: {}", err);
                self.orchestrator
                    .show_message(&format!("Failed to capture screenshot: {}", err));
            }
        }
    }

    fn start_over(&self) {
        let was_listening = self.orchestrator.view().listening;
        self.orchestrator.start_over();
        if was_listening {
            let _release = ReleaseOnDrop(self.recorder.as_ref());
            if let Err(err) = self.recorder.stop() {
                log::warn!("recorder stop during start-over failed: {}", err);
            }
        }
    }

    async fn toggle_mic(&self) {
        // Physical keys and hotkey repeats double-fire; collapse them.
        {
            let mut last = self.last_mic_toggle.lock();
            let now = Instant::now();
            if let Some(prev) = *last {
                if now.duration_since(prev) < MIC_TOGGLE_DEBOUNCE {
                    return;
                }
            }
            *last = Some(now);
        }

        // The in-flight flag gates user-initiated overlap; the token fence
        // covers whatever overlap happens anyway.
        let view = self.orchestrator.view();
        if view.thinking || self.orchestrator.is_solving() {
            return;
        }

        if view.listening {
            self.stop_recognition().await;
        } else {
            self.start_recognition();
        }
    }

    fn start_recognition(&self) {
        if !self.orchestrator.begin_listening() {
            return;
        }
        if let Err(err) = self.recorder.start() {
            log::error!("failed to start recorder: {}", err);
            let _release = ReleaseOnDrop(self.recorder.as_ref());
            self.orchestrator.end_listening();
        }
    }

    async fn stop_recognition(&self) {
        self.orchestrator.end_listening();

        let audio = {
            let _release = ReleaseOnDrop(self.recorder.as_ref());
            match self.recorder.stop() {
                Ok(audio) => audio,
                Err(err) => {
                    log::error!("recorder stop failed: {}", err);
                    return;
                }
            }
        };
        if audio.is_empty() {
            return;
        }

        match self.transcription.transcribe(audio).await {
            Ok(text) => {
                self.orchestrator.handle_transcript(&text).await;
            }
            Err(err) => {
                log::error!("transcription failed: {}", err);
                self.orchestrator
                    .show_message(&format!("Transcription failed: {}", err));
            }
        }
    }
}
