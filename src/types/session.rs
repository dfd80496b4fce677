use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::types::frame::{Frame, Strip};
use crate::types::phase::BoothPhase;

pub const PHOTOS_PER_STRIP: usize = 3;
pub const MAX_CAPTION_CHARS: usize = 20;
pub const COUNTDOWN_START: u8 = 3;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const SHUTTER_DELAY: Duration = Duration::from_millis(300);
const NEXT_PHOTO_DELAY: Duration = Duration::from_millis(500);
const FLASH_DURATION: Duration = Duration::from_millis(300);

/// Work the session asks its driver to perform. The session itself never
/// touches the camera or the compositor; it hands out commands and receives
/// the results through the `*_succeeded` / `*_failed` / `*_ready` calls.
#[derive(Debug, Clone, PartialEq)]
pub enum BoothCommand {
    /// Grab one still from the active video source.
    CaptureFrame,
    /// Composite the three captured frames into the final strip.
    ComposeStrip { caption: String },
    /// Composite a throwaway preview strip for the caption editor.
    RenderPreview { caption: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    CountdownTick,
    Shutter,
    NextCountdown,
}

/// A single pending timer. Stored explicitly so reset and teardown can
/// cancel it; a cleared deadline can never fire late.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    due: Instant,
    action: TimerAction,
}

/// The capture-sequence state machine. Pure in-memory state plus deadline
/// timers; completely independent of the UI and the camera backend.
pub struct BoothSession {
    id: Uuid,
    phase: BoothPhase,
    countdown: u8,
    photo_index: usize,
    frames: Vec<Frame>,
    caption: String,
    saved_caption: String,
    strip: Option<Strip>,
    preview_strip: Option<Strip>,
    last_error: Option<String>,
    deadline: Option<Deadline>,
    flash_until: Option<Instant>,
}

impl BoothSession {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "booth session created");
        Self {
            id,
            phase: BoothPhase::RequestingPermission,
            countdown: COUNTDOWN_START,
            photo_index: 0,
            frames: Vec::new(),
            caption: String::new(),
            saved_caption: String::new(),
            strip: None,
            preview_strip: None,
            last_error: None,
            deadline: None,
            flash_until: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> BoothPhase {
        self.phase
    }

    pub fn countdown(&self) -> u8 {
        self.countdown
    }

    /// Index of the photo currently being taken (0..3).
    pub fn photo_index(&self) -> usize {
        self.photo_index
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn strip(&self) -> Option<&Strip> {
        self.strip.as_ref()
    }

    pub fn preview_strip(&self) -> Option<&Strip> {
        self.preview_strip.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True while the post-capture flash overlay should be shown.
    pub fn flash_active(&self, now: Instant) -> bool {
        self.flash_until.is_some_and(|until| now < until)
    }

    /// The next instant at which `tick` has work to do, if any. Drivers use
    /// this to schedule their next wakeup.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.due)
    }

    fn transition(&mut self, next: BoothPhase) -> bool {
        if !self.phase.can_transition(next) {
            tracing::warn!(session = %self.id, from = ?self.phase, to = ?next, "rejected phase transition");
            return false;
        }
        tracing::debug!(session = %self.id, from = ?self.phase, to = ?next, "phase transition");
        self.phase = next;
        true
    }

    fn arm(&mut self, due: Instant, action: TimerAction) {
        self.deadline = Some(Deadline { due, action });
    }

    // --- camera lifecycle ---------------------------------------------------

    /// The camera delivered its first frame; the booth is usable.
    pub fn camera_ready(&mut self) {
        if self.phase == BoothPhase::RequestingPermission {
            self.transition(BoothPhase::Ready);
            self.last_error = None;
        }
    }

    /// Camera setup failed or the device disappeared mid-preview.
    pub fn camera_failed(&mut self, message: impl Into<String>) {
        if self.phase.shows_preview() {
            let message = message.into();
            tracing::warn!(session = %self.id, error = %message, "camera unavailable");
            self.deadline = None;
            self.transition(BoothPhase::PermissionDenied);
            self.last_error = Some(message);
        }
    }

    /// Explicit user retry after a denied or unavailable camera.
    pub fn retry_camera(&mut self) {
        if self.phase == BoothPhase::PermissionDenied {
            self.transition(BoothPhase::RequestingPermission);
            self.last_error = None;
        }
    }

    // --- capture loop -------------------------------------------------------

    /// Begin (or resume) the three-photo capture sequence.
    ///
    /// Frames surviving an earlier capture failure are kept: the sequence
    /// resumes at the first missing shot. A stale complete set (possible
    /// after a compositing failure) is discarded and the run starts over.
    pub fn start_capture(&mut self, now: Instant) {
        if self.phase != BoothPhase::Ready {
            return;
        }
        if self.frames.len() >= PHOTOS_PER_STRIP {
            self.frames.clear();
        }
        self.strip = None;
        self.preview_strip = None;
        self.photo_index = self.frames.len();
        self.countdown = COUNTDOWN_START;
        self.last_error = None;
        self.transition(BoothPhase::Countdown);
        self.arm(now + COUNTDOWN_TICK, TimerAction::CountdownTick);
        tracing::info!(session = %self.id, resume_at = self.photo_index, "capture sequence started");
    }

    /// Advance pending timers. Returns a command when the expired timer
    /// requires outside work (grabbing a frame).
    pub fn tick(&mut self, now: Instant) -> Option<BoothCommand> {
        let due = matches!(self.deadline, Some(d) if d.due <= now);
        if !due {
            return None;
        }
        let action = self.deadline.take()?.action;
        match (self.phase, action) {
            (BoothPhase::Countdown, TimerAction::CountdownTick) => {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown == 0 {
                    // Leave the "0" on screen for the shutter delay.
                    self.transition(BoothPhase::TakingPhoto);
                    self.arm(now + SHUTTER_DELAY, TimerAction::Shutter);
                } else {
                    self.arm(now + COUNTDOWN_TICK, TimerAction::CountdownTick);
                }
                None
            }
            (BoothPhase::TakingPhoto, TimerAction::Shutter) => Some(BoothCommand::CaptureFrame),
            (BoothPhase::TakingPhoto, TimerAction::NextCountdown) => {
                self.photo_index = self.frames.len();
                self.countdown = COUNTDOWN_START;
                self.transition(BoothPhase::Countdown);
                self.arm(now + COUNTDOWN_TICK, TimerAction::CountdownTick);
                None
            }
            _ => None,
        }
    }

    /// A frame came back from the capturer.
    pub fn capture_succeeded(&mut self, frame: Frame, now: Instant) -> Option<BoothCommand> {
        if self.phase != BoothPhase::TakingPhoto || self.frames.len() >= PHOTOS_PER_STRIP {
            return None;
        }
        self.frames.push(frame);
        self.flash_until = Some(now + FLASH_DURATION);
        tracing::info!(session = %self.id, photo = self.frames.len(), "frame captured");
        if self.frames.len() < PHOTOS_PER_STRIP {
            self.arm(now + NEXT_PHOTO_DELAY, TimerAction::NextCountdown);
            None
        } else {
            self.transition(BoothPhase::Processing);
            Some(BoothCommand::ComposeStrip {
                caption: String::new(),
            })
        }
    }

    /// No frame could be read. Already-captured frames are preserved; the
    /// next `start_capture` resumes at the failed shot.
    pub fn capture_failed(&mut self, message: impl Into<String>) {
        if self.phase != BoothPhase::TakingPhoto {
            return;
        }
        let message = message.into();
        tracing::warn!(session = %self.id, error = %message, kept = self.frames.len(), "capture failed");
        self.deadline = None;
        self.transition(BoothPhase::Ready);
        self.last_error = Some(message);
    }

    // --- compositing --------------------------------------------------------

    /// The compositor produced the final strip.
    pub fn strip_ready(&mut self, strip: Strip) {
        if self.phase != BoothPhase::Processing {
            return;
        }
        tracing::info!(session = %self.id, width = strip.width, height = strip.height, "strip composited");
        self.strip = Some(strip);
        self.preview_strip = None;
        self.saved_caption = self.caption.clone();
        self.transition(BoothPhase::Complete);
    }

    /// Compositing failed; no partial strip is kept.
    pub fn compose_failed(&mut self, message: impl Into<String>) {
        if self.phase != BoothPhase::Processing {
            return;
        }
        let message = message.into();
        tracing::warn!(session = %self.id, error = %message, "compositing failed");
        self.strip = None;
        self.preview_strip = None;
        self.transition(BoothPhase::Ready);
        self.last_error = Some(message);
    }

    // --- captioning ---------------------------------------------------------

    /// Open the caption editor over the finished strip.
    pub fn begin_caption(&mut self) -> Option<BoothCommand> {
        if self.phase != BoothPhase::Complete || self.strip.is_none() {
            return None;
        }
        self.transition(BoothPhase::AddingCaption);
        Some(BoothCommand::RenderPreview {
            caption: self.caption.clone(),
        })
    }

    /// Apply a caption edit. Edits beyond [`MAX_CAPTION_CHARS`] are rejected
    /// outright (never truncated); accepted edits re-render the preview.
    pub fn edit_caption(&mut self, text: &str) -> Option<BoothCommand> {
        if self.phase != BoothPhase::AddingCaption {
            return None;
        }
        if text.chars().count() > MAX_CAPTION_CHARS {
            return None;
        }
        if text == self.caption {
            return None;
        }
        self.caption = text.to_string();
        Some(BoothCommand::RenderPreview {
            caption: self.caption.clone(),
        })
    }

    /// The compositor produced a caption-editor preview.
    pub fn preview_ready(&mut self, strip: Strip) {
        if self.phase == BoothPhase::AddingCaption {
            self.preview_strip = Some(strip);
        }
    }

    /// Bake the caption into a fresh strip.
    pub fn save_caption(&mut self) -> Option<BoothCommand> {
        if self.phase != BoothPhase::AddingCaption {
            return None;
        }
        self.transition(BoothPhase::Processing);
        Some(BoothCommand::ComposeStrip {
            caption: self.caption.clone(),
        })
    }

    /// Leave the caption editor, dropping unsaved edits. The stored strip is
    /// untouched.
    pub fn cancel_caption(&mut self) {
        if self.phase != BoothPhase::AddingCaption {
            return;
        }
        self.caption = self.saved_caption.clone();
        self.preview_strip = None;
        self.transition(BoothPhase::Complete);
    }

    // --- reset --------------------------------------------------------------

    /// Full reset back to `Ready`: frames, caption, strip, errors and any
    /// pending timer are all discarded.
    pub fn reset(&mut self) {
        if !matches!(self.phase, BoothPhase::Complete | BoothPhase::Ready) {
            return;
        }
        tracing::info!(session = %self.id, "booth reset");
        self.frames.clear();
        self.caption.clear();
        self.saved_caption.clear();
        self.strip = None;
        self.preview_strip = None;
        self.last_error = None;
        self.deadline = None;
        self.flash_until = None;
        self.photo_index = 0;
        self.countdown = COUNTDOWN_START;
        if self.phase == BoothPhase::Complete {
            self.transition(BoothPhase::Ready);
        }
    }
}

impl Default for BoothSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        Frame::new(vec![0xFF, 0xD8, 0xFF], 4, 4)
    }

    fn ready_session() -> BoothSession {
        let mut s = BoothSession::new();
        s.camera_ready();
        assert_eq!(s.phase(), BoothPhase::Ready);
        s
    }

    /// Drive one countdown round until the session asks for a frame.
    fn run_until_capture(s: &mut BoothSession, mut now: Instant) -> Instant {
        for _ in 0..64 {
            if let Some(cmd) = s.tick(now) {
                assert_eq!(cmd, BoothCommand::CaptureFrame);
                return now;
            }
            now += Duration::from_millis(100);
        }
        panic!("session never requested a capture");
    }

    fn completed_session() -> BoothSession {
        let mut s = ready_session();
        let mut now = Instant::now();
        s.start_capture(now);
        for _ in 0..PHOTOS_PER_STRIP {
            now = run_until_capture(&mut s, now);
            s.capture_succeeded(test_frame(), now);
        }
        s.strip_ready(Strip::new(vec![1], 800, 2180));
        assert_eq!(s.phase(), BoothPhase::Complete);
        s
    }

    #[test]
    fn full_sequence_captures_exactly_three_frames() {
        let mut s = ready_session();
        let mut now = Instant::now();
        s.start_capture(now);
        assert_eq!(s.phase(), BoothPhase::Countdown);
        assert_eq!(s.countdown(), COUNTDOWN_START);

        for i in 0..PHOTOS_PER_STRIP {
            assert_eq!(s.photo_index(), i);
            now = run_until_capture(&mut s, now);
            let cmd = s.capture_succeeded(test_frame(), now);
            if i < PHOTOS_PER_STRIP - 1 {
                assert_eq!(cmd, None);
            } else {
                // Compositing is triggered with exactly three frames in hand.
                assert_eq!(s.frames().len(), PHOTOS_PER_STRIP);
                assert_eq!(
                    cmd,
                    Some(BoothCommand::ComposeStrip {
                        caption: String::new()
                    })
                );
            }
        }

        assert_eq!(s.phase(), BoothPhase::Processing);
        s.strip_ready(Strip::new(vec![1], 800, 2180));
        assert_eq!(s.phase(), BoothPhase::Complete);
        assert!(s.strip().is_some());
    }

    #[test]
    fn countdown_decrements_once_per_second() {
        let mut s = ready_session();
        let t0 = Instant::now();
        s.start_capture(t0);
        assert_eq!(s.countdown(), 3);

        assert!(s.tick(t0 + Duration::from_millis(999)).is_none());
        assert_eq!(s.countdown(), 3);

        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.countdown(), 2);
        s.tick(t0 + Duration::from_secs(2));
        assert_eq!(s.countdown(), 1);
        s.tick(t0 + Duration::from_secs(3));
        assert_eq!(s.countdown(), 0);
        assert_eq!(s.phase(), BoothPhase::TakingPhoto);
    }

    #[test]
    fn no_fourth_frame_is_accepted() {
        let mut s = ready_session();
        let mut now = Instant::now();
        s.start_capture(now);
        for _ in 0..PHOTOS_PER_STRIP {
            now = run_until_capture(&mut s, now);
            s.capture_succeeded(test_frame(), now);
        }
        assert_eq!(s.frames().len(), PHOTOS_PER_STRIP);
        assert!(s.capture_succeeded(test_frame(), now).is_none());
        assert_eq!(s.frames().len(), PHOTOS_PER_STRIP);
    }

    #[test]
    fn capture_failure_keeps_frames_and_resumes() {
        let mut s = ready_session();
        let mut now = Instant::now();
        s.start_capture(now);
        now = run_until_capture(&mut s, now);
        s.capture_succeeded(test_frame(), now);

        // The second shot fails at the shutter.
        run_until_capture(&mut s, now);
        s.capture_failed("no frame available");
        assert_eq!(s.phase(), BoothPhase::Ready);
        assert_eq!(s.frames().len(), 1);
        assert!(s.last_error().is_some());

        // Restart resumes at the failed shot.
        s.start_capture(now);
        assert_eq!(s.photo_index(), 1);
        assert_eq!(s.frames().len(), 1);
    }

    #[test]
    fn cancelled_deadlines_never_fire() {
        let mut s = ready_session();
        let now = Instant::now();
        s.start_capture(now);
        s.capture_failed("x"); // not in TakingPhoto: ignored
        assert_eq!(s.phase(), BoothPhase::Countdown);

        // Reach the shutter, fail it; the pending deadline must die with it.
        let shutter_at = run_until_capture(&mut s, now);
        s.capture_failed("no frame");
        assert_eq!(s.phase(), BoothPhase::Ready);
        assert!(s.next_deadline().is_none());
        assert!(s.tick(shutter_at + Duration::from_secs(60)).is_none());
        assert_eq!(s.phase(), BoothPhase::Ready);
    }

    #[test]
    fn caption_over_limit_is_rejected_not_truncated() {
        let mut s = completed_session();
        s.begin_caption();
        assert_eq!(s.phase(), BoothPhase::AddingCaption);

        let ok = "twenty characters ok";
        assert_eq!(ok.chars().count(), 20);
        assert!(s.edit_caption(ok).is_some());
        assert_eq!(s.caption(), ok);

        let too_long = "twenty-one characters";
        assert_eq!(too_long.chars().count(), 21);
        assert!(s.edit_caption(too_long).is_none());
        assert_eq!(s.caption(), ok);
    }

    #[test]
    fn caption_limit_counts_chars_not_bytes() {
        let mut s = completed_session();
        s.begin_caption();
        let accents = "âéîôû âéîôû âéîôû âé";
        assert_eq!(accents.chars().count(), 20);
        assert!(accents.len() > 20);
        assert!(s.edit_caption(accents).is_some());
    }

    #[test]
    fn saving_caption_recomposites_and_returns_to_complete() {
        let mut s = completed_session();
        let first = s.strip().cloned().unwrap();

        s.begin_caption();
        s.edit_caption("summer 2025");
        s.preview_ready(Strip::new(vec![9], 800, 2480));
        assert!(s.preview_strip().is_some());
        // Live preview never replaces the stored strip.
        assert_eq!(s.strip(), Some(&first));

        let cmd = s.save_caption();
        assert_eq!(
            cmd,
            Some(BoothCommand::ComposeStrip {
                caption: "summer 2025".into()
            })
        );
        assert_eq!(s.phase(), BoothPhase::Processing);
        s.strip_ready(Strip::new(vec![2], 800, 2480));
        assert_eq!(s.phase(), BoothPhase::Complete);
        assert_ne!(s.strip(), Some(&first));
        assert!(s.preview_strip().is_none());
    }

    #[test]
    fn cancelling_caption_restores_saved_text() {
        let mut s = completed_session();
        s.begin_caption();
        s.edit_caption("scratch that");
        s.cancel_caption();
        assert_eq!(s.phase(), BoothPhase::Complete);
        assert_eq!(s.caption(), "");
        assert!(s.preview_strip().is_none());
    }

    #[test]
    fn reset_returns_to_ready_with_nothing_kept() {
        let mut s = completed_session();
        s.reset();
        assert_eq!(s.phase(), BoothPhase::Ready);
        assert!(s.frames().is_empty());
        assert!(s.strip().is_none());
        assert_eq!(s.caption(), "");
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn permission_denied_then_retry() {
        let mut s = BoothSession::new();
        s.camera_failed("Permission denied by user");
        assert_eq!(s.phase(), BoothPhase::PermissionDenied);
        assert!(!s.last_error().unwrap_or_default().is_empty());

        s.retry_camera();
        assert_eq!(s.phase(), BoothPhase::RequestingPermission);
        assert!(s.last_error().is_none());
    }

    #[test]
    fn camera_loss_during_preview_is_surfaced() {
        let mut s = ready_session();
        s.camera_failed("device unplugged");
        assert_eq!(s.phase(), BoothPhase::PermissionDenied);
    }

    #[test]
    fn start_capture_outside_ready_is_ignored() {
        let mut s = BoothSession::new();
        s.start_capture(Instant::now());
        assert_eq!(s.phase(), BoothPhase::RequestingPermission);
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn flash_expires() {
        let mut s = ready_session();
        let mut now = Instant::now();
        s.start_capture(now);
        now = run_until_capture(&mut s, now);
        s.capture_succeeded(test_frame(), now);
        assert!(s.flash_active(now));
        assert!(!s.flash_active(now + Duration::from_secs(1)));
    }
}
