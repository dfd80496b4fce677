/// The closed set of states the booth moves through.
///
/// The flow is linear: permission request, live preview, three
/// countdown-and-snapshot rounds, compositing, completion. Captioning is an
/// optional detour from `Complete` back to `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoothPhase {
    RequestingPermission,
    PermissionDenied,
    Ready,
    Countdown,
    TakingPhoto,
    Processing,
    Complete,
    AddingCaption,
}

impl BoothPhase {
    /// Explicit transition table. Anything not listed here is rejected by
    /// the session, so ad hoc phase jumps cannot creep in.
    pub fn can_transition(self, next: BoothPhase) -> bool {
        use BoothPhase::*;
        matches!(
            (self, next),
            (RequestingPermission, Ready)
                | (RequestingPermission, PermissionDenied)
                | (PermissionDenied, RequestingPermission)
                | (Ready, PermissionDenied)
                | (Countdown, PermissionDenied)
                | (TakingPhoto, PermissionDenied)
                | (Ready, Countdown)
                | (Countdown, TakingPhoto)
                | (TakingPhoto, Countdown)
                | (TakingPhoto, Processing)
                | (TakingPhoto, Ready)
                | (Processing, Complete)
                | (Processing, Ready)
                | (Complete, AddingCaption)
                | (Complete, Ready)
                | (AddingCaption, Processing)
                | (AddingCaption, Complete)
        )
    }

    /// True while the live camera feed should be on screen.
    pub fn shows_preview(self) -> bool {
        matches!(
            self,
            BoothPhase::RequestingPermission
                | BoothPhase::Ready
                | BoothPhase::Countdown
                | BoothPhase::TakingPhoto
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BoothPhase::*;

    #[test]
    fn capture_loop_transitions_are_allowed() {
        assert!(RequestingPermission.can_transition(Ready));
        assert!(Ready.can_transition(Countdown));
        assert!(Countdown.can_transition(TakingPhoto));
        assert!(TakingPhoto.can_transition(Countdown));
        assert!(TakingPhoto.can_transition(Processing));
        assert!(Processing.can_transition(Complete));
    }

    #[test]
    fn caption_detour_returns_to_complete() {
        assert!(Complete.can_transition(AddingCaption));
        assert!(AddingCaption.can_transition(Complete));
        assert!(AddingCaption.can_transition(Processing));
    }

    #[test]
    fn failure_paths_recover() {
        assert!(RequestingPermission.can_transition(PermissionDenied));
        assert!(PermissionDenied.can_transition(RequestingPermission));
        assert!(TakingPhoto.can_transition(Ready));
        assert!(Processing.can_transition(Ready));
        // Camera loss mid-preview is surfaced like a denied permission.
        assert!(Ready.can_transition(PermissionDenied));
        assert!(Countdown.can_transition(PermissionDenied));
        assert!(TakingPhoto.can_transition(PermissionDenied));
    }

    #[test]
    fn nonsense_transitions_are_rejected() {
        assert!(!Ready.can_transition(Complete));
        assert!(!Countdown.can_transition(Processing));
        assert!(!Complete.can_transition(Countdown));
        assert!(!PermissionDenied.can_transition(Ready));
        assert!(!AddingCaption.can_transition(Ready));
    }

    #[test]
    fn preview_is_visible_through_the_capture_loop() {
        assert!(RequestingPermission.shows_preview());
        assert!(Ready.shows_preview());
        assert!(Countdown.shows_preview());
        assert!(TakingPhoto.shows_preview());
        assert!(!Processing.shows_preview());
        assert!(!Complete.shows_preview());
        assert!(!AddingCaption.shows_preview());
    }
}
