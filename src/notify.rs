//! Transient save notification.
//!
//! A single-slot message with a fixed visibility window: showing a new
//! message replaces the current one and restarts the clock. The host loop
//! calls [`NotificationTimer::clear_expired`] on its tick.

use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;

/// How long a notification stays fully visible.
pub const DISPLAY_MS: u64 = 2000;
/// Grace period after the display window for the host's exit transition.
pub const EXIT_GRACE_MS: u64 = 300;

/// Single-slot expiring notification.
pub struct NotificationTimer {
    current: Option<(Cow<'static, str>, Instant)>,
    window: Duration,
}

impl Default for NotificationTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DISPLAY_MS + EXIT_GRACE_MS))
    }
}

impl NotificationTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            current: None,
            window,
        }
    }

    /// Show a message, replacing any current one and restarting its window.
    pub fn show(&mut self, message: impl Into<Cow<'static, str>>) {
        let message = message.into();
        tracing::debug!(message = %message, "Showing notification");
        self.current = Some((message, Instant::now()));
    }

    /// The currently visible message, if any. Does not check expiry; the
    /// host clears on tick via [`clear_expired`](Self::clear_expired).
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|(message, _)| message.as_ref())
    }

    /// Clear the message if its window has elapsed. Returns true when a
    /// message was cleared, so the host knows to redraw.
    pub fn clear_expired(&mut self) -> bool {
        match &self.current {
            Some((_, shown_at)) if shown_at.elapsed() >= self.window => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the current message unconditionally.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn test_message_visible_within_window() {
        let mut timer = NotificationTimer::default();
        timer.show("Bookmark saved!");

        time::advance(Duration::from_millis(DISPLAY_MS)).await;

        // Still inside the exit grace period.
        assert!(!timer.clear_expired());
        assert_eq!(timer.message(), Some("Bookmark saved!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_cleared_after_full_window() {
        let mut timer = NotificationTimer::default();
        timer.show("Bookmark saved!");

        time::advance(Duration::from_millis(DISPLAY_MS + EXIT_GRACE_MS)).await;

        assert!(timer.clear_expired());
        assert_eq!(timer.message(), None);
        // Second tick has nothing left to clear.
        assert!(!timer.clear_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_replaces_and_restarts_window() {
        let mut timer = NotificationTimer::default();
        timer.show("first");

        time::advance(Duration::from_millis(1500)).await;
        timer.show("second");

        // Past the first message's deadline, but the second restarted the
        // clock.
        time::advance(Duration::from_millis(1000)).await;
        assert!(!timer.clear_expired());
        assert_eq!(timer.message(), Some("second"));

        time::advance(Duration::from_millis(1300)).await;
        assert!(timer.clear_expired());
        assert_eq!(timer.message(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_unconditional() {
        let mut timer = NotificationTimer::default();
        timer.show("Bookmark saved!");

        timer.clear();
        assert_eq!(timer.message(), None);
    }
}
