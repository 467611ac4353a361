//! View-layer callbacks raised by the request wrapper.
//!
//! The wrapper never renders anything itself. When a session dies it asks
//! the host to show a notification and to navigate to the login entry
//! point; hosts plug in by implementing [`SessionEvents`].

use parking_lot::Mutex;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Host hooks for notifications and navigation.
pub trait SessionEvents: Send + Sync {
    /// Show a transient notification to the user.
    fn notify(&self, level: NoticeLevel, message: &str);

    /// Send the user to `route` (full navigation, not a soft transition).
    fn navigate(&self, route: &str);
}

/// Default hooks: write everything to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl SessionEvents for TracingEvents {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Success => tracing::info!(%message, "notification"),
            NoticeLevel::Warning => tracing::warn!(%message, "notification"),
            NoticeLevel::Error => tracing::error!(%message, "notification"),
        }
    }

    fn navigate(&self, route: &str) {
        tracing::info!(%route, "navigate");
    }
}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Notice(NoticeLevel, String),
    Navigate(String),
}

/// Hooks that remember every call, in order. Useful for headless hosts that
/// inspect what would have been shown, and for tests.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Routes navigated to so far.
    pub fn navigations(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Navigate(route) => Some(route.clone()),
                SessionEvent::Notice(..) => None,
            })
            .collect()
    }
}

impl SessionEvents for RecordingEvents {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.events
            .lock()
            .push(SessionEvent::Notice(level, message.to_string()));
    }

    fn navigate(&self, route: &str) {
        self.events
            .lock()
            .push(SessionEvent::Navigate(route.to_string()));
    }
}
