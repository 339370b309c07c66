use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{info, warn};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);
const FADE_DURATION: Duration = Duration::from_millis(300);
const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created: Instant,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    toasts: VecDeque<Toast>,
    alert: Option<String>,
    duration: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl Notifications {
    pub fn new(duration: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            alert: None,
            duration,
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.notify_at(message, kind, Instant::now());
    }

    pub fn notify_at(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        let message = message.into();
        info!(?kind, "{message}");
        self.toasts.push_back(Toast {
            message,
            kind,
            created: now,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    /// Raises a blocking alert. A newer alert replaces an undismissed one.
    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("alert: {message}");
        self.alert = Some(message);
    }

    pub fn current_alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Drops toasts whose display and fade-out have both elapsed.
    pub fn prune(&mut self, now: Instant) {
        let lifetime = self.duration + FADE_DURATION;
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.created) < lifetime);
    }

    /// Live toasts, each flagged `true` while it is fading out.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = (&Toast, bool)> {
        let duration = self.duration;
        self.toasts.iter().filter_map(move |toast| {
            let age = now.saturating_duration_since(toast.created);
            if age >= duration + FADE_DURATION {
                None
            } else {
                Some((toast, age >= duration))
            }
        })
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
        self.alert = None;
    }
}
