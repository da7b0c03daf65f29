// src/toast.rs
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    shown_at: Instant,
}

/// Transient notices; each lives for `duration` after it is posted.
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    duration: Duration,
}

impl ToastQueue {
    pub fn new(duration: Duration) -> Self {
        Self { toasts: VecDeque::new(), duration }
    }

    pub fn post(&mut self, level: ToastLevel, text: impl Into<String>, now: Instant) {
        let text = text.into();
        log::debug!("toast: {text}");
        self.toasts.push_back(Toast { text, level, shown_at: now });
    }

    /// Drops expired toasts and returns the ones still visible, oldest first.
    pub fn active(&mut self, now: Instant) -> impl Iterator<Item = &Toast> {
        let duration = self.duration;
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < duration);
        self.toasts.iter()
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }
}
