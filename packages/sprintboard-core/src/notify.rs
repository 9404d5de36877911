/// Short-lived user feedback (toast, banner, ...). Presentation is up to the
/// implementation.
use serde::Serialize;

use crate::types::NotificationKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NotificationKind::Error => log::error!(target: "sprintboard.notice", "{}", notice.message),
            NotificationKind::Warning => log::warn!(target: "sprintboard.notice", "{}", notice.message),
            _ => log::info!(target: "sprintboard.notice", "{}", notice.message),
        }
    }
}

/// Forwards notices to a UI task listening on the channel.
impl Notifier for tokio::sync::mpsc::UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        if self.send(notice).is_err() {
            log::debug!(target: "sprintboard.notice", "notice dropped, receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.notify(Notice::error("boom"));
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.kind, NotificationKind::Error);
        assert_eq!(notice.message, "boom");
    }

    #[test]
    fn test_channel_notifier_tolerates_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Notice>();
        drop(rx);
        tx.notify(Notice::success("ok"));
    }
}
