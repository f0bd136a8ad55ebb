//! Notification port.
//!
//! Delivery is fire-and-forget: the core logs a failed notification and
//! carries on with its state unchanged.

use std::cell::RefCell;
use std::error::Error;

pub type NotifyResult = Result<(), Box<dyn Error + Send + Sync>>;

pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> NotifyResult;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, title: &str, message: &str) -> NotifyResult {
        (**self).notify(title, message)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, title: &str, message: &str) -> NotifyResult {
        (**self).notify(title, message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str) -> NotifyResult {
        Ok(())
    }
}

/// Emits notifications as `info` log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> NotifyResult {
        tracing::info!(target: "momentum::notify", "{title}: {message}");
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) -> NotifyResult {
        self.sent
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.notify("a", "1").unwrap();
        n.notify("b", "2").unwrap();
        assert_eq!(n.titles(), vec!["a".to_string(), "b".to_string()]);
        n.clear();
        assert!(n.sent().is_empty());
    }

    #[test]
    fn boxed_notifier_delegates() {
        let boxed: Box<dyn Notifier> = Box::new(NoopNotifier);
        assert!(boxed.notify("t", "m").is_ok());
    }
}
