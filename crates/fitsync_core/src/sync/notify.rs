//! User-facing notification channel.

use log::{info, warn};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one short message per mutation outcome.
pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity);
}

/// Notifier that only writes to the log; used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => info!("event=notify module=sync severity=success message={message}"),
            Severity::Error => warn!("event=notify module=sync severity=error message={message}"),
        }
    }
}
