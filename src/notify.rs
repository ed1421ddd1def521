use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyLevel::Success => f.write_str("success"),
            NotifyLevel::Warning => f.write_str("warning"),
            NotifyLevel::Error => f.write_str("error"),
        }
    }
}

/// User-visible notification sink (toasts in the browser client).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotifyLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NotifyLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotifyLevel::Error, message);
    }
}

/// Routes notifications to the log. Used by headless consumers such as the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Success => info!(target: "notify", "{}", message),
            NotifyLevel::Warning => warn!(target: "notify", "{}", message),
            NotifyLevel::Error => error!(target: "notify", "{}", message),
        }
    }
}
