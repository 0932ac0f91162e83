//! User-facing notification sink.
//!
//! The core reports outcomes through [`Notifier`] with three severities; the
//! rendering layer decides how to show them. [`TracingNotifier`] is the
//! default sink used by the CLI.

use std::fmt::{Display, Formatter};

use serde_json::Value;
use tracing::{error, info};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation completed.
    Success,
    /// Operation failed.
    Error,
    /// Neutral information.
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        })
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, severity: Severity, title: &str, detail: Option<&Value>);

    /// Report a successful operation.
    fn success(&self, title: &str, detail: Option<&Value>) {
        self.notify(Severity::Success, title, detail);
    }

    /// Report a failure.
    fn error(&self, title: &str, detail: Option<&Value>) {
        self.notify(Severity::Error, title, detail);
    }

    /// Report neutral information.
    fn info(&self, title: &str, detail: Option<&Value>) {
        self.notify(Severity::Info, title, detail);
    }
}

/// Notifier that emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, title: &str, detail: Option<&Value>) {
        let detail = detail.map(Value::to_string).unwrap_or_default();
        match severity {
            Severity::Error => error!(%severity, detail = %detail, "{title}"),
            Severity::Success | Severity::Info => info!(%severity, detail = %detail, "{title}"),
        }
    }
}
