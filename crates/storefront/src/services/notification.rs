//! User-facing notifications (toasts).
//!
//! Failures are reported to the shopper as a short, generic message; the
//! underlying error stays in the logs.

use serde::Serialize;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A toast shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    /// An error toast.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// A success toast.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// Value for an `HX-Trigger` header carrying this toast.
    #[must_use]
    pub fn hx_trigger(&self) -> String {
        serde_json::json!({ "toast": self }).to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hx_trigger_shape() {
        let toast = Notification::error("Nope");
        let value: serde_json::Value = serde_json::from_str(&toast.hx_trigger()).unwrap();
        assert_eq!(value["toast"]["level"], "error");
        assert_eq!(value["toast"]["message"], "Nope");
    }
}
