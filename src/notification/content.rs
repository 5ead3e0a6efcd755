//! Notification content construction.
//!
//! Content travels through the broker as a `Notification` payload of the form
//! `summary\nbody`.

use super::error::NotificationError;

/// Maximum length for tags shown in notifications.
const MAX_TAG_LENGTH: usize = 100;

/// Body of the end-of-run notification.
pub const COMPLETION_BODY: &str = "Congratulations on the study session! You deserve a break.";

/// Summary and body of one desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub summary: String,
    pub body: String,
}

impl NotificationContent {
    pub fn new(summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            body: body.into(),
        }
    }

    /// Encodes the content as a broker payload.
    pub fn to_payload(&self) -> String {
        format!("{}\n{}", self.summary, self.body)
    }

    /// Decodes a broker payload. The body may be empty; the summary may not.
    pub fn from_payload(payload: &str) -> Result<Self, NotificationError> {
        let (summary, body) = payload.split_once('\n').unwrap_or((payload, ""));
        if summary.trim().is_empty() {
            return Err(NotificationError::InvalidInput(
                "empty summary".to_string(),
            ));
        }
        Ok(Self::new(summary, body))
    }
}

/// What the run counted, for the completion summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    /// A fixed run of this many minutes.
    Timer { minutes: u32 },
    /// A cycle run of this many pomodoros.
    Pomodoros { count: u32 },
}

/// Builds the end-of-run notification.
///
/// `Timer of 25 minutes finished for task work.` or `4 pomodoros finished.`
pub fn completion_content(summary: RunSummary, tag: Option<&str>) -> NotificationContent {
    let mut text = match summary {
        RunSummary::Timer { minutes } => format!("Timer of {minutes} minutes finished"),
        RunSummary::Pomodoros { count } => format!("{count} pomodoros finished"),
    };
    match tag.map(truncate_tag).filter(|t| !t.is_empty()) {
        Some(tag) => text.push_str(&format!(" for task {tag}.")),
        None => text.push('.'),
    }
    NotificationContent::new(text, COMPLETION_BODY)
}

fn truncate_tag(tag: &str) -> &str {
    match tag.char_indices().nth(MAX_TAG_LENGTH) {
        Some((index, _)) => &tag[..index],
        None => tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_summary_with_tag() {
        let content = completion_content(RunSummary::Timer { minutes: 25 }, Some("work"));
        assert_eq!(content.summary, "Timer of 25 minutes finished for task work.");
        assert_eq!(content.body, COMPLETION_BODY);
    }

    #[test]
    fn test_pomodoro_summary_without_tag() {
        let content = completion_content(RunSummary::Pomodoros { count: 4 }, None);
        assert_eq!(content.summary, "4 pomodoros finished.");

        let content = completion_content(RunSummary::Pomodoros { count: 2 }, Some(""));
        assert_eq!(content.summary, "2 pomodoros finished.");
    }

    #[test]
    fn test_long_tag_is_truncated() {
        let tag = "あ".repeat(150);
        let content = completion_content(RunSummary::Timer { minutes: 1 }, Some(&tag));
        assert_eq!(content.summary.matches('あ').count(), MAX_TAG_LENGTH);
    }

    #[test]
    fn test_payload_round_trip_keeps_body_lines() {
        let content = NotificationContent::new("Done", "line one\nline two");
        let decoded = NotificationContent::from_payload(&content.to_payload()).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_payload_without_body() {
        let decoded = NotificationContent::from_payload("Done").unwrap();
        assert_eq!(decoded.body, "");
    }

    #[test]
    fn test_empty_summary_is_rejected() {
        assert!(NotificationContent::from_payload("\nbody").is_err());
    }
}
