//! 运行摘要与通知正文

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountFailure, AccountOutcome};

/// 通知主题最长字符数
pub const MAX_SUBJECT_CHARS: usize = 100;

/// 投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// `attach_direct` / `link_external`
    pub strategy: String,
    /// 是否先打包成 zip
    pub archived: bool,
    pub notifications_sent: usize,
    pub artifacts_delivered: usize,
    /// 链接投递时上传的对象键
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_keys: Vec<String>,
}

/// 一次盘点运行的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub accounts_processed: usize,
    pub rows_total: usize,
    pub batches_produced: usize,
    /// dry-run 或取消时为空
    pub delivery: Option<DeliveryReport>,
    pub accounts: Vec<AccountOutcome>,
    pub failures: Vec<AccountFailure>,
}

/// 通知的主题与正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMessage {
    pub subject: String,
    pub body: String,
}

impl ReportMessage {
    /// Subject is truncated to [`MAX_SUBJECT_CHARS`].
    pub fn new(subject: &str, body: impl Into<String>) -> Self {
        Self {
            subject: truncate_chars(subject, MAX_SUBJECT_CHARS),
            body: body.into(),
        }
    }

    /// Subject of part `index` (1-based) out of `total`; unchanged when `total <= 1`.
    pub fn part_subject(&self, index: usize, total: usize) -> String {
        if total <= 1 {
            return self.subject.clone();
        }
        let suffix = format!(" (part {index}/{total})");
        let room = MAX_SUBJECT_CHARS.saturating_sub(suffix.chars().count());
        format!("{}{suffix}", truncate_chars(&self.subject, room))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_truncated() {
        let msg = ReportMessage::new(&"x".repeat(150), "");
        assert_eq!(msg.subject.chars().count(), MAX_SUBJECT_CHARS);
    }

    #[test]
    fn part_subject_keeps_suffix_within_limit() {
        let msg = ReportMessage::new("[Ops] DNS Inventory 2024-05-01", "");
        assert_eq!(msg.part_subject(1, 1), "[Ops] DNS Inventory 2024-05-01");
        assert_eq!(
            msg.part_subject(2, 3),
            "[Ops] DNS Inventory 2024-05-01 (part 2/3)"
        );

        let long = ReportMessage::new(&"y".repeat(100), "");
        let subject = long.part_subject(1, 2);
        assert_eq!(subject.chars().count(), MAX_SUBJECT_CHARS);
        assert!(subject.ends_with(" (part 1/2)"));
    }
}
