//! 账号相关类型定义

use serde::{Deserialize, Serialize};

use dns_inventory_provider::DirectoryAccount;

/// 被盘点的远程账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// 12 位账号 ID
    pub id: String,
    /// 显示名称，缺省为账号 ID
    pub label: String,
}

impl Account {
    pub fn new(id: impl Into<String>, label: Option<String>) -> Self {
        let id = id.into();
        let label = label.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| id.clone());
        Self { id, label }
    }
}

impl From<DirectoryAccount> for Account {
    fn from(account: DirectoryAccount) -> Self {
        Self::new(account.id, Some(account.name))
    }
}

/// 单个账号的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFailure {
    pub account_id: String,
    /// 失败类别（`CoreError::kind`）
    pub kind: String,
    pub cause: String,
}

/// 单个账号的盘点结果（失败账号的计数为 -1）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOutcome {
    pub account_id: String,
    pub label: String,
    pub zone_count: i64,
    pub record_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccountOutcome {
    /// Sentinel outcome of a failed account.
    pub fn failed(account: &Account, error: impl Into<String>) -> Self {
        Self {
            account_id: account.id.clone(),
            label: account.label.clone(),
            zone_count: -1,
            record_count: -1,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_defaults_to_id() {
        assert_eq!(Account::new("111122223333", None).label, "111122223333");
        assert_eq!(
            Account::new("111122223333", Some("  ".to_string())).label,
            "111122223333"
        );
        assert_eq!(Account::new("1", Some("prod".to_string())).label, "prod");
    }

    #[test]
    fn failed_outcome_uses_sentinels() {
        let outcome = AccountOutcome::failed(&Account::new("1", None), "denied");
        assert_eq!(outcome.zone_count, -1);
        assert_eq!(outcome.record_count, -1);
        assert!(outcome.is_failed());
    }
}
