//! 区域/记录盘点类型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dns_inventory_provider::{HostedZone, RecordSet};

use super::Account;

/// 托管区域（`id` 已去掉 `/hostedzone/` 前缀）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub account_id: String,
    pub is_private: bool,
    /// API 返回的记录数提示
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

impl Zone {
    pub fn from_hosted(zone: HostedZone, account_id: &str) -> Self {
        Self {
            id: zone.id,
            name: zone.name,
            account_id: account_id.to_string(),
            is_private: zone.is_private,
            record_count: zone.record_count,
        }
    }
}

/// 记录集
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub zone_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: Option<u32>,
    /// API 顺序，不去重
    pub values: Vec<String>,
    pub routing_attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn from_record_set(set: RecordSet, zone_id: &str) -> Self {
        let mut routing_attributes = set.routing;
        if let Some(alias) = set.alias_target {
            routing_attributes.insert("alias_target".to_string(), alias.dns_name);
            routing_attributes.insert("alias_hosted_zone_id".to_string(), alias.hosted_zone_id);
            routing_attributes.insert(
                "evaluate_target_health".to_string(),
                alias.evaluate_target_health.to_string(),
            );
        }
        Self {
            zone_id: zone_id.to_string(),
            name: set.name,
            record_type: set.record_type,
            ttl: set.ttl,
            values: set.values,
            routing_attributes,
        }
    }

    /// `;`-joined values, or `ALIAS-><target>` for alias records.
    pub fn values_joined(&self) -> String {
        if self.values.is_empty()
            && let Some(target) = self.routing_attributes.get("alias_target")
        {
            return format!("ALIAS->{target}");
        }
        self.values.join(";")
    }
}

/// 报表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "AccountId")]
    pub account_id: String,
    #[serde(rename = "ZoneId")]
    pub zone_id: String,
    #[serde(rename = "ZoneName")]
    pub zone_name: String,
    #[serde(rename = "PrivateZone")]
    pub is_private: bool,
    #[serde(rename = "RecordName")]
    pub record_name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "TTL")]
    pub ttl: Option<u32>,
    #[serde(rename = "Values")]
    pub values_joined: String,
}

impl Row {
    pub fn new(zone: &Zone, record: &Record) -> Self {
        Self {
            account_id: zone.account_id.clone(),
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
            is_private: zone.is_private,
            record_name: record.name.clone(),
            record_type: record.record_type.clone(),
            ttl: record.ttl,
            values_joined: record.values_joined(),
        }
    }
}

/// 单个区域的盘点结果
#[derive(Debug, Clone)]
pub struct ZoneInventory {
    pub zone: Zone,
    pub rows: Vec<Row>,
}

/// 单个账号的盘点结果
#[derive(Debug, Clone)]
pub struct AccountInventory {
    pub account: Account,
    pub zones: Vec<ZoneInventory>,
    pub zone_count: usize,
    pub record_count: usize,
}

impl AccountInventory {
    pub fn new(account: Account, zones: Vec<ZoneInventory>) -> Self {
        let zone_count = zones.len();
        let record_count = zones.iter().map(|z| z.rows.len()).sum();
        Self {
            account,
            zones,
            zone_count,
            record_count,
        }
    }

    /// All rows, zone by zone.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.zones.iter().flat_map(|z| z.rows.iter())
    }
}
