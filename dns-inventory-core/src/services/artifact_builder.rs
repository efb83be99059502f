//! 报表文件生成

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{Granularity, ReportSection};
use crate::error::CoreResult;
use crate::traits::ArtifactSerializer;
use crate::types::{AccountInventory, Artifact, Row};

/// 主报表的逻辑分组
pub const MASTER_GROUP: &str = "all";
/// 主报表文件名（不含扩展名）
const MASTER_NAME: &str = "ALL";

/// Groups rows into report files.
pub struct ArtifactBuilder {
    serializer: Arc<dyn ArtifactSerializer>,
    granularity: Granularity,
    include_master: bool,
}

impl ArtifactBuilder {
    pub fn new(serializer: Arc<dyn ArtifactSerializer>, report: &ReportSection) -> Self {
        Self {
            serializer,
            granularity: report.granularity,
            include_master: report.include_master,
        }
    }

    /// One artifact per zone (or per account), then the master artifact.
    pub fn build(&self, inventories: &[AccountInventory]) -> CoreResult<Vec<Artifact>> {
        let mut names = HashSet::new();
        names.insert(self.file_name(MASTER_NAME));
        let mut artifacts = Vec::new();

        for inventory in inventories {
            let account = &inventory.account;
            match self.granularity {
                Granularity::Zone => {
                    for zone in &inventory.zones {
                        let base = format!(
                            "dns_{}_{}",
                            account.id,
                            sanitize(zone.zone.name.trim_end_matches('.'))
                        );
                        let name = self.unique_name(&mut names, &base, &zone.zone.id);
                        artifacts.push(self.artifact(name, &account.id, &zone.rows)?);
                    }
                }
                Granularity::Account => {
                    let rows: Vec<Row> = inventory.rows().cloned().collect();
                    let base = format!("dns_{}_{}", sanitize(&account.label), account.id);
                    let name = self.unique_name(&mut names, &base, &account.id);
                    artifacts.push(self.artifact(name, &account.id, &rows)?);
                }
            }
        }

        if self.include_master {
            let rows: Vec<Row> = inventories
                .iter()
                .flat_map(AccountInventory::rows)
                .cloned()
                .collect();
            artifacts.push(self.artifact(self.file_name(MASTER_NAME), MASTER_GROUP, &rows)?);
        }

        log::debug!("Built {} artifact(s)", artifacts.len());
        Ok(artifacts)
    }

    fn artifact(&self, name: String, group: &str, rows: &[Row]) -> CoreResult<Artifact> {
        let payload = self.serializer.serialize(group, rows)?;
        Ok(Artifact::new(name, payload, group, self.serializer.mime_type()))
    }

    fn file_name(&self, base: &str) -> String {
        format!("{base}.{}", self.serializer.extension())
    }

    /// 同名时追加区分后缀（同名公有/私有区域）
    fn unique_name(&self, names: &mut HashSet<String>, base: &str, tag: &str) -> String {
        let name = self.file_name(base);
        if names.insert(name.clone()) {
            return name;
        }
        let mut n = 1usize;
        loop {
            let candidate = if n == 1 {
                self.file_name(&format!("{base}_{}", sanitize(tag)))
            } else {
                self.file_name(&format!("{base}_{}_{n}", sanitize(tag)))
            };
            if names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// File-name safe: anything outside `[A-Za-z0-9._-]` becomes `_`.
fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
