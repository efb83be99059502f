//! 账号级盘点

use std::sync::Arc;

use dns_inventory_provider::InventoryClientFactory;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::{CoreError, CoreResult};
use crate::services::{CredentialBroker, Enumerator};
use crate::types::{
    Account, AccountFailure, AccountInventory, AccountOutcome, Record, Row, Zone, ZoneInventory,
};

/// Result of crawling a set of accounts, in input order.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub inventories: Vec<AccountInventory>,
    pub outcomes: Vec<AccountOutcome>,
    pub failures: Vec<AccountFailure>,
    /// At least one account stopped on cancellation.
    pub cancelled: bool,
}

impl CrawlReport {
    pub fn rows_total(&self) -> usize {
        self.inventories.iter().map(|i| i.record_count).sum()
    }
}

/// Walks accounts → zones → records on a bounded worker pool.
pub struct AccountCrawler {
    broker: CredentialBroker,
    enumerator: Enumerator,
    clients: Arc<dyn InventoryClientFactory>,
    max_workers: usize,
}

impl AccountCrawler {
    pub fn new(
        broker: CredentialBroker,
        enumerator: Enumerator,
        clients: Arc<dyn InventoryClientFactory>,
        max_workers: usize,
    ) -> Self {
        Self {
            broker,
            enumerator,
            clients,
            max_workers: max_workers.max(1),
        }
    }

    /// Inventory of one account. Zones and records are listed sequentially.
    pub async fn crawl(&self, account: &Account) -> CoreResult<AccountInventory> {
        let session = self.broker.acquire(account).await?;
        let api = self.clients.client_for(&session.credentials)?;

        let zones: Vec<Zone> = self
            .enumerator
            .list_zones(&session, api.as_ref())
            .try_collect()
            .await?;
        log::debug!("Account {}: {} zone(s)", account.id, zones.len());

        let mut inventories = Vec::with_capacity(zones.len());
        for zone in zones {
            let records: Vec<Record> = self
                .enumerator
                .list_records(&session, api.as_ref(), &zone)
                .try_collect()
                .await?;
            let rows = records.iter().map(|r| Row::new(&zone, r)).collect::<Vec<_>>();
            log::debug!(
                "Account {}: zone {} ({}) has {} record(s)",
                account.id,
                zone.name,
                zone.id,
                rows.len()
            );
            inventories.push(ZoneInventory { zone, rows });
        }

        let inventory = AccountInventory::new(account.clone(), inventories);
        log::info!(
            "Account {} ({}): {} zone(s), {} record(s)",
            account.label,
            account.id,
            inventory.zone_count,
            inventory.record_count
        );
        Ok(inventory)
    }

    /// Crawl every account, at most `max_workers` at a time.
    ///
    /// Account-scoped failures and cancellations are recorded and the
    /// remaining accounts continue. Any other error aborts the crawl.
    pub async fn crawl_all(&self, accounts: &[Account]) -> CoreResult<CrawlReport> {
        let results: Vec<(&Account, CoreResult<AccountInventory>)> = stream::iter(accounts)
            .map(|account| async move { (account, self.crawl(account).await) })
            .buffered(self.max_workers)
            .collect()
            .await;

        // fan-in：工作协程结束后再汇总，无共享可变状态
        let mut report = CrawlReport::default();
        for (account, result) in results {
            match result {
                Ok(inventory) => {
                    report.outcomes.push(AccountOutcome {
                        account_id: account.id.clone(),
                        label: account.label.clone(),
                        zone_count: to_count(inventory.zone_count),
                        record_count: to_count(inventory.record_count),
                        error: None,
                    });
                    report.inventories.push(inventory);
                }
                Err(e) if e.is_account_scoped() || matches!(e, CoreError::Cancelled { .. }) => {
                    if e.is_expected() {
                        log::warn!("Account {} ({}) failed: {e}", account.label, account.id);
                    } else {
                        log::error!("Account {} ({}) failed: {e}", account.label, account.id);
                    }
                    report.cancelled |= matches!(e, CoreError::Cancelled { .. });
                    let cause = e.to_string();
                    report.failures.push(AccountFailure {
                        account_id: account.id.clone(),
                        kind: e.kind().to_string(),
                        cause: cause.clone(),
                    });
                    report.outcomes.push(AccountOutcome::failed(account, cause));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

fn to_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
