//! 盘点运行编排

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;

use chrono::Utc;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::InventoryConfig;
use crate::error::{CoreError, CoreResult};
use crate::services::{
    AccountCrawler, ArtifactBuilder, BackoffExecutor, CredentialBroker, DeliveryService,
    Enumerator, ServiceContext,
};
use crate::types::{Account, ReportMessage, RunSummary};

/// 盘点运行服务
pub struct InventoryService {
    ctx: Arc<ServiceContext>,
    config: Arc<InventoryConfig>,
    dry_run: bool,
}

impl InventoryService {
    /// 创建运行服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, config: InventoryConfig) -> Self {
        Self {
            ctx,
            config: Arc::new(config),
            dry_run: false,
        }
    }

    /// Crawl and build the report, but only plan the delivery.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Allow-list when non-empty, otherwise the `ACTIVE` accounts of the directory.
    pub async fn resolve_accounts(&self, enumerator: &Enumerator) -> CoreResult<Vec<Account>> {
        let section = &self.config.accounts;
        if !section.allowed.is_empty() {
            let mut seen = HashSet::new();
            return Ok(section
                .allowed
                .iter()
                .filter(|a| seen.insert(a.id.clone()))
                .map(|a| Account::new(a.id.clone(), a.label.clone()))
                .collect());
        }
        if section.force_allowed_only {
            return Err(CoreError::Config(
                "accounts.allowed is empty while accounts.force_allowed_only is set".to_string(),
            ));
        }

        let directory = self.ctx.account_directory.as_ref().ok_or_else(|| {
            CoreError::Config("no account directory available to resolve accounts".to_string())
        })?;
        let accounts: Vec<Account> = enumerator
            .list_accounts(directory.as_ref())
            .try_collect()
            .await?;
        log::info!("Account directory returned {} active account(s)", accounts.len());
        Ok(accounts)
    }

    /// 执行一次完整盘点：解析账号 → 抓取 → 生成报表 → 投递
    pub async fn run(&self, cancel: CancellationToken) -> CoreResult<RunSummary> {
        let started_at = Utc::now();
        let date = started_at.format("%Y-%m-%d").to_string();
        let mut summary = RunSummary {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            accounts_processed: 0,
            rows_total: 0,
            batches_produced: 0,
            delivery: None,
            accounts: Vec::new(),
            failures: Vec::new(),
        };
        log::info!("Inventory run {} started", summary.run_id);

        let backoff = BackoffExecutor::new(&self.config.retry, cancel);
        let enumerator = Enumerator::new(backoff.clone());

        let accounts = match self.resolve_accounts(&enumerator).await {
            Ok(accounts) => accounts,
            Err(e) => return Err(with_partial(e, &summary)),
        };
        log::info!("{} account(s) to inventory", accounts.len());

        let crawler = AccountCrawler::new(
            CredentialBroker::new(
                self.ctx.credential_exchange.clone(),
                backoff.clone(),
                &self.config.aws,
            ),
            enumerator,
            self.ctx.inventory_clients.clone(),
            self.config.crawl.max_workers,
        );
        let report = crawler.crawl_all(&accounts).await?;

        summary.accounts_processed = accounts.len();
        summary.rows_total = report.rows_total();
        summary.accounts = report.outcomes;
        summary.failures = report.failures;

        if report.cancelled {
            log::warn!(
                "Run {} cancelled after {} of {} account(s)",
                summary.run_id,
                report.inventories.len(),
                accounts.len()
            );
            return Err(with_partial(
                CoreError::cancelled("cancelled while crawling"),
                &summary,
            ));
        }

        let artifacts = ArtifactBuilder::new(self.ctx.serializer.clone(), &self.config.report)
            .build(&report.inventories)?;
        let message = self.compose_message(&date, &summary);
        let delivery = DeliveryService::new(self.ctx.clone(), self.config.clone(), backoff);

        if self.dry_run {
            let strategy = delivery.plan(&artifacts)?;
            log::info!(
                "Dry run: {} artifact(s) would be delivered via {}",
                artifacts.len(),
                strategy.as_str()
            );
            return Ok(summary);
        }

        let delivered = match delivery.deliver(artifacts, &message, &date).await {
            Ok(delivered) => delivered,
            Err(e) => return Err(with_partial(e, &summary)),
        };
        summary.batches_produced = delivered.notifications_sent;
        summary.delivery = Some(delivered);

        log::info!(
            "Inventory run {} finished: {} account(s), {} row(s), {} failure(s)",
            summary.run_id,
            summary.accounts_processed,
            summary.rows_total,
            summary.failures.len()
        );
        Ok(summary)
    }

    fn compose_message(&self, date: &str, summary: &RunSummary) -> ReportMessage {
        let prefix = self.config.report.subject_prefix.trim();
        let subject = if prefix.is_empty() {
            format!("DNS Inventory {date}")
        } else {
            format!("{prefix} DNS Inventory {date}")
        };

        let mut body = format!("DNS inventory {date}\n\nSummary (account, id, zones, records):\n");
        for outcome in &summary.accounts {
            let _ = writeln!(
                body,
                "- {}, {}, {}, {}",
                outcome.label, outcome.account_id, outcome.zone_count, outcome.record_count
            );
        }
        if !summary.failures.is_empty() {
            body.push_str("\nFailures:\n");
            for failure in &summary.failures {
                let _ = writeln!(
                    body,
                    "- {} [{}]: {}",
                    failure.account_id, failure.kind, failure.cause
                );
            }
        }
        ReportMessage::new(&subject, body)
    }
}

/// `Cancelled` carries the summary gathered so far.
fn with_partial(error: CoreError, summary: &RunSummary) -> CoreError {
    match error {
        CoreError::Cancelled { reason, .. } => CoreError::Cancelled {
            reason,
            partial: Some(Box::new(summary.clone())),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dns_inventory_provider::{DirectoryAccount, ProviderError};

    use super::*;
    use crate::config::AllowedAccount;
    use crate::test_utils::{
        MockAccountDirectory, MockInventoryApi, MockInventoryClientFactory, TestMocks,
        create_test_context, hosted_zone, record_set, test_config,
    };

    async fn api(zone_id: &str, zone_name: &str, records: usize) -> Arc<MockInventoryApi> {
        let api = Arc::new(MockInventoryApi::new(100));
        api.add_zone(hosted_zone(zone_id, zone_name)).await;
        let sets = (0..records)
            .map(|i| record_set(&format!("r{i}.{zone_name}"), "CNAME", &["target.example."]))
            .collect();
        api.set_records(zone_id, sets).await;
        api
    }

    async fn factory() -> MockInventoryClientFactory {
        MockInventoryClientFactory::new()
            .with_account("111111111111", api("Z1", "prod.example.", 3).await)
            .with_account("222222222222", api("Z2", "dev.example.", 2).await)
            .with_account("333333333333", api("Z3", "ops.example.", 1).await)
    }

    async fn service(
        configure: impl FnOnce(&mut InventoryConfig),
    ) -> (InventoryService, Arc<ServiceContext>, TestMocks) {
        let mut config = test_config();
        configure(&mut config);
        let (ctx, mocks) = create_test_context(factory().await, true);
        (InventoryService::new(ctx.clone(), config), ctx, mocks)
    }

    #[tokio::test]
    async fn full_run_delivers_summary() {
        let (svc, _, mocks) = service(|_| {}).await;
        let summary = svc.run(CancellationToken::new()).await.unwrap();

        assert_eq!(summary.accounts_processed, 2);
        assert_eq!(summary.rows_total, 5);
        assert!(summary.failures.is_empty());
        assert_eq!(summary.batches_produced, 1);
        assert_eq!(
            summary.delivery.as_ref().map(|d| d.strategy.as_str()),
            Some("attach_direct")
        );

        let sent = mocks.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.starts_with("[DNS] DNS Inventory "));
        assert!(sent[0].body.contains("- prod, 111111111111, 1, 3\n"));
        assert!(sent[0].body.contains("- 222222222222, 222222222222, 1, 2\n"));
        // 2 个区域文件 + ALL.csv
        let names: Vec<&str> = sent[0].attachments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "dns_111111111111_prod.example.csv",
                "dns_222222222222_dev.example.csv",
                "ALL.csv"
            ]
        );
    }

    #[tokio::test]
    async fn failed_account_is_reported_not_fatal() {
        let (svc, _, mocks) = service(|c| {
            c.accounts.allowed.push(AllowedAccount {
                id: "333333333333".to_string(),
                label: Some("ops".to_string()),
            });
        })
        .await;
        mocks
            .exchange
            .fail_for(
                "111111111111",
                ProviderError::AccessDenied {
                    service: "sts".to_string(),
                    raw_code: Some("AccessDenied".to_string()),
                    raw_message: Some("not authorized".to_string()),
                },
            )
            .await;

        let summary = svc.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.accounts_processed, 3);
        assert_eq!(summary.rows_total, 3);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].account_id, "111111111111");
        assert!(summary.failures[0].cause.contains("not authorized"));

        let body = &mocks.transport.sent().await[0].body;
        assert!(body.contains("- prod, 111111111111, -1, -1\n"));
        assert!(body.contains("Failures:\n- 111111111111 [access_denied]"));
    }

    #[tokio::test]
    async fn cancelled_run_returns_partial_summary() {
        let (svc, _, mocks) = service(|_| {}).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        match svc.run(cancel).await {
            Err(CoreError::Cancelled {
                partial: Some(partial),
                ..
            }) => {
                assert_eq!(partial.accounts_processed, 2);
                assert_eq!(partial.failures.len(), 2);
                assert!(partial.failures.iter().all(|f| f.kind == "cancelled"));
                assert!(partial.delivery.is_none());
            }
            other => panic!("expected Cancelled with summary, got {other:?}"),
        }
        assert!(mocks.transport.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_during_crawl_keeps_finished_accounts() {
        let (svc, _, mocks) = service(|c| c.crawl.max_workers = 1).await;
        mocks.exchange.throttle_for("222222222222", 7).await;
        let cancel = CancellationToken::new();
        let deadline = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                cancel.cancel();
            })
        };

        let result = svc.run(cancel).await;
        deadline.await.unwrap();
        match result {
            Err(CoreError::Cancelled {
                partial: Some(partial),
                ..
            }) => {
                assert_eq!(partial.rows_total, 3);
                assert_eq!(partial.accounts[0].record_count, 3);
                assert_eq!(partial.accounts[1].record_count, -1);
                assert_eq!(partial.failures[0].kind, "cancelled");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn accounts_from_directory() {
        let (svc, ctx, mocks) = service(|c| {
            c.accounts.allowed.clear();
            c.accounts.force_allowed_only = false;
        })
        .await;
        let directory = MockAccountDirectory::new(vec![vec![
            DirectoryAccount {
                id: "333333333333".to_string(),
                name: "ops".to_string(),
                status: "ACTIVE".to_string(),
                email: None,
            },
            DirectoryAccount {
                id: "222222222222".to_string(),
                name: "old".to_string(),
                status: "SUSPENDED".to_string(),
                email: None,
            },
        ]]);
        let ctx = Arc::new((*ctx).clone().with_account_directory(Arc::new(directory)));
        let svc = InventoryService::new(ctx, (*svc.config).clone());

        let summary = svc.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.accounts_processed, 1);
        assert_eq!(summary.accounts[0].label, "ops");
        assert_eq!(mocks.exchange.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn empty_allow_list_is_config_error_when_forced() {
        let (svc, _, mocks) = service(|c| c.accounts.allowed.clear()).await;
        let err = svc.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(mocks.exchange.requests().await.is_empty());
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let (svc, _, mocks) = service(|_| {}).await;
        let svc = svc.with_dry_run(true);
        let summary = svc.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.rows_total, 5);
        assert!(summary.delivery.is_none());
        assert!(mocks.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_allow_list_entries_are_crawled_once() {
        let (svc, _, mocks) = service(|c| {
            c.accounts.allowed.push(AllowedAccount {
                id: "111111111111".to_string(),
                label: None,
            });
        })
        .await;
        let summary = svc.run(CancellationToken::new()).await.unwrap();
        assert_eq!(summary.accounts_processed, 2);
        assert_eq!(mocks.exchange.requests().await.len(), 2);
    }
}
