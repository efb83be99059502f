//! 分页枚举
//!
//! `paginate` 把"按游标取一页"的函数变成惰性的条目流；
//! 区域、记录、账号三种列表都建立在它之上。

use std::fmt::Debug;
use std::future::Future;

use chrono::Utc;
use dns_inventory_provider::{AccountDirectory, InventoryApi, RecordCursor};
use futures::stream::{self, Stream, StreamExt};

use crate::error::{CoreError, CoreResult};
use crate::services::{BackoffExecutor, Session};
use crate::types::{Account, Record, Zone};

/// One fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    /// Continuation for the next call.
    pub next: Option<C>,
    /// `false` marks the last page.
    pub truncated: bool,
}

impl<T, C> Page<T, C> {
    pub fn new(items: Vec<T>, truncated: bool, next: Option<C>) -> Self {
        Self {
            items,
            next,
            truncated,
        }
    }

    /// Token-style APIs: the page is last when it carries no token.
    pub fn from_token(items: Vec<T>, next: Option<C>) -> Self {
        let truncated = next.is_some();
        Self::new(items, truncated, next)
    }
}

enum Cursor<C> {
    Start,
    Next(C),
    Done,
}

/// Follow continuations until a terminal page.
///
/// `fetch` receives `None` first, then each page's continuation. A truncated
/// page without a continuation, or a continuation already used earlier in
/// the listing, ends the stream with `EnumerationFailed`. A fetch error ends
/// it as well.
pub fn paginate<'a, T, C, F, Fut>(
    scope: String,
    fetch: F,
) -> impl Stream<Item = CoreResult<T>> + 'a
where
    T: 'a,
    C: Clone + PartialEq + Debug + 'a,
    F: FnMut(Option<C>) -> Fut + 'a,
    Fut: Future<Output = CoreResult<Page<T, C>>> + 'a,
{
    // 已使用过的游标，用于发现循环分页
    let seen: Vec<C> = Vec::new();
    stream::unfold(
        (Cursor::<C>::Start, fetch, scope, seen),
        |(cursor, mut fetch, scope, mut seen)| async move {
            let current = match cursor {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(c) => Some(c),
            };
            if let Some(c) = &current {
                seen.push(c.clone());
            }

            let page = match fetch(current).await {
                Ok(page) => page,
                Err(e) => return Some((vec![Err(e)], (Cursor::Done, fetch, scope, seen))),
            };

            let mut items: Vec<CoreResult<T>> = page.items.into_iter().map(Ok).collect();
            let next = if page.truncated {
                match page.next {
                    None => {
                        items.push(Err(CoreError::EnumerationFailed {
                            scope: scope.clone(),
                            reason: "truncated page without a continuation".to_string(),
                        }));
                        Cursor::Done
                    }
                    Some(next) if seen.contains(&next) => {
                        items.push(Err(CoreError::EnumerationFailed {
                            scope: scope.clone(),
                            reason: format!("continuation {next:?} returned twice"),
                        }));
                        Cursor::Done
                    }
                    Some(next) => Cursor::Next(next),
                }
            } else {
                Cursor::Done
            };

            Some((items, (next, fetch, scope, seen)))
        },
    )
    .flat_map(stream::iter)
}

/// Provider errors of an account listing: access denied maps to `AccountAccessDenied`,
/// everything else becomes `EnumerationFailed`. `Exhausted` and `Cancelled` pass through.
fn listing_error(account_id: &str, scope: &str, error: CoreError) -> CoreError {
    match error {
        CoreError::Provider(p) if p.is_access_denied() => CoreError::AccountAccessDenied {
            account_id: account_id.to_string(),
            reason: p.to_string(),
        },
        CoreError::Provider(p) => CoreError::EnumerationFailed {
            scope: scope.to_string(),
            reason: p.to_string(),
        },
        other => other,
    }
}

/// Zone, record and account listings, each page through the backoff executor.
#[derive(Debug, Clone)]
pub struct Enumerator {
    backoff: BackoffExecutor,
}

impl Enumerator {
    pub fn new(backoff: BackoffExecutor) -> Self {
        Self { backoff }
    }

    pub fn list_zones<'a>(
        &'a self,
        session: &'a Session,
        api: &'a dyn InventoryApi,
    ) -> impl Stream<Item = CoreResult<Zone>> + 'a {
        let account_id = session.account_id.as_str();
        paginate(
            format!("hosted zones of {account_id}"),
            move |marker: Option<String>| async move {
                session.ensure_valid(Utc::now())?;
                let page = self
                    .backoff
                    .execute(&format!("list_hosted_zones({account_id})"), || {
                        api.list_hosted_zones(marker.as_deref())
                    })
                    .await
                    .map_err(|e| {
                        listing_error(account_id, &format!("hosted zones of {account_id}"), e)
                    })?;
                let zones = page
                    .zones
                    .into_iter()
                    .map(|z| Zone::from_hosted(z, account_id))
                    .collect();
                Ok::<_, CoreError>(Page::new(zones, page.is_truncated, page.next_marker))
            },
        )
    }

    pub fn list_records<'a>(
        &'a self,
        session: &'a Session,
        api: &'a dyn InventoryApi,
        zone: &'a Zone,
    ) -> impl Stream<Item = CoreResult<Record>> + 'a {
        paginate(
            format!("records of {} ({})", zone.name, zone.id),
            move |cursor: Option<RecordCursor>| async move {
                session.ensure_valid(Utc::now())?;
                let page = self
                    .backoff
                    .execute(&format!("list_record_sets({})", zone.id), || {
                        api.list_record_sets(&zone.id, cursor.as_ref())
                    })
                    .await
                    .map_err(|e| {
                        listing_error(
                            &zone.account_id,
                            &format!("records of {} ({})", zone.name, zone.id),
                            e,
                        )
                    })?;
                let records = page
                    .records
                    .into_iter()
                    .map(|r| Record::from_record_set(r, &zone.id))
                    .collect();
                Ok::<_, CoreError>(Page::new(records, page.is_truncated, page.next))
            },
        )
    }

    /// `ACTIVE` accounts of the directory.
    pub fn list_accounts<'a>(
        &'a self,
        directory: &'a dyn AccountDirectory,
    ) -> impl Stream<Item = CoreResult<Account>> + 'a {
        paginate(
            "account directory".to_string(),
            move |token: Option<String>| async move {
                let page = self
                    .backoff
                    .execute("list_accounts", || directory.list_accounts(token.as_deref()))
                    .await?;
                let accounts = page
                    .accounts
                    .into_iter()
                    .filter(|a| {
                        if !a.is_active() {
                            log::debug!("Skipping account {} ({})", a.id, a.status);
                        }
                        a.is_active()
                    })
                    .map(Account::from)
                    .collect();
                Ok::<_, CoreError>(Page::from_token(accounts, page.next_token))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use dns_inventory_provider::{DirectoryAccount, SessionCredentials};
    use futures::TryStreamExt;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::RetryPolicy;
    use crate::test_utils::{MockAccountDirectory, MockInventoryApi, hosted_zone, record_set};

    type Pages = Vec<(Vec<u32>, bool, Option<u32>)>;

    /// 按页号取预置页面，记录调用次数
    async fn collect_pages(pages: Pages) -> (CoreResult<Vec<u32>>, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let pages = Arc::new(pages);
        let stream = {
            let calls = calls.clone();
            paginate("test".to_string(), move |cursor: Option<u32>| {
                let calls = calls.clone();
                let pages = pages.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let index = cursor.unwrap_or(0) as usize;
                    let (items, truncated, next) = pages[index].clone();
                    Ok::<_, CoreError>(Page::new(items, truncated, next))
                }
            })
        };
        let result = stream.try_collect().await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let (items, calls) = collect_pages(vec![
            (vec![1], true, Some(1)),
            (vec![2, 3], true, Some(2)),
            (vec![], true, Some(3)),
            (vec![4, 5, 6], false, None),
        ])
        .await;
        assert_eq!(items.unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn many_synthetic_pages() {
        for n in 1..=12u32 {
            let pages: Pages = (0..n)
                .map(|i| {
                    // 第 i 页有 i 个条目（第 0 页为空页）
                    let items = (0..i).map(|k| i * 100 + k).collect();
                    let last = i + 1 == n;
                    (items, !last, (!last).then_some(i + 1))
                })
                .collect();
            let expected: Vec<u32> = pages.iter().flat_map(|p| p.0.clone()).collect();
            let (items, calls) = collect_pages(pages).await;
            assert_eq!(items.unwrap(), expected);
            assert_eq!(calls, n as usize);
        }
    }

    #[tokio::test]
    async fn truncated_without_continuation_fails() {
        let (result, calls) = collect_pages(vec![(vec![1], true, None)]).await;
        assert!(matches!(result, Err(CoreError::EnumerationFailed { .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn repeated_continuation_fails() {
        let (result, calls) =
            collect_pages(vec![(vec![1], true, Some(1)), (vec![2], true, Some(1))]).await;
        match result {
            Err(CoreError::EnumerationFailed { scope, reason }) => {
                assert_eq!(scope, "test");
                assert!(reason.contains("twice"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn continuation_cycle_fails() {
        // 0 → 1 → 2 → 1
        let (result, calls) = collect_pages(vec![
            (vec![1], true, Some(1)),
            (vec![2], true, Some(2)),
            (vec![3], true, Some(1)),
        ])
        .await;
        match result {
            Err(CoreError::EnumerationFailed { reason, .. }) => {
                assert!(reason.contains("continuation 1"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn continuation_ignored_on_last_page() {
        let (items, calls) = collect_pages(vec![(vec![7], false, Some(9))]).await;
        assert_eq!(items.unwrap(), vec![7]);
        assert_eq!(calls, 1);
    }

    fn enumerator() -> Enumerator {
        Enumerator::new(BackoffExecutor::new(
            &RetryPolicy::default(),
            CancellationToken::new(),
        ))
    }

    fn session(valid_for: Duration) -> Session {
        Session {
            account_id: "111122223333".to_string(),
            session_name: "s".to_string(),
            credentials: SessionCredentials::new("a", "b"),
            expires_at: Some(Utc::now() + valid_for),
        }
    }

    #[tokio::test]
    async fn lists_zones_and_records_across_pages() {
        let api = MockInventoryApi::new(2);
        for i in 0..5 {
            api.add_zone(hosted_zone(&format!("Z{i}"), &format!("zone{i}.example.")))
                .await;
        }
        let records: Vec<_> = (0..7)
            .map(|i| record_set(&format!("r{i}.zone0.example."), "A", &["192.0.2.1"]))
            .collect();
        api.set_records("Z0", records).await;

        let enumerator = enumerator();
        let session = session(Duration::hours(1));
        let zones: Vec<Zone> = enumerator
            .list_zones(&session, &api)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(zones.len(), 5);
        assert_eq!(zones[4].id, "Z4");
        assert!(zones.iter().all(|z| z.account_id == "111122223333"));

        let records: Vec<Record> = enumerator
            .list_records(&session, &api, &zones[0])
            .try_collect()
            .await
            .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "r0.zone0.example.",
                "r1.zone0.example.",
                "r2.zone0.example.",
                "r3.zone0.example.",
                "r4.zone0.example.",
                "r5.zone0.example.",
                "r6.zone0.example.",
            ]
        );
        // 3 zone pages + 4 record pages
        assert_eq!(api.calls(), 7);
    }

    #[tokio::test]
    async fn expired_session_stops_before_fetch() {
        let api = MockInventoryApi::new(2);
        api.add_zone(hosted_zone("Z1", "example.com.")).await;

        let enumerator = enumerator();
        let session = session(Duration::seconds(-1));
        let result: CoreResult<Vec<Zone>> =
            enumerator.list_zones(&session, &api).try_collect().await;
        assert!(matches!(result, Err(CoreError::AccountAccessDenied { .. })));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_fetch() {
        let api = MockInventoryApi::new(2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let enumerator = Enumerator::new(BackoffExecutor::new(&RetryPolicy::default(), cancel));
        let session = session(Duration::hours(1));
        let result: CoreResult<Vec<Zone>> =
            enumerator.list_zones(&session, &api).try_collect().await;
        assert!(matches!(result, Err(CoreError::Cancelled { .. })));
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn lists_only_active_accounts() {
        let account = |id: &str, status: &str| DirectoryAccount {
            id: id.to_string(),
            name: format!("acct-{id}"),
            status: status.to_string(),
            email: None,
        };
        let directory = MockAccountDirectory::new(vec![
            vec![account("111111111111", "ACTIVE"), account("222222222222", "SUSPENDED")],
            vec![],
            vec![account("333333333333", "ACTIVE")],
        ]);

        let accounts: Vec<Account> = enumerator()
            .list_accounts(&directory)
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["111111111111", "333333333333"]);
        assert_eq!(accounts[0].label, "acct-111111111111");
        assert_eq!(directory.calls(), 3);
    }
}
