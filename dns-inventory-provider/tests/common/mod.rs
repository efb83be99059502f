//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::env;

use dns_inventory_provider::{AwsClient, Partition, SessionCredentials};

/// 跳过测试的宏（当环境变量缺失时）
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("跳过测试: 缺少环境变量 {}", $var);
                return;
            }
        )+
    };
}

/// 断言 `Option` 为 `Some`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// 测试上下文 - 封装基础凭证与目标账号
pub struct TestContext {
    pub base: AwsClient,
    pub role_arn: Option<String>,
}

impl TestContext {
    /// 从标准 AWS 环境变量创建上下文
    pub fn from_env() -> Option<Self> {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let partition = env::var("AWS_PARTITION")
            .ok()
            .and_then(|p| p.parse::<Partition>().ok())
            .unwrap_or_default();

        let mut credentials = SessionCredentials::new(access_key_id, secret_access_key);
        if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
            credentials = credentials.with_session_token(token);
        }

        let base = AwsClient::builder(credentials)
            .region(region)
            .partition(partition)
            .build()
            .ok()?;

        Some(Self {
            base,
            role_arn: env::var("TEST_ROLE_ARN").ok(),
        })
    }
}

/// 生成唯一的测试会话名
pub fn generate_session_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("dns-inventory-test-{}", &uuid.to_string()[..8])
}

/// 生成唯一的测试对象 key
pub fn generate_object_key() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("dns-inventory-test/{}.csv", &uuid.to_string()[..8])
}
