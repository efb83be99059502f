//! 附件分批
//!
//! 按输入顺序贪心装箱：单批有效大小不超过 `max_size`，附件数不超过 `max_count`。

use crate::config::DeliverySection;
use crate::error::{CoreError, CoreResult};
use crate::types::{Artifact, Batch};

/// 编码开销按百万分之一精度换算，避免浮点误差影响向上取整
const OVERHEAD_SCALE: u128 = 1_000_000;

#[derive(Debug, Clone, Copy)]
pub struct ArtifactBatcher {
    max_size: u64,
    max_count: usize,
    /// `encoding_overhead × OVERHEAD_SCALE`
    overhead_scaled: u128,
}

impl ArtifactBatcher {
    pub fn new(max_size: u64, max_count: usize, encoding_overhead: f64) -> CoreResult<Self> {
        if max_count == 0 {
            return Err(CoreError::Config("max_count must be at least 1".to_string()));
        }
        if !encoding_overhead.is_finite() || encoding_overhead < 1.0 {
            return Err(CoreError::Config(format!(
                "encoding overhead {encoding_overhead} must be >= 1.0"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let overhead_scaled = (encoding_overhead * 1_000_000.0).round() as u128;
        Ok(Self {
            max_size,
            max_count,
            overhead_scaled,
        })
    }

    pub fn from_config(delivery: &DeliverySection) -> CoreResult<Self> {
        Self::new(
            delivery.max_size_bytes,
            delivery.max_count,
            delivery.encoding_overhead,
        )
    }

    /// `ceil(size_bytes × encoding_overhead)`
    pub fn effective_size(&self, artifact: &Artifact) -> u64 {
        let scaled = u128::from(artifact.size_bytes) * self.overhead_scaled;
        u64::try_from(scaled.div_ceil(OVERHEAD_SCALE)).unwrap_or(u64::MAX)
    }

    pub fn aggregate_size(&self, artifacts: &[Artifact]) -> u64 {
        artifacts
            .iter()
            .map(|a| self.effective_size(a))
            .fold(0u64, u64::saturating_add)
    }

    /// Partition `artifacts` into batches, keeping input order.
    ///
    /// Fails without output when one artifact alone is over `max_size`.
    pub fn pack(&self, artifacts: Vec<Artifact>) -> CoreResult<Vec<Batch>> {
        if let Some(oversized) = artifacts
            .iter()
            .find(|a| self.effective_size(a) > self.max_size)
        {
            return Err(CoreError::ArtifactTooLarge {
                identifier: oversized.identifier.clone(),
                effective_size: self.effective_size(oversized),
                max_size: self.max_size,
            });
        }

        let mut batches = Vec::new();
        let mut current = Batch::default();
        for artifact in artifacts {
            let size = self.effective_size(&artifact);
            let over_count = current.len() + 1 > self.max_count;
            let over_size = current.total_size_bytes.saturating_add(size) > self.max_size;
            if !current.is_empty() && (over_count || over_size) {
                batches.push(std::mem::take(&mut current));
            }
            current.total_size_bytes += size;
            current.artifacts.push(artifact);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        Ok(batches)
    }
}
