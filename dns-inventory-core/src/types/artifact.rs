//! 报表产物与投递批次

use std::fmt;

use dns_inventory_provider::Attachment;

/// 序列化后的报表文件（或归档）
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    /// 文件名，运行内唯一
    pub identifier: String,
    /// `payload.len()`
    pub size_bytes: u64,
    pub payload: Vec<u8>,
    /// 账号 ID，主报表为 `all`
    pub logical_group: String,
    pub mime_type: String,
}

impl Artifact {
    pub fn new(
        identifier: impl Into<String>,
        payload: Vec<u8>,
        logical_group: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            size_bytes: payload.len() as u64,
            payload,
            logical_group: logical_group.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            name: self.identifier.clone(),
            bytes: self.payload.clone(),
            mime: self.mime_type.clone(),
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("identifier", &self.identifier)
            .field("size_bytes", &self.size_bytes)
            .field("logical_group", &self.logical_group)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// 一次投递的附件集合
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    pub artifacts: Vec<Artifact>,
    /// 有效大小之和（含编码开销）
    pub total_size_bytes: u64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.identifier.as_str()).collect()
    }
}
