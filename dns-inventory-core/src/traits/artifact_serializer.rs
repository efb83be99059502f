//! 报表序列化抽象

use crate::error::{CoreError, CoreResult};
use crate::types::Row;

/// Turns the rows of one logical group into file bytes.
pub trait ArtifactSerializer: Send + Sync {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;

    fn serialize(&self, group: &str, rows: &[Row]) -> CoreResult<Vec<u8>>;
}

/// CSV with a header line, even for an empty group.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvArtifactSerializer;

/// 列顺序与 `Row` 字段一致
const HEADERS: [&str; 8] = [
    "AccountId",
    "ZoneId",
    "ZoneName",
    "PrivateZone",
    "RecordName",
    "Type",
    "TTL",
    "Values",
];

impl ArtifactSerializer for CsvArtifactSerializer {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }

    fn serialize(&self, group: &str, rows: &[Row]) -> CoreResult<Vec<u8>> {
        let fail = |e: csv::Error| CoreError::Serialization(format!("{group}: {e}"));

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(HEADERS).map_err(fail)?;
        for row in rows {
            writer.serialize(row).map_err(fail)?;
        }
        writer
            .into_inner()
            .map_err(|e| CoreError::Serialization(format!("{group}: {}", e.error())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &str) -> Row {
        Row {
            account_id: "111122223333".to_string(),
            zone_id: "Z1".to_string(),
            zone_name: "example.com.".to_string(),
            is_private: false,
            record_name: "example.com.".to_string(),
            record_type: "TXT".to_string(),
            ttl: Some(300),
            values_joined: values.to_string(),
        }
    }

    #[test]
    fn empty_group_has_header_only() {
        let bytes = CsvArtifactSerializer.serialize("g", &[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "AccountId,ZoneId,ZoneName,PrivateZone,RecordName,Type,TTL,Values\n"
        );
    }

    #[test]
    fn rows_are_quoted_when_needed() {
        let mut alias = row("ALIAS->d1.cloudfront.net.");
        alias.ttl = None;
        let bytes = CsvArtifactSerializer
            .serialize("g", &[row("\"v=spf1 -all\";b,c"), alias])
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            r#"111122223333,Z1,example.com.,false,example.com.,TXT,300,"""v=spf1 -all"";b,c""#
        );
        assert_eq!(
            lines[2],
            "111122223333,Z1,example.com.,false,example.com.,TXT,,ALIAS->d1.cloudfront.net."
        );
    }
}
