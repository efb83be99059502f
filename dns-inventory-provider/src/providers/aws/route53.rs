//! Route 53 `ListHostedZones` / `ListResourceRecordSets`

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::Result;
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, InventoryApi, InventoryClientFactory};
use crate::types::{
    AliasTarget, HostedZone, RecordCursor, RecordPage, RecordSet, SessionCredentials, ZonePage,
};

use super::AwsClient;
use super::Partition;
use super::error::{AwsErrorMapper, ErrorProtocol};
use super::http::AwsRequest;
use super::sign::Scope;
use super::types::{
    HostedZoneXml, ListHostedZonesResponse, ListResourceRecordSetsResponse, ResourceRecordSetXml,
};

const MAPPER: AwsErrorMapper = AwsErrorMapper::new("route53", ErrorProtocol::Xml);
const API_PREFIX: &str = "/2013-04-01";
/// `ListHostedZones` 单页上限
pub(crate) const ZONE_PAGE_SIZE: u32 = 100;
/// `ListResourceRecordSets` 单页上限
pub(crate) const RECORD_PAGE_SIZE: u32 = 300;

/// Route 53 read client bound to one set of credentials.
#[derive(Debug, Clone)]
pub struct Route53Client {
    aws: AwsClient,
}

impl Route53Client {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }

    fn host(&self) -> String {
        match self.aws.partition {
            Partition::Aws => "route53.amazonaws.com".to_string(),
            Partition::AwsCn => "route53.amazonaws.com.cn".to_string(),
            Partition::AwsUsGov => "route53.us-gov.amazonaws.com".to_string(),
        }
    }

    async fn get(&self, path: String, query: Vec<(String, String)>, action: &str, zone: Option<&str>) -> Result<String> {
        let context = zone.map(ErrorContext::resource).unwrap_or_default();
        self.aws
            .send(
                AwsRequest {
                    method: Method::GET,
                    host: self.host(),
                    path,
                    query,
                    headers: Vec::new(),
                    body: Vec::new(),
                    scope: Scope {
                        region: self.aws.partition.global_region(),
                        service: "route53",
                    },
                    action,
                    content_sha256_header: false,
                },
                MAPPER,
                context,
            )
            .await
    }
}

/// Strip the `/hostedzone/` prefix the API puts on zone ids.
pub(crate) fn bare_zone_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn convert_zone(z: HostedZoneXml) -> HostedZone {
    HostedZone {
        id: bare_zone_id(&z.id).to_string(),
        name: z.name,
        is_private: z.config.is_some_and(|c| c.private_zone),
        record_count: z.resource_record_set_count,
    }
}

fn convert_record(r: ResourceRecordSetXml) -> RecordSet {
    let mut routing = BTreeMap::new();
    if let Some(v) = r.set_identifier {
        routing.insert("set_identifier".to_string(), v);
    }
    if let Some(v) = r.weight {
        routing.insert("weight".to_string(), v.to_string());
    }
    if let Some(v) = r.region {
        routing.insert("region".to_string(), v);
    }
    if let Some(v) = r.failover {
        routing.insert("failover".to_string(), v);
    }
    if let Some(geo) = r.geo_location {
        let parts: Vec<String> = [
            ("continent", geo.continent_code),
            ("country", geo.country_code),
            ("subdivision", geo.subdivision_code),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| format!("{k}={v}")))
        .collect();
        if !parts.is_empty() {
            routing.insert("geo_location".to_string(), parts.join(","));
        }
    }
    if let Some(v) = r.multi_value_answer {
        routing.insert("multi_value_answer".to_string(), v.to_string());
    }
    if let Some(v) = r.health_check_id {
        routing.insert("health_check_id".to_string(), v);
    }

    RecordSet {
        name: r.name,
        record_type: r.record_type,
        ttl: r.ttl,
        values: r
            .resource_records
            .map(|list| list.items.into_iter().map(|rr| rr.value).collect())
            .unwrap_or_default(),
        alias_target: r.alias_target.map(|a| AliasTarget {
            dns_name: a.dns_name,
            hosted_zone_id: a.hosted_zone_id,
            evaluate_target_health: a.evaluate_target_health,
        }),
        routing,
    }
}

fn convert_zone_page(resp: ListHostedZonesResponse) -> ZonePage {
    ZonePage {
        zones: resp.hosted_zones.items.into_iter().map(convert_zone).collect(),
        is_truncated: resp.is_truncated,
        next_marker: resp.next_marker.filter(|m| !m.is_empty()),
    }
}

fn convert_record_page(resp: ListResourceRecordSetsResponse) -> RecordPage {
    let next = match (resp.is_truncated, resp.next_record_name) {
        (true, Some(name)) if !name.is_empty() => Some(RecordCursor {
            name,
            record_type: resp.next_record_type.unwrap_or_default(),
            identifier: resp.next_record_identifier,
        }),
        _ => None,
    };
    RecordPage {
        records: resp
            .resource_record_sets
            .items
            .into_iter()
            .map(convert_record)
            .collect(),
        is_truncated: resp.is_truncated,
        next,
    }
}

#[async_trait]
impl InventoryApi for Route53Client {
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage> {
        let mut query = vec![("maxitems".to_string(), ZONE_PAGE_SIZE.to_string())];
        if let Some(m) = marker {
            query.push(("marker".to_string(), m.to_string()));
        }

        let text = self
            .get(format!("{API_PREFIX}/hostedzone"), query, "ListHostedZones", None)
            .await?;
        let resp: ListHostedZonesResponse = HttpUtils::parse_xml(&text, MAPPER.service)?;
        Ok(convert_zone_page(resp))
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&RecordCursor>,
    ) -> Result<RecordPage> {
        let zone_id = bare_zone_id(zone_id);
        let mut query = vec![("maxitems".to_string(), RECORD_PAGE_SIZE.to_string())];
        if let Some(c) = cursor {
            query.push(("name".to_string(), c.name.clone()));
            if !c.record_type.is_empty() {
                query.push(("type".to_string(), c.record_type.clone()));
            }
            if let Some(id) = &c.identifier {
                query.push(("identifier".to_string(), id.clone()));
            }
        }

        let text = self
            .get(
                format!("{API_PREFIX}/hostedzone/{}/rrset", urlencoding::encode(zone_id)),
                query,
                "ListResourceRecordSets",
                Some(zone_id),
            )
            .await?;
        let resp: ListResourceRecordSetsResponse = HttpUtils::parse_xml(&text, MAPPER.service)?;
        Ok(convert_record_page(resp))
    }
}

/// Builds a [`Route53Client`] per assumed-role session, sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Route53ClientFactory {
    template: AwsClient,
}

impl Route53ClientFactory {
    pub fn new(template: AwsClient) -> Self {
        Self { template }
    }
}

impl InventoryClientFactory for Route53ClientFactory {
    fn client_for(&self, credentials: &SessionCredentials) -> Result<Arc<dyn InventoryApi>> {
        Ok(Arc::new(Route53Client::new(
            self.template.with_credentials(credentials.clone()),
        )))
    }
}
