use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::DocsError;
use crate::http::{RetryPolicy, build_client, handle_status, send_with_retries};

const SOURCE: &str = "Ensembl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsemblGene {
    pub id: String,
    pub display_name: Option<String>,
    pub seq_region_name: String,
    pub start: u64,
    pub end: u64,
    pub biotype: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cytoband {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub id: String,
}

/// Gene annotation lookups against Ensembl.
pub trait GeneAnnotationSource: Send + Sync {
    /// Annotations keyed by Ensembl gene id. Ids the service does not know are
    /// absent from the map.
    fn lookup_genes(&self, ids: &[String]) -> Result<HashMap<String, EnsemblGene>, DocsError>;
    fn cytobands(&self) -> Result<Vec<Cytoband>, DocsError>;
    fn release(&self) -> Result<u32, DocsError>;
}

#[derive(Clone)]
pub struct EnsemblHttpClient {
    client: Client,
    base_url: String,
    lookup_chunk: usize,
    retry: RetryPolicy,
}

impl EnsemblHttpClient {
    pub fn new(
        base_url: &str,
        lookup_chunk: usize,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, DocsError> {
        let client = build_client(timeout, DocsError::EnsemblHttp)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lookup_chunk: lookup_chunk.max(1),
            retry,
        })
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, DocsError> {
        let url = format!("{}{}", self.base_url, path);
        let response = send_with_retries(
            self.retry,
            || self.client.get(&url).query(query),
            |err| DocsError::EnsemblHttp(err.to_string()),
        )?;
        let response = handle_status(response, |status, message| DocsError::EnsemblStatus {
            status,
            message,
        })?;
        response.json().map_err(malformed)
    }

    fn post_lookup(&self, ids: &[String]) -> Result<HashMap<String, EnsemblGene>, DocsError> {
        let url = format!("{}/lookup/id", self.base_url);
        let body = json!({ "ids": ids });
        let response = send_with_retries(
            self.retry,
            || self.client.post(&url).json(&body),
            |err| DocsError::EnsemblHttp(err.to_string()),
        )?;
        let response = handle_status(response, |status, message| DocsError::EnsemblStatus {
            status,
            message,
        })?;
        let raw: Value = response.json().map_err(malformed)?;
        extract_lookup(&raw)
    }
}

impl GeneAnnotationSource for EnsemblHttpClient {
    fn lookup_genes(&self, ids: &[String]) -> Result<HashMap<String, EnsemblGene>, DocsError> {
        let mut found = HashMap::new();
        for chunk in ids.chunks(self.lookup_chunk) {
            debug!(chunk = chunk.len(), "posting gene lookup");
            match self.post_lookup(chunk) {
                Ok(genes) => found.extend(genes),
                Err(err) if chunk.len() > 1 => {
                    warn!(error = %err, chunk = chunk.len(), "lookup chunk failed, retrying ids one by one");
                    for id in chunk {
                        match self.post_lookup(std::slice::from_ref(id)) {
                            Ok(genes) => found.extend(genes),
                            Err(err) => warn!(gene = %id, error = %err, "gene lookup failed"),
                        }
                    }
                }
                Err(err) => warn!(gene = ?chunk.first(), error = %err, "gene lookup failed"),
            }
        }
        Ok(found)
    }

    fn cytobands(&self) -> Result<Vec<Cytoband>, DocsError> {
        let raw = self.get_json("/info/assembly/homo_sapiens", &[("bands", "1")])?;
        extract_cytobands(&raw)
    }

    fn release(&self) -> Result<u32, DocsError> {
        let raw = self.get_json("/info/data", &[])?;
        extract_release(&raw)
    }
}

/// `/lookup/id` answers with an object keyed by the requested ids; unknown ids
/// map to `null`.
pub fn extract_lookup(raw: &Value) -> Result<HashMap<String, EnsemblGene>, DocsError> {
    let entries = raw
        .as_object()
        .ok_or_else(|| payload_error("lookup response is not an object"))?;
    let mut genes = HashMap::new();
    for (id, entry) in entries {
        if entry.is_null() {
            continue;
        }
        let text = |key: &str| {
            entry
                .get(key)
                .and_then(|v| v.as_str())
                .map(|v| v.to_string())
        };
        let number = |key: &str| entry.get(key).and_then(|v| v.as_u64());
        let (Some(seq_region_name), Some(start), Some(end)) =
            (text("seq_region_name"), number("start"), number("end"))
        else {
            return Err(payload_error(&format!("gene {id} has no location")));
        };
        genes.insert(
            id.clone(),
            EnsemblGene {
                id: text("id").unwrap_or_else(|| id.clone()),
                display_name: text("display_name"),
                seq_region_name,
                start,
                end,
                biotype: text("biotype"),
                description: text("description"),
            },
        );
    }
    Ok(genes)
}

pub fn extract_cytobands(raw: &Value) -> Result<Vec<Cytoband>, DocsError> {
    let regions = raw
        .get("top_level_region")
        .and_then(|v| v.as_array())
        .ok_or_else(|| payload_error("assembly response has no top_level_region"))?;
    let mut bands = Vec::new();
    for region in regions {
        let Some(chromosome) = region.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(region_bands) = region.get("bands").and_then(|v| v.as_array()) else {
            continue;
        };
        for band in region_bands {
            let id = band.get("id").and_then(|v| v.as_str());
            let start = band.get("start").and_then(|v| v.as_u64());
            let end = band.get("end").and_then(|v| v.as_u64());
            if let (Some(id), Some(start), Some(end)) = (id, start, end) {
                bands.push(Cytoband {
                    chromosome: chromosome.to_string(),
                    start,
                    end,
                    id: id.to_string(),
                });
            }
        }
    }
    bands.sort_by(|a, b| (&a.chromosome, a.start).cmp(&(&b.chromosome, b.start)));
    Ok(bands)
}

pub fn extract_release(raw: &Value) -> Result<u32, DocsError> {
    raw.get("releases")
        .and_then(|v| v.as_array())
        .and_then(|releases| releases.first())
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| payload_error("data response has no release"))
}

fn payload_error(message: &str) -> DocsError {
    DocsError::MalformedPayload {
        source_name: SOURCE,
        message: message.to_string(),
    }
}

fn malformed(err: reqwest::Error) -> DocsError {
    payload_error(&err.to_string())
}
