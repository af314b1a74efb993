use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::domain::{DescendantPage, TermMetadata};
use crate::error::DocsError;
use crate::http::{RetryPolicy, build_client, handle_status, send_with_retries};

const SOURCE: &str = "OLS";

/// Hierarchical term service: metadata, paged descendants and ancestor labels.
pub trait TermService: Send + Sync {
    fn fetch_term(&self, iri: &str) -> Result<TermMetadata, DocsError>;
    fn fetch_descendants(
        &self,
        link: &str,
        page: usize,
        size: usize,
    ) -> Result<DescendantPage, DocsError>;
    fn fetch_ancestor_labels(&self, link: &str) -> Result<Vec<String>, DocsError>;
}

#[derive(Clone)]
pub struct OlsHttpClient {
    client: Client,
    base_url: String,
    ontology: String,
    retry: RetryPolicy,
}

impl OlsHttpClient {
    pub fn new(
        base_url: &str,
        ontology: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, DocsError> {
        let client = build_client(timeout, DocsError::OlsHttp)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ontology: ontology.to_string(),
            retry,
        })
    }

    /// OLS expects the term IRI URL-encoded twice inside the path.
    pub fn term_url(&self, iri: &str) -> String {
        let once = urlencoding::encode(iri);
        let twice = urlencoding::encode(&once);
        format!(
            "{}/ontologies/{}/terms/{}",
            self.base_url, self.ontology, twice
        )
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, DocsError> {
        let response = send_with_retries(
            self.retry,
            || self.client.get(url).query(query),
            |err| DocsError::OlsHttp(err.to_string()),
        )?;
        let response = handle_status(response, |status, message| DocsError::OlsStatus {
            status,
            message,
        })?;
        response.json().map_err(|err| DocsError::MalformedPayload {
            source_name: SOURCE,
            message: err.to_string(),
        })
    }
}

impl TermService for OlsHttpClient {
    fn fetch_term(&self, iri: &str) -> Result<TermMetadata, DocsError> {
        let url = self.term_url(iri);
        debug!(%url, "fetching term");
        let raw = self.get_json(&url, &[])?;
        extract_term(&raw)
    }

    fn fetch_descendants(
        &self,
        link: &str,
        page: usize,
        size: usize,
    ) -> Result<DescendantPage, DocsError> {
        debug!(link, page, size, "fetching descendant page");
        let raw = self.get_json(
            link,
            &[("size", size.to_string()), ("page", page.to_string())],
        )?;
        extract_descendant_page(&raw)
    }

    fn fetch_ancestor_labels(&self, link: &str) -> Result<Vec<String>, DocsError> {
        let raw = self.get_json(link, &[("size", "1000".to_string())])?;
        Ok(embedded_terms(&raw)
            .iter()
            .filter_map(|term| term.get("label").and_then(|v| v.as_str()))
            .map(|label| label.to_string())
            .collect())
    }
}

pub fn extract_term(raw: &Value) -> Result<TermMetadata, DocsError> {
    if !raw.is_object() {
        return Err(DocsError::MalformedPayload {
            source_name: SOURCE,
            message: "term response is not an object".to_string(),
        });
    }
    let text = |key: &str| {
        raw.get(key)
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
    };
    let strings = |key: &str| {
        match raw.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|v| v.to_string())
                .collect::<Vec<_>>(),
            Some(Value::String(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    };
    let link = |name: &str| {
        raw.get("_links")
            .and_then(|v| v.get(name))
            .and_then(|v| v.get("href"))
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
    };

    Ok(TermMetadata {
        iri: text("iri"),
        label: text("label"),
        short_form: text("short_form"),
        synonyms: strings("synonyms"),
        description: strings("description"),
        descendants_link: link("hierarchicalDescendants").or_else(|| link("descendants")),
        ancestors_link: link("hierarchicalAncestors").or_else(|| link("ancestors")),
    })
}

pub fn extract_descendant_page(raw: &Value) -> Result<DescendantPage, DocsError> {
    let page = raw.get("page").ok_or_else(|| DocsError::MalformedPayload {
        source_name: SOURCE,
        message: "descendant response has no page block".to_string(),
    })?;
    let number = |key: &str| {
        page.get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .ok_or_else(|| DocsError::MalformedPayload {
                source_name: SOURCE,
                message: format!("page block is missing `{key}`"),
            })
    };
    let total_pages = number("totalPages")?;
    let total_elements = number("totalElements")?;
    let current = number("number")?;

    let mut short_forms = Vec::new();
    for term in embedded_terms(raw) {
        let short_form = term
            .get("short_form")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DocsError::MalformedPayload {
                source_name: SOURCE,
                message: "descendant term without short_form".to_string(),
            })?;
        short_forms.push(short_form.to_string());
    }

    Ok(DescendantPage {
        short_forms,
        page: current,
        total_pages,
        total_elements,
    })
}

/// An empty page carries no `_embedded` block at all.
fn embedded_terms(raw: &Value) -> &[Value] {
    raw.get("_embedded")
        .and_then(|v| v.get("terms"))
        .and_then(|v| v.as_array())
        .map(|terms| terms.as_slice())
        .unwrap_or(&[])
}
