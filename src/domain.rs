use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DocsError;

pub type EntityId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: EntityId,
    pub rs_id: String,
    pub chromosome: String,
    pub position: u64,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub functional_class: Option<String>,
    /// Set when this rsID was merged into another one.
    #[serde(default)]
    pub current_rs_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneOverlapRecord {
    pub variant_id: EntityId,
    pub gene_id: EntityId,
    pub gene_name: String,
    #[serde(default)]
    pub is_upstream: bool,
    #[serde(default)]
    pub is_downstream: bool,
    #[serde(default = "default_true")]
    pub is_intergenic: bool,
    #[serde(default)]
    pub is_closest_gene: bool,
    #[serde(default)]
    pub distance: i64,
}

fn default_true() -> bool {
    true
}

impl GeneOverlapRecord {
    pub fn overlaps_gene_body(&self) -> bool {
        !self.is_intergenic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneKey(String);

impl GeneKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ensembl(&self) -> bool {
        self.0.starts_with("ENSG")
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeneKey {
    type Err = DocsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DocsError::InvalidGeneKey(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for GeneKey {
    type Error = DocsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeneKey> for String {
    fn from(value: GeneKey) -> Self {
        value.0
    }
}

/// Ontology short form such as `EFO_0004339`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TermId(String);

impl TermId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of an IRI, e.g. `http://www.ebi.ac.uk/efo/EFO_0004339`.
    pub fn from_iri(iri: &str) -> Result<Self, DocsError> {
        let segment = iri
            .trim()
            .trim_end_matches('/')
            .rsplit(['/', '#'])
            .next()
            .unwrap_or_default();
        segment
            .parse()
            .map_err(|_| DocsError::InvalidTermId(iri.to_string()))
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TermId {
    type Err = DocsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^[A-Za-z][A-Za-z0-9]*[_:][A-Za-z0-9]+$").expect("valid term pattern")
        });
        let trimmed = value.trim();
        if !pattern.is_match(trimmed) {
            return Err(DocsError::InvalidTermId(value.to_string()));
        }
        Ok(Self(trimmed.replacen(':', "_", 1)))
    }
}

impl TryFrom<String> for TermId {
    type Error = DocsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TermId> for String {
    fn from(value: TermId) -> Self {
        value.0
    }
}

/// Term details as reported by the hierarchical term service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TermMetadata {
    pub iri: Option<String>,
    pub label: Option<String>,
    pub short_form: Option<String>,
    pub synonyms: Vec<String>,
    pub description: Vec<String>,
    pub descendants_link: Option<String>,
    pub ancestors_link: Option<String>,
}

impl TermMetadata {
    pub fn definition(&self) -> Option<String> {
        let text = self.description.concat();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescendantPage {
    pub short_forms: Vec<String>,
    pub page: usize,
    pub total_pages: usize,
    pub total_elements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountKind {
    Study,
    Association,
}

impl fmt::Display for CountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountKind::Study => write!(f, "study"),
            CountKind::Association => write!(f, "association"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateCount {
    pub term: TermId,
    pub study_count: usize,
    pub association_count: usize,
    pub closure_size: usize,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Gene,
    Trait,
    Variant,
    All,
}

impl DocumentType {
    pub fn includes(self, other: DocumentType) -> bool {
        self == DocumentType::All || self == other
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Gene => write!(f, "gene"),
            DocumentType::Trait => write!(f, "trait"),
            DocumentType::Variant => write!(f, "variant"),
            DocumentType::All => write!(f, "all"),
        }
    }
}

/// Primary assembly chromosomes; scaffolds and patches are everything else.
pub fn is_primary_chromosome(name: &str) -> bool {
    let name = name.trim();
    let name = name
        .strip_prefix("chr")
        .or_else(|| name.strip_prefix("CHR"))
        .unwrap_or(name);
    match name {
        "X" | "Y" | "MT" | "M" => true,
        other => other
            .parse::<u8>()
            .map(|number| (1..=22).contains(&number))
            .unwrap_or(false),
    }
}
