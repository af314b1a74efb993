//! Search documents for genes, traits and variants.
//!
//! Every document carries `id`, `title`, `description` and `resourcename`;
//! the remaining fields use the camelCase names of the search index. Optional
//! description parts are rendered as `NA` so the `|`-separated layout stays
//! positional.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::accumulator::GeneAssociations;
use crate::domain::{AggregateCount, GeneKey, TermMetadata, Variant, is_primary_chromosome};
use crate::ensembl::{Cytoband, EnsemblGene};
use crate::error::DocsError;
use crate::reconcile::{GeneCandidate, GeneCrossRefs};
use crate::source::{TraitRow, VariantCounts};

pub const NA: &str = "NA";
pub const NO_DESCRIPTION: &str = "No description available";

/// Fields every document must carry before it is handed to the index.
pub trait SearchDocument {
    fn id(&self) -> &str;
    fn required_fields(&self) -> [(&'static str, &str); 3];

    fn validate(&self) -> Result<(), DocsError> {
        if self.id().trim().is_empty() {
            return Err(DocsError::IncompleteDocument {
                id: String::new(),
                field: "id",
            });
        }
        for (field, value) in self.required_fields() {
            if value.trim().is_empty() {
                return Err(DocsError::IncompleteDocument {
                    id: self.id().to_string(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Splits documents into the complete ones and the validation errors of the
/// rest.
pub fn retain_complete<D: SearchDocument>(documents: Vec<D>) -> (Vec<D>, Vec<DocsError>) {
    let mut kept = Vec::with_capacity(documents.len());
    let mut rejected = Vec::new();
    for document in documents {
        match document.validate() {
            Ok(()) => kept.push(document),
            Err(err) => rejected.push(err),
        }
    }
    (kept, rejected)
}

/// Joins description parts with `|`, substituting `NA` for absent or blank
/// parts.
pub fn compose_description<I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    parts
        .into_iter()
        .map(|part| match part {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => NA.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneDocument {
    pub resourcename: String,
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "ensemblID")]
    pub ensembl_id: String,
    #[serde(rename = "rsIDs")]
    pub rs_ids: Vec<String>,
    pub study_count: usize,
    pub association_count: usize,
    pub chromosome_name: String,
    pub chromosome_start: u64,
    pub chromosome_end: u64,
    pub biotype: String,
    pub ensembl_description: String,
    pub cytobands: String,
    #[serde(rename = "entrezID")]
    pub entrez_id: Vec<String>,
    pub cross_refs: Vec<String>,
    pub synonyms_gene: Vec<String>,
}

impl SearchDocument for GeneDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("title", self.title.as_str()),
            ("description", self.description.as_str()),
            ("resourcename", self.resourcename.as_str()),
        ]
    }
}

/// Identifiers gathered for one canonical gene key across every internal gene
/// that reconciled to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneIdentifiers {
    pub symbols: BTreeSet<String>,
    pub entrez_ids: BTreeSet<String>,
    pub synonyms: BTreeSet<String>,
    pub alternative_ids: BTreeSet<String>,
}

impl GeneIdentifiers {
    pub fn absorb(&mut self, candidate: &GeneCandidate, refs: &GeneCrossRefs) {
        if !candidate.symbol.is_empty() {
            self.symbols.insert(candidate.symbol.clone());
        }
        if let Some(entrez) = &candidate.entrez_id {
            self.entrez_ids.insert(entrez.clone());
        }
        self.synonyms.extend(non_blank(&refs.synonyms));
        self.alternative_ids.extend(non_blank(&refs.alternative_ids));
    }

    /// Approved symbols first, then aliases and previous names not already
    /// listed.
    pub fn synonyms_gene(&self) -> Vec<String> {
        let mut names = self.symbols.iter().cloned().collect::<Vec<_>>();
        for synonym in &self.synonyms {
            if !self.symbols.contains(synonym) {
                names.push(synonym.clone());
            }
        }
        names
    }
}

fn non_blank(values: &[String]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneOutcome {
    Document(Box<GeneDocument>),
    /// No Ensembl annotation could be obtained for the key.
    Compromised(GeneKey),
    /// Annotated on a scaffold or patch rather than a primary chromosome.
    NonPrimary { key: GeneKey, chromosome: String },
}

pub fn assemble_gene(
    key: &GeneKey,
    accumulated: &GeneAssociations,
    identifiers: &GeneIdentifiers,
    annotation: Option<&EnsemblGene>,
    cytobands: &[Cytoband],
) -> GeneOutcome {
    let Some(annotation) = annotation else {
        return GeneOutcome::Compromised(key.clone());
    };
    if !is_primary_chromosome(&annotation.seq_region_name) {
        return GeneOutcome::NonPrimary {
            key: key.clone(),
            chromosome: annotation.seq_region_name.clone(),
        };
    }

    let ensembl_description = annotation
        .description
        .as_deref()
        .map(|text| text.split(" [Source").next().unwrap_or_default().trim())
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_DESCRIPTION)
        .to_string();
    let bands = cytobands_for(
        cytobands,
        &annotation.seq_region_name,
        annotation.start,
        annotation.end,
    );
    let cytobands = if bands.is_empty() {
        NA.to_string()
    } else {
        bands.join("/")
    };
    let biotype = annotation.biotype.clone().unwrap_or_else(|| NA.to_string());
    let title = annotation
        .display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| identifiers.symbols.first().cloned())
        .unwrap_or_else(|| key.to_string());

    let description = compose_description([
        Some(ensembl_description.clone()),
        Some(format!(
            "{}:{}-{}",
            annotation.seq_region_name, annotation.start, annotation.end
        )),
        Some(cytobands.clone()),
        Some(biotype.clone()),
    ]);

    GeneOutcome::Document(Box::new(GeneDocument {
        resourcename: "gene".to_string(),
        id: format!("gene:{key}"),
        title,
        description,
        ensembl_id: key.to_string(),
        rs_ids: accumulated.rs_ids.iter().cloned().collect(),
        study_count: accumulated.study_count(),
        association_count: accumulated.association_count(),
        chromosome_name: annotation.seq_region_name.clone(),
        chromosome_start: annotation.start,
        chromosome_end: annotation.end,
        biotype,
        ensembl_description,
        cytobands,
        entrez_id: identifiers.entrez_ids.iter().cloned().collect(),
        cross_refs: identifiers.alternative_ids.iter().cloned().collect(),
        synonyms_gene: identifiers.synonyms_gene(),
    }))
}

/// Ids of the bands on `chromosome` overlapping `start..=end`, in band order.
pub fn cytobands_for(bands: &[Cytoband], chromosome: &str, start: u64, end: u64) -> Vec<String> {
    bands
        .iter()
        .filter(|band| band.chromosome == chromosome && band.start <= end && band.end >= start)
        .map(|band| band.id.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitDocument {
    pub resourcename: String,
    pub id: String,
    pub title: String,
    pub description: String,
    pub mapped_trait: String,
    pub mapped_uri: String,
    pub short_form: Vec<String>,
    pub synonyms: Vec<String>,
    pub parent: Vec<String>,
    pub reported_trait: Vec<String>,
    #[serde(rename = "reportedTrait_s", skip_serializing_if = "Option::is_none")]
    pub reported_trait_s: Option<String>,
    pub efo_link: Vec<String>,
    pub study_count: usize,
    pub association_count: usize,
    pub descendant_count: usize,
    #[serde(rename = "shortform_autosuggest")]
    pub shortform_autosuggest: Vec<String>,
    #[serde(rename = "label_autosuggest")]
    pub label_autosuggest: Vec<String>,
    #[serde(rename = "label_autosuggest_ws")]
    pub label_autosuggest_ws: Vec<String>,
    #[serde(rename = "label_autosuggest_e")]
    pub label_autosuggest_e: Vec<String>,
    #[serde(rename = "synonym_autosuggest", skip_serializing_if = "Vec::is_empty")]
    pub synonym_autosuggest: Vec<String>,
    #[serde(rename = "synonym_autosuggest_ws", skip_serializing_if = "Vec::is_empty")]
    pub synonym_autosuggest_ws: Vec<String>,
    #[serde(rename = "synonym_autosuggest_e", skip_serializing_if = "Vec::is_empty")]
    pub synonym_autosuggest_e: Vec<String>,
}

impl SearchDocument for TraitDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("title", self.title.as_str()),
            ("description", self.description.as_str()),
            ("resourcename", self.resourcename.as_str()),
        ]
    }
}

/// Never fails: absent term metadata falls back to the database label and
/// short form, absent description parts become `NA`.
pub fn assemble_trait(
    term: &TraitRow,
    reported: &[String],
    aggregate: &AggregateCount,
    metadata: Option<&TermMetadata>,
    ancestors: &[String],
) -> TraitDocument {
    let label = metadata
        .and_then(|meta| meta.label.clone())
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| term.label.clone());
    let short_form = metadata
        .and_then(|meta| meta.short_form.clone())
        .filter(|short_form| !short_form.trim().is_empty())
        .unwrap_or_else(|| term.short_form.to_string());

    let definition = metadata.and_then(TermMetadata::definition);
    let counts = format!(
        "associations: {}, studies: {}",
        aggregate.association_count, aggregate.study_count
    );
    let reported_part = (!reported.is_empty()).then(|| reported.join(", "));
    let parent_part = (!ancestors.is_empty()).then(|| ancestors.join(", "));
    let synonyms = metadata
        .map(|meta| meta.synonyms.clone())
        .unwrap_or_default();

    TraitDocument {
        resourcename: "trait".to_string(),
        id: format!("trait:{}", term.id),
        title: format!("{label} ({short_form})"),
        description: compose_description([definition, Some(counts), reported_part, parent_part]),
        mapped_trait: term.label.clone(),
        mapped_uri: term.uri.clone(),
        efo_link: vec![format!("{}|{}|{}", term.label, term.short_form, term.uri)],
        shortform_autosuggest: vec![term.short_form.to_string()],
        label_autosuggest: vec![term.label.clone()],
        label_autosuggest_ws: vec![term.label.clone()],
        label_autosuggest_e: vec![term.label.clone()],
        synonym_autosuggest: synonyms.clone(),
        synonym_autosuggest_ws: synonyms.clone(),
        synonym_autosuggest_e: synonyms.clone(),
        short_form: vec![short_form],
        synonyms,
        parent: ancestors.to_vec(),
        reported_trait: reported.to_vec(),
        reported_trait_s: reported.first().cloned(),
        study_count: aggregate.study_count,
        association_count: aggregate.association_count,
        descendant_count: aggregate.closure_size.saturating_sub(1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDocument {
    pub resourcename: String,
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "rsID")]
    pub rs_id: String,
    #[serde(rename = "current_rsID")]
    pub current_rs_id: String,
    #[serde(rename = "merged_rsID")]
    pub merged_rs_id: String,
    pub association_count: usize,
    pub study_count: usize,
    pub mapped_genes: Vec<String>,
    pub chromosome_name: String,
    pub chromosome_position: u64,
    pub region: String,
    pub consequence: String,
    pub link: String,
}

impl SearchDocument for VariantDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("title", self.title.as_str()),
            ("description", self.description.as_str()),
            ("resourcename", self.resourcename.as_str()),
        ]
    }
}

/// `None` for variants without associations; they are not indexed.
pub fn assemble_variant(
    variant: &Variant,
    counts: VariantCounts,
    mapped_genes: Vec<String>,
) -> Option<VariantDocument> {
    if counts.association_count == 0 {
        return None;
    }

    let (current_rs_id, merged_rs_id, title) = match variant
        .current_rs_id
        .as_deref()
        .filter(|current| !current.trim().is_empty() && *current != variant.rs_id)
    {
        Some(current) => (
            current.to_string(),
            variant.rs_id.clone(),
            format!("{current} ({})", variant.rs_id),
        ),
        None => (variant.rs_id.clone(), String::new(), variant.rs_id.clone()),
    };

    let consequence = variant
        .functional_class
        .as_deref()
        .map(format_consequence)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NA.to_string());
    let region = variant
        .region
        .clone()
        .filter(|region| !region.trim().is_empty())
        .unwrap_or_else(|| NA.to_string());
    let gene_names = mapped_genes
        .iter()
        .map(|label| label.split('|').next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",");

    let description = compose_description([
        Some(format!("{}:{}", variant.chromosome, variant.position)),
        Some(region.clone()),
        Some(consequence.clone()),
        Some(gene_names),
    ]);

    Some(VariantDocument {
        resourcename: "variant".to_string(),
        id: format!("variant-{}", variant.id),
        title,
        description,
        rs_id: variant.rs_id.clone(),
        current_rs_id,
        merged_rs_id,
        association_count: counts.association_count,
        study_count: counts.study_count,
        mapped_genes,
        chromosome_name: variant.chromosome.clone(),
        chromosome_position: variant.position,
        region,
        consequence,
        link: format!("variants/{}", variant.rs_id),
    })
}

/// `intron_variant` -> `Intron variant`.
pub fn format_consequence(functional_class: &str) -> String {
    let spaced = functional_class.trim().replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
