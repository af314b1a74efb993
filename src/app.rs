use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::accumulator::GeneAccumulator;
use crate::assembler::{
    GeneDocument, GeneIdentifiers, GeneOutcome, TraitDocument, VariantDocument, assemble_gene,
    assemble_trait, assemble_variant, retain_complete,
};
use crate::closure::{ClosureSettings, ClosureStatus, TermClosureAggregator};
use crate::domain::{DocumentType, EntityId, GeneKey, TermId, Variant};
use crate::ensembl::GeneAnnotationSource;
use crate::error::DocsError;
use crate::mapper::{GeneSelection, select_genes};
use crate::ols::TermService;
use crate::reconcile::{GeneCrossRefs, IdentifierReconciler};
use crate::source::AssociationStore;

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub document_type: DocumentType,
    /// Caps the associations, traits and variants read per pass.
    pub limit: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            document_type: DocumentType::All,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedTerm {
    pub term: TermId,
    pub reason: String,
}

/// Diagnostics of one run. Upstream failures land here instead of aborting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub ensembl_release: Option<u32>,
    pub gene_documents: usize,
    pub trait_documents: usize,
    pub variant_documents: usize,
    pub compromised_ids: Vec<String>,
    pub excluded_non_primary: Vec<String>,
    pub degraded_terms: Vec<DegradedTerm>,
    pub missing_identity: Vec<EntityId>,
    pub incomplete_documents: Vec<String>,
    pub upstream_errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub genes: Vec<GeneDocument>,
    pub traits: Vec<TraitDocument>,
    pub variants: Vec<VariantDocument>,
    pub report: RunReport,
}

impl BuildResult {
    pub fn document_count(&self) -> usize {
        self.genes.len() + self.traits.len() + self.variants.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosureResult {
    pub term: TermId,
    pub label: Option<String>,
    pub size: usize,
    pub descendant_count: usize,
    pub pages_fetched: usize,
    pub status: ClosureStatus,
    pub members: Vec<TermId>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<D: AssociationStore, T: TermService, E: GeneAnnotationSource> {
    data: D,
    terms: T,
    ensembl: E,
    settings: ClosureSettings,
}

impl<D: AssociationStore, T: TermService, E: GeneAnnotationSource> App<D, T, E> {
    pub fn new(data: D, terms: T, ensembl: E, settings: ClosureSettings) -> Self {
        Self {
            data,
            terms,
            ensembl,
            settings,
        }
    }

    /// Runs the requested passes and validates their documents. Fails only on
    /// local data errors or when no document survives.
    pub fn build(
        &self,
        options: BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BuildResult, DocsError> {
        let mut result = BuildResult {
            report: RunReport {
                generated_at: chrono::Utc::now().to_rfc3339(),
                ..RunReport::default()
            },
            ..BuildResult::default()
        };
        let mut resolver = GeneResolver::default();

        if options.document_type.includes(DocumentType::Gene) {
            let start = Instant::now();
            result.genes = self.build_genes(options.limit, &mut resolver, &mut result.report)?;
            sink.event(ProgressEvent {
                message: format!("phase=Genes; {} documents", result.genes.len()),
                elapsed: Some(start.elapsed()),
            });
        }
        if options.document_type.includes(DocumentType::Trait) {
            let start = Instant::now();
            result.traits = self.build_traits(options.limit, &mut result.report)?;
            sink.event(ProgressEvent {
                message: format!("phase=Traits; {} documents", result.traits.len()),
                elapsed: Some(start.elapsed()),
            });
        }
        if options.document_type.includes(DocumentType::Variant) {
            let start = Instant::now();
            result.variants = self.build_variants(options.limit, &mut resolver)?;
            sink.event(ProgressEvent {
                message: format!("phase=Variants; {} documents", result.variants.len()),
                elapsed: Some(start.elapsed()),
            });
        }

        result.report.missing_identity = resolver.missing_identity.into_iter().collect();
        finalize(result)
    }

    pub fn build_genes(
        &self,
        limit: Option<usize>,
        resolver: &mut GeneResolver,
        report: &mut RunReport,
    ) -> Result<Vec<GeneDocument>, DocsError> {
        let variants = self
            .data
            .variants()?
            .into_iter()
            .map(|variant| (variant.id, variant))
            .collect::<HashMap<_, _>>();
        let associations = self.data.associations()?;
        info!(associations = associations.len(), "accumulating genes");

        let mut accumulator = GeneAccumulator::new();
        for association in associations.into_iter().take(limit.unwrap_or(usize::MAX)) {
            for variant_id in &association.variant_ids {
                let Some(variant) = variants.get(variant_id) else {
                    warn!(
                        association = association.id,
                        variant = variant_id,
                        "association references an unknown variant"
                    );
                    continue;
                };
                for key in resolver.gene_keys(&self.data, variant.id)? {
                    accumulator.record(&key, association.id, association.study_id, &variant.rs_id);
                }
            }
        }

        if accumulator.is_empty() {
            return Ok(Vec::new());
        }
        info!(genes = accumulator.len(), "annotating genes");
        let genes = accumulator.into_genes();
        let ensembl_ids = genes
            .keys()
            .filter(|key| key.is_ensembl())
            .map(|key| key.to_string())
            .collect::<Vec<_>>();
        let annotations = match self.ensembl.lookup_genes(&ensembl_ids) {
            Ok(annotations) => annotations,
            Err(err) => {
                warn!(error = %err, "gene annotation lookup failed");
                report.upstream_errors.push(err.to_string());
                HashMap::new()
            }
        };
        let cytobands = self.ensembl.cytobands().unwrap_or_else(|err| {
            warn!(error = %err, "cytoband lookup failed");
            report.upstream_errors.push(err.to_string());
            Vec::new()
        });
        match self.ensembl.release() {
            Ok(release) => report.ensembl_release = Some(release),
            Err(err) => {
                warn!(error = %err, "release lookup failed");
                report.upstream_errors.push(err.to_string());
            }
        }

        let empty = GeneIdentifiers::default();
        let mut documents = Vec::with_capacity(genes.len());
        for (key, accumulated) in &genes {
            let identifiers = resolver.identifiers.get(key).unwrap_or(&empty);
            match assemble_gene(
                key,
                accumulated,
                identifiers,
                annotations.get(key.as_str()),
                &cytobands,
            ) {
                GeneOutcome::Document(document) => documents.push(*document),
                GeneOutcome::Compromised(key) => {
                    warn!(gene = %key, "no annotation, gene compromised");
                    report.compromised_ids.push(key.to_string());
                }
                GeneOutcome::NonPrimary { key, chromosome } => {
                    info!(gene = %key, %chromosome, "gene outside the primary assembly, excluded");
                    report.excluded_non_primary.push(key.to_string());
                }
            }
        }
        Ok(documents)
    }

    pub fn build_traits(
        &self,
        limit: Option<usize>,
        report: &mut RunReport,
    ) -> Result<Vec<TraitDocument>, DocsError> {
        let aggregator = TermClosureAggregator::new(&self.terms, self.settings);
        let traits = self.data.traits()?;
        info!(traits = traits.len(), "aggregating traits");

        let mut documents = Vec::new();
        for row in traits.into_iter().take(limit.unwrap_or(usize::MAX)) {
            let (metadata, closure) = aggregator.closure_for_iri(row.short_form.clone(), &row.uri);
            let aggregate = aggregator.aggregate(&closure, &self.data);
            if aggregate.degraded {
                let reason = match &closure.status {
                    ClosureStatus::Degraded(reason) => reason.clone(),
                    ClosureStatus::Complete => "counted the term alone".to_string(),
                };
                report.degraded_terms.push(DegradedTerm {
                    term: row.short_form.clone(),
                    reason,
                });
            }

            let ancestors = match metadata.as_ref().and_then(|m| m.ancestors_link.as_deref()) {
                Some(link) => self.terms.fetch_ancestor_labels(link).unwrap_or_else(|err| {
                    warn!(term = %row.short_form, error = %err, "ancestor lookup failed");
                    report.upstream_errors.push(err.to_string());
                    Vec::new()
                }),
                None => Vec::new(),
            };
            let reported = self.data.reported_traits(&row.short_form)?;
            documents.push(assemble_trait(
                &row,
                &reported,
                &aggregate,
                metadata.as_ref(),
                &ancestors,
            ));
        }
        Ok(documents)
    }

    pub fn build_variants(
        &self,
        limit: Option<usize>,
        resolver: &mut GeneResolver,
    ) -> Result<Vec<VariantDocument>, DocsError> {
        let variants = self.data.variants()?;
        info!(variants = variants.len(), "building variants");

        let mut documents = Vec::new();
        for variant in variants.iter().take(limit.unwrap_or(usize::MAX)) {
            let counts = self.data.variant_counts(variant.id)?;
            if counts.association_count == 0 {
                continue;
            }
            let labels = resolver.gene_labels(&self.data, variant)?;
            if let Some(document) = assemble_variant(variant, counts, labels) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    pub fn closure(&self, iri: &str, sink: &dyn ProgressSink) -> Result<ClosureResult, DocsError> {
        let root = TermId::from_iri(iri)?;
        let start = Instant::now();
        let aggregator = TermClosureAggregator::new(&self.terms, self.settings);
        let (metadata, closure) = aggregator.closure_for_iri(root, iri);
        sink.event(ProgressEvent {
            message: format!("phase=Closure; {} pages", closure.pages_fetched),
            elapsed: Some(start.elapsed()),
        });
        Ok(ClosureResult {
            term: closure.root.clone(),
            label: metadata.and_then(|meta| meta.label),
            size: closure.len(),
            descendant_count: closure.descendant_count(),
            pages_fetched: closure.pages_fetched,
            status: closure.status.clone(),
            members: closure.members.into_iter().collect(),
        })
    }
}

/// Variant to gene resolution shared by the gene and variant passes: mapper
/// results are cached per variant and cross references per gene.
#[derive(Debug, Default)]
pub struct GeneResolver {
    reconciler: IdentifierReconciler,
    selections: HashMap<EntityId, GeneSelection>,
    identifiers: HashMap<GeneKey, GeneIdentifiers>,
    missing_identity: BTreeSet<EntityId>,
}

impl GeneResolver {
    fn selection<D: AssociationStore>(
        &mut self,
        data: &D,
        variant_id: EntityId,
    ) -> Result<GeneSelection, DocsError> {
        if let Some(selection) = self.selections.get(&variant_id) {
            return Ok(selection.clone());
        }
        let records = data.overlaps(variant_id)?;
        let selection = select_genes(&records);
        if let GeneSelection::Mapped(gene_ids) = &selection {
            for gene_id in gene_ids {
                if self.reconciler.contains(*gene_id) {
                    continue;
                }
                let row = match data.cross_refs(*gene_id)? {
                    Some(row) => row,
                    None => GeneCrossRefs {
                        gene_id: *gene_id,
                        symbol: records
                            .iter()
                            .find(|record| record.gene_id == *gene_id)
                            .map(|record| record.gene_name.clone())
                            .unwrap_or_default(),
                        ..GeneCrossRefs::default()
                    },
                };
                self.reconciler.insert(row);
                let candidates = self.reconciler.candidates(*gene_id);
                let Some(refs) = self.reconciler.cross_refs(*gene_id) else {
                    continue;
                };
                for candidate in candidates {
                    if let Some(key) = candidate.canonical_key() {
                        self.identifiers
                            .entry(key)
                            .or_default()
                            .absorb(&candidate, refs);
                    }
                }
            }
        }
        self.selections.insert(variant_id, selection.clone());
        Ok(selection)
    }

    pub fn gene_keys<D: AssociationStore>(
        &mut self,
        data: &D,
        variant_id: EntityId,
    ) -> Result<Vec<GeneKey>, DocsError> {
        let selection = self.selection(data, variant_id)?;
        let mut keys = Vec::new();
        for gene_id in selection.gene_ids() {
            let gene_keys = self.reconciler.canonical_keys(*gene_id);
            if gene_keys.is_empty() {
                record_missing(&mut self.missing_identity, *gene_id);
            }
            keys.extend(gene_keys);
        }
        Ok(keys)
    }

    pub fn gene_labels<D: AssociationStore>(
        &mut self,
        data: &D,
        variant: &Variant,
    ) -> Result<Vec<String>, DocsError> {
        let selection = self.selection(data, variant.id)?;
        let reconciler = &self.reconciler;
        let missing = &mut self.missing_identity;
        Ok(selection.labels(|gene_id| {
            let labels = reconciler.labels(gene_id);
            if labels.is_empty() {
                record_missing(missing, gene_id);
            }
            labels
        }))
    }
}

fn record_missing(missing: &mut BTreeSet<EntityId>, gene_id: EntityId) {
    if missing.insert(gene_id) {
        warn!(gene = gene_id, "{}", DocsError::MissingIdentity(gene_id.to_string()));
    }
}

/// Drops incomplete documents and aborts when nothing usable is left.
pub fn finalize(mut result: BuildResult) -> Result<BuildResult, DocsError> {
    let (genes, gene_errors) = retain_complete(std::mem::take(&mut result.genes));
    let (traits, trait_errors) = retain_complete(std::mem::take(&mut result.traits));
    let (variants, variant_errors) = retain_complete(std::mem::take(&mut result.variants));
    for err in gene_errors.iter().chain(&trait_errors).chain(&variant_errors) {
        warn!(error = %err, "document dropped");
        if let DocsError::IncompleteDocument { id, .. } = err {
            result.report.incomplete_documents.push(id.clone());
        }
    }
    result.genes = genes;
    result.traits = traits;
    result.variants = variants;
    result.report.gene_documents = result.genes.len();
    result.report.trait_documents = result.traits.len();
    result.report.variant_documents = result.variants.len();

    if result.document_count() == 0 {
        return Err(DocsError::EmptyOutput);
    }
    info!(
        genes = result.genes.len(),
        traits = result.traits.len(),
        variants = result.variants.len(),
        "documents ready"
    );
    Ok(result)
}
