use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CountKind, EntityId, GeneOverlapRecord, TermId, Variant};
use crate::error::DocsError;
use crate::reconcile::GeneCrossRefs;

/// Gene overlap rows for one variant, pre-filtered to its chromosome.
pub trait OverlapSource {
    fn overlaps(&self, variant_id: EntityId) -> Result<Vec<GeneOverlapRecord>, DocsError>;
}

pub trait CrossRefLookup {
    fn cross_refs(&self, gene_id: EntityId) -> Result<Option<GeneCrossRefs>, DocsError>;
}

/// Entity ids linked to any term of a bounded batch.
pub trait CountStore {
    fn max_batch(&self) -> usize;
    fn linked_entities(
        &self,
        kind: CountKind,
        terms: &[TermId],
    ) -> Result<BTreeSet<EntityId>, DocsError>;
}

/// Row-level reads the pipeline needs besides the three lookups above.
pub trait RecordSource {
    fn variants(&self) -> Result<Vec<Variant>, DocsError>;
    fn associations(&self) -> Result<Vec<AssociationRow>, DocsError>;
    fn traits(&self) -> Result<Vec<TraitRow>, DocsError>;
    fn reported_traits(&self, term: &TermId) -> Result<Vec<String>, DocsError>;
    fn variant_counts(&self, variant_id: EntityId) -> Result<VariantCounts, DocsError>;
}

/// Everything the pipeline reads from the association database.
pub trait AssociationStore: RecordSource + OverlapSource + CrossRefLookup + CountStore {}

impl<T> AssociationStore for T where T: RecordSource + OverlapSource + CrossRefLookup + CountStore {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRow {
    pub id: EntityId,
    pub study_id: EntityId,
    #[serde(default)]
    pub variant_ids: Vec<EntityId>,
    #[serde(default)]
    pub trait_short_forms: Vec<TermId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRow {
    pub id: EntityId,
    #[serde(default)]
    pub trait_short_forms: Vec<TermId>,
    #[serde(default)]
    pub reported_traits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRow {
    pub id: EntityId,
    pub label: String,
    pub uri: String,
    pub short_form: TermId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariantCounts {
    pub association_count: usize,
    pub study_count: usize,
}

/// Table export of the association database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotTables {
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub genomic_contexts: Vec<GeneOverlapRecord>,
    #[serde(default)]
    pub genes: Vec<GeneCrossRefs>,
    #[serde(default)]
    pub associations: Vec<AssociationRow>,
    #[serde(default)]
    pub studies: Vec<StudyRow>,
    #[serde(default)]
    pub traits: Vec<TraitRow>,
}

/// In-memory, indexed view over [`SnapshotTables`] implementing every source
/// trait. Term lookups reject batches above `max_batch` the way the database
/// rejects oversized IN lists.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tables: SnapshotTables,
    max_batch: usize,
    overlaps: HashMap<EntityId, Vec<GeneOverlapRecord>>,
    genes: HashMap<EntityId, GeneCrossRefs>,
    studies_by_term: HashMap<TermId, BTreeSet<EntityId>>,
    associations_by_term: HashMap<TermId, BTreeSet<EntityId>>,
    reported_by_study: HashMap<EntityId, Vec<String>>,
    associations_by_variant: HashMap<EntityId, Vec<(EntityId, EntityId)>>,
}

pub const DEFAULT_MAX_BATCH: usize = 999;

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, DocsError> {
        let file = File::open(path).map_err(|_| DocsError::SnapshotRead(path.to_path_buf()))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        let tables: SnapshotTables = serde_json::from_reader(reader)
            .map_err(|err| DocsError::SnapshotParse(err.to_string()))?;
        info!(
            variants = tables.variants.len(),
            associations = tables.associations.len(),
            traits = tables.traits.len(),
            "snapshot loaded"
        );
        Ok(Self::new(tables, DEFAULT_MAX_BATCH))
    }

    pub fn new(tables: SnapshotTables, max_batch: usize) -> Self {
        let mut overlaps: HashMap<EntityId, Vec<GeneOverlapRecord>> = HashMap::new();
        for record in &tables.genomic_contexts {
            overlaps
                .entry(record.variant_id)
                .or_default()
                .push(record.clone());
        }

        let mut genes: HashMap<EntityId, GeneCrossRefs> = HashMap::new();
        for row in &tables.genes {
            let entry = genes.entry(row.gene_id).or_insert_with(|| GeneCrossRefs {
                gene_id: row.gene_id,
                symbol: row.symbol.clone(),
                ..GeneCrossRefs::default()
            });
            entry.ensembl_ids.extend(row.ensembl_ids.iter().cloned());
            entry.entrez_ids.extend(row.entrez_ids.iter().cloned());
            entry.synonyms.extend(row.synonyms.iter().cloned());
            entry.alternative_ids.extend(row.alternative_ids.iter().cloned());
        }

        let mut studies_by_term: HashMap<TermId, BTreeSet<EntityId>> = HashMap::new();
        let mut reported_by_study = HashMap::new();
        for study in &tables.studies {
            for term in &study.trait_short_forms {
                studies_by_term
                    .entry(term.clone())
                    .or_default()
                    .insert(study.id);
            }
            reported_by_study.insert(study.id, study.reported_traits.clone());
        }

        let mut associations_by_term: HashMap<TermId, BTreeSet<EntityId>> = HashMap::new();
        let mut associations_by_variant: HashMap<EntityId, Vec<(EntityId, EntityId)>> =
            HashMap::new();
        for association in &tables.associations {
            for term in &association.trait_short_forms {
                associations_by_term
                    .entry(term.clone())
                    .or_default()
                    .insert(association.id);
            }
            for variant_id in &association.variant_ids {
                associations_by_variant
                    .entry(*variant_id)
                    .or_default()
                    .push((association.id, association.study_id));
            }
        }

        Self {
            tables,
            max_batch,
            overlaps,
            genes,
            studies_by_term,
            associations_by_term,
            reported_by_study,
            associations_by_variant,
        }
    }

    pub fn tables(&self) -> &SnapshotTables {
        &self.tables
    }
}

impl OverlapSource for Snapshot {
    fn overlaps(&self, variant_id: EntityId) -> Result<Vec<GeneOverlapRecord>, DocsError> {
        Ok(self.overlaps.get(&variant_id).cloned().unwrap_or_default())
    }
}

impl CrossRefLookup for Snapshot {
    fn cross_refs(&self, gene_id: EntityId) -> Result<Option<GeneCrossRefs>, DocsError> {
        Ok(self.genes.get(&gene_id).cloned())
    }
}

impl CountStore for Snapshot {
    fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn linked_entities(
        &self,
        kind: CountKind,
        terms: &[TermId],
    ) -> Result<BTreeSet<EntityId>, DocsError> {
        if terms.len() > self.max_batch {
            return Err(DocsError::BatchTooLarge {
                size: terms.len(),
                limit: self.max_batch,
            });
        }
        let index = match kind {
            CountKind::Study => &self.studies_by_term,
            CountKind::Association => &self.associations_by_term,
        };
        Ok(terms
            .iter()
            .filter_map(|term| index.get(term))
            .flatten()
            .copied()
            .collect())
    }
}

impl RecordSource for Snapshot {
    fn variants(&self) -> Result<Vec<Variant>, DocsError> {
        Ok(self.tables.variants.clone())
    }

    fn associations(&self) -> Result<Vec<AssociationRow>, DocsError> {
        Ok(self.tables.associations.clone())
    }

    fn traits(&self) -> Result<Vec<TraitRow>, DocsError> {
        Ok(self.tables.traits.clone())
    }

    fn reported_traits(&self, term: &TermId) -> Result<Vec<String>, DocsError> {
        let mut reported = BTreeSet::new();
        if let Some(studies) = self.studies_by_term.get(term) {
            for study in studies {
                if let Some(labels) = self.reported_by_study.get(study) {
                    reported.extend(labels.iter().cloned());
                }
            }
        }
        Ok(reported.into_iter().collect())
    }

    fn variant_counts(&self, variant_id: EntityId) -> Result<VariantCounts, DocsError> {
        let Some(rows) = self.associations_by_variant.get(&variant_id) else {
            return Ok(VariantCounts::default());
        };
        let associations = rows.iter().map(|(id, _)| *id).collect::<BTreeSet<_>>();
        let studies = rows.iter().map(|(_, study)| *study).collect::<BTreeSet<_>>();
        Ok(VariantCounts {
            association_count: associations.len(),
            study_count: studies.len(),
        })
    }
}
