use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::{EntityId, GeneKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneAssociations {
    pub rs_ids: BTreeSet<String>,
    pub study_ids: BTreeSet<EntityId>,
    pub association_ids: BTreeSet<EntityId>,
}

impl GeneAssociations {
    pub fn study_count(&self) -> usize {
        self.study_ids.len()
    }

    /// An association counts once per gene however many of its variants map
    /// to that gene.
    pub fn association_count(&self) -> usize {
        self.association_ids.len()
    }
}

/// Gene to contributing variants, studies and associations, built up across
/// the association pass.
#[derive(Debug, Clone, Default)]
pub struct GeneAccumulator {
    genes: BTreeMap<GeneKey, GeneAssociations>,
}

impl GeneAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        gene: &GeneKey,
        association_id: EntityId,
        study_id: EntityId,
        rs_id: &str,
    ) {
        let entry = self.genes.entry(gene.clone()).or_default();
        entry.rs_ids.insert(rs_id.to_string());
        entry.study_ids.insert(study_id);
        entry.association_ids.insert(association_id);
    }

    pub fn merge(&mut self, other: GeneAccumulator) {
        for (gene, incoming) in other.genes {
            let entry = self.genes.entry(gene).or_default();
            entry.rs_ids.extend(incoming.rs_ids);
            entry.study_ids.extend(incoming.study_ids);
            entry.association_ids.extend(incoming.association_ids);
        }
    }

    pub fn get(&self, gene: &GeneKey) -> Option<&GeneAssociations> {
        self.genes.get(gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn into_genes(self) -> BTreeMap<GeneKey, GeneAssociations> {
        self.genes
    }
}
