//! Attribution of a variant to the gene(s) it sits in or next to.
//!
//! Overlapping genes win outright. Without an overlap, the nearest upstream
//! and nearest downstream genes are taken, keeping every gene tied at the
//! minimum distance on its side.

use std::collections::BTreeSet;

use crate::domain::{EntityId, GeneOverlapRecord};

pub const INTERGENIC: &str = "intergenic";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneSelection {
    /// Internal gene ids in first-seen order.
    Mapped(Vec<EntityId>),
    Intergenic,
}

impl GeneSelection {
    pub fn gene_ids(&self) -> &[EntityId] {
        match self {
            GeneSelection::Mapped(ids) => ids,
            GeneSelection::Intergenic => &[],
        }
    }

    pub fn is_intergenic(&self) -> bool {
        matches!(self, GeneSelection::Intergenic)
    }

    /// Renders each mapped gene with `render`, or the intergenic sentinel.
    /// A mapped gene may render to no label at all; the selection then stays
    /// mapped and yields fewer labels, never the sentinel.
    pub fn labels<F>(&self, mut render: F) -> Vec<String>
    where
        F: FnMut(EntityId) -> Vec<String>,
    {
        match self {
            GeneSelection::Mapped(ids) => ids.iter().flat_map(|id| render(*id)).collect(),
            GeneSelection::Intergenic => vec![INTERGENIC.to_string()],
        }
    }
}

pub fn select_genes(records: &[GeneOverlapRecord]) -> GeneSelection {
    let overlapping = records
        .iter()
        .filter(|record| record.overlaps_gene_body())
        .map(|record| record.gene_id);
    let overlapping = dedup_in_order(overlapping);
    if !overlapping.is_empty() {
        return GeneSelection::Mapped(overlapping);
    }

    let upstream = nearest(records.iter().filter(|record| record.is_upstream));
    let downstream = nearest(records.iter().filter(|record| record.is_downstream));
    let nearest = dedup_in_order(upstream.into_iter().chain(downstream));
    if nearest.is_empty() {
        GeneSelection::Intergenic
    } else {
        GeneSelection::Mapped(nearest)
    }
}

fn nearest<'a, I>(candidates: I) -> Vec<EntityId>
where
    I: Iterator<Item = &'a GeneOverlapRecord> + Clone,
{
    let Some(minimum) = candidates
        .clone()
        .map(|record| record.distance.unsigned_abs())
        .min()
    else {
        return Vec::new();
    };
    candidates
        .filter(|record| record.distance.unsigned_abs() == minimum)
        .map(|record| record.gene_id)
        .collect()
}

fn dedup_in_order<I>(ids: I) -> Vec<EntityId>
where
    I: IntoIterator<Item = EntityId>,
{
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
