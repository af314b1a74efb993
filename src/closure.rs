//! Descendant closure of an ontology term and the study/association counts
//! attributable to it.
//!
//! The closure is fetched page by page from the term service. Counts are
//! collected as entity ids per batch of terms, since the backing store bounds
//! the number of values in one lookup, and the union of those ids is counted
//! so an entity linked to several terms is counted once.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{AggregateCount, CountKind, EntityId, TermId, TermMetadata};
use crate::error::DocsError;
use crate::ols::TermService;
use crate::source::CountStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ClosureStatus {
    Complete,
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermClosure {
    pub root: TermId,
    /// Root plus every descendant, deduplicated.
    pub members: BTreeSet<TermId>,
    pub pages_fetched: usize,
    pub status: ClosureStatus,
}

impl TermClosure {
    pub fn single(root: TermId, status: ClosureStatus) -> Self {
        let members = BTreeSet::from([root.clone()]);
        Self {
            root,
            members,
            pages_fetched: 0,
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ClosureStatus::Degraded(_))
    }

    pub fn descendant_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureSettings {
    pub page_size: usize,
    pub max_pages: usize,
    pub max_batch: usize,
}

impl Default for ClosureSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: 200,
            max_batch: 999,
        }
    }
}

pub struct TermClosureAggregator<'a, T: TermService> {
    terms: &'a T,
    settings: ClosureSettings,
}

impl<'a, T: TermService> TermClosureAggregator<'a, T> {
    pub fn new(terms: &'a T, settings: ClosureSettings) -> Self {
        Self { terms, settings }
    }

    /// Resolves the term's metadata, then its closure.
    pub fn closure_for_iri(&self, root: TermId, iri: &str) -> (Option<TermMetadata>, TermClosure) {
        match self.terms.fetch_term(iri) {
            Ok(metadata) => {
                let closure = self.closure(root, &metadata);
                (Some(metadata), closure)
            }
            Err(err) => {
                warn!(term = %root, error = %err, "term lookup failed, counting the term alone");
                let closure = TermClosure::single(root, ClosureStatus::Degraded(err.to_string()));
                (None, closure)
            }
        }
    }

    pub fn closure(&self, root: TermId, metadata: &TermMetadata) -> TermClosure {
        let Some(link) = metadata.descendants_link.as_deref() else {
            return TermClosure::single(root, ClosureStatus::Complete);
        };
        match self.fetch_all_pages(&root, link) {
            Ok((descendants, pages_fetched, status)) => {
                let mut members = descendants;
                members.insert(root.clone());
                TermClosure {
                    root,
                    members,
                    pages_fetched,
                    status,
                }
            }
            Err(err) => {
                warn!(term = %root, error = %err, "descendant lookup failed, counting the term alone");
                TermClosure::single(root, ClosureStatus::Degraded(err.to_string()))
            }
        }
    }

    fn fetch_all_pages(
        &self,
        root: &TermId,
        link: &str,
    ) -> Result<(BTreeSet<TermId>, usize, ClosureStatus), DocsError> {
        let page_size = self.settings.page_size.max(1);
        let first = self.terms.fetch_descendants(link, 0, page_size)?;
        let total_pages = first.total_pages;
        let mut descendants = BTreeSet::new();
        collect_ids(&mut descendants, &first.short_forms)?;

        let mut status = ClosureStatus::Complete;
        let last_page = if total_pages > self.settings.max_pages {
            warn!(
                term = %root,
                total_pages,
                max_pages = self.settings.max_pages,
                "reported page count exceeds the cap, closure truncated"
            );
            status = ClosureStatus::Degraded(format!(
                "truncated at {} of {} pages",
                self.settings.max_pages, total_pages
            ));
            self.settings.max_pages
        } else {
            total_pages
        };

        let mut pages_fetched = 1;
        for page in 1..last_page {
            let next = self.terms.fetch_descendants(link, page, page_size)?;
            collect_ids(&mut descendants, &next.short_forms)?;
            pages_fetched += 1;
        }
        debug!(term = %root, pages_fetched, descendants = descendants.len(), "closure resolved");
        Ok((descendants, pages_fetched, status))
    }

    /// Distinct study and association counts over the closure.
    pub fn aggregate<S: CountStore>(&self, closure: &TermClosure, store: &S) -> AggregateCount {
        let terms = closure.members.iter().cloned().collect::<Vec<_>>();
        let mut degraded = closure.is_degraded();

        let mut count = |kind: CountKind| match distinct_linked(store, kind, &terms, self.batch_size(store)) {
            Ok(ids) => ids.len(),
            Err(err) => {
                warn!(term = %closure.root, %kind, error = %err, "batched count failed, counting the term alone");
                degraded = true;
                match store.linked_entities(kind, std::slice::from_ref(&closure.root)) {
                    Ok(ids) => ids.len(),
                    Err(err) => {
                        warn!(term = %closure.root, %kind, error = %err, "single-term count failed");
                        0
                    }
                }
            }
        };
        let study_count = count(CountKind::Study);
        let association_count = count(CountKind::Association);

        AggregateCount {
            term: closure.root.clone(),
            study_count,
            association_count,
            closure_size: closure.len(),
            degraded,
        }
    }

    fn batch_size<S: CountStore>(&self, store: &S) -> usize {
        self.settings.max_batch.min(store.max_batch()).max(1)
    }
}

/// Union of the entity ids linked to `terms`, queried in contiguous batches of
/// at most `batch_size` terms.
pub fn distinct_linked<S: CountStore>(
    store: &S,
    kind: CountKind,
    terms: &[TermId],
    batch_size: usize,
) -> Result<BTreeSet<EntityId>, DocsError> {
    let mut union = BTreeSet::new();
    for batch in terms.chunks(batch_size.max(1)) {
        debug!(%kind, batch = batch.len(), "counting batch");
        union.extend(store.linked_entities(kind, batch)?);
    }
    Ok(union)
}

fn collect_ids(target: &mut BTreeSet<TermId>, short_forms: &[String]) -> Result<(), DocsError> {
    for short_form in short_forms {
        let id = short_form
            .parse::<TermId>()
            .map_err(|err| DocsError::MalformedPayload {
                source_name: "OLS",
                message: err.to_string(),
            })?;
        target.insert(id);
    }
    Ok(())
}
