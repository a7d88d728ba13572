//! Clustering engine
//!
//! Single-pass, greedy, first-fit clustering:
//!
//! 1. Extract a signature for every record
//! 2. Exact match: join the cluster that already holds the fingerprint
//! 3. Fuzzy match: otherwise join the best-scoring cluster of the same
//!    category whose representative scores at least `threshold`
//!    (ties go to the earliest-created cluster)
//! 4. Otherwise start a new singleton cluster
//!
//! Assignment is order-sensitive by design: the same records in a different
//! order may cluster differently. For a fixed input order the result is
//! fully deterministic. Cost is O(n·k) with k the number of same-category
//! clusters alive when a record is processed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ClusterResult;
use crate::normalize::Normalizer;
use crate::params::{ClusterParams, SortBy};
use crate::signature::{ErrorCategory, ErrorSignature};
use crate::similarity::similarity;
use crate::types::{Cluster, ClusterReport, ClusterSummary, FailureRecord, MatchType, PageInfo};

/// Cluster the records with the built-in normalizer.
///
/// `params` must already be valid; see [`try_cluster`].
pub fn cluster(records: &[FailureRecord], params: &ClusterParams) -> ClusterReport {
    ClusteringEngine::default().cluster(records, params)
}

/// Validate `params`, then cluster with the built-in normalizer
pub fn try_cluster(records: &[FailureRecord], params: &ClusterParams) -> ClusterResult<ClusterReport> {
    ClusteringEngine::default().try_cluster(records, params)
}

/// A cluster while records are still being assigned
struct Draft<'a> {
    representative: ErrorSignature,
    match_type: MatchType,
    members: Vec<&'a FailureRecord>,
}

impl<'a> Draft<'a> {
    fn new(representative: ErrorSignature, first: &'a FailureRecord) -> Self {
        Self {
            representative,
            match_type: MatchType::Exact,
            members: vec![first],
        }
    }

    fn finish(self) -> Cluster {
        let mut topologies = BTreeSet::new();
        let mut priorities: BTreeMap<String, usize> = BTreeMap::new();

        for member in &self.members {
            if let Some(topology) = &member.topology {
                topologies.insert(topology.clone());
            }
            *priorities.entry(member.priority_key().to_string()).or_default() += 1;
        }

        let sample_message = self
            .members
            .first()
            .map(|m| m.message().to_string())
            .unwrap_or_default();

        Cluster {
            signature: self.representative,
            match_type: self.match_type,
            count: self.members.len(),
            topologies: topologies.into_iter().collect(),
            priorities,
            sample_message,
            members: self.members.into_iter().cloned().collect(),
        }
    }
}

/// Stateless clustering engine; owns only its normalizer
#[derive(Debug, Clone, Default)]
pub struct ClusteringEngine {
    normalizer: Normalizer,
}

impl ClusteringEngine {
    /// Create an engine around a configured normalizer
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Extract one signature per record, in input order
    pub fn signatures(&self, records: &[FailureRecord]) -> Vec<ErrorSignature> {
        records
            .iter()
            .map(|r| ErrorSignature::extract(r, &self.normalizer))
            .collect()
    }

    /// Validate `params`, then cluster
    pub fn try_cluster(
        &self,
        records: &[FailureRecord],
        params: &ClusterParams,
    ) -> ClusterResult<ClusterReport> {
        params.validate()?;
        Ok(self.cluster(records, params))
    }

    /// Cluster, rank and paginate. `params` must already be valid.
    pub fn cluster(&self, records: &[FailureRecord], params: &ClusterParams) -> ClusterReport {
        let drafts = self.assign(records, params.threshold);

        let unclustered = drafts.iter().filter(|d| d.members.len() == 1).count();
        let formed = drafts.len();

        let mut clusters: Vec<Cluster> = drafts
            .into_iter()
            .map(Draft::finish)
            .filter(|c| c.count >= params.min_cluster_size)
            .collect();

        sort_clusters(&mut clusters, params.sort_by);

        let summary = ClusterSummary {
            total_failures: records.len(),
            unique_clusters: clusters.len(),
            largest_cluster: clusters.iter().map(|c| c.count).max().unwrap_or(0),
            unclustered,
        };

        tracing::info!(
            total_failures = summary.total_failures,
            clusters_formed = formed,
            unique_clusters = summary.unique_clusters,
            largest_cluster = summary.largest_cluster,
            unclustered = summary.unclustered,
            "Clustered failures"
        );

        let page: Vec<Cluster> = clusters
            .into_iter()
            .skip(params.skip)
            .take(params.limit.unwrap_or(usize::MAX))
            .collect();

        ClusterReport {
            page: PageInfo {
                skip: params.skip,
                limit: params.limit,
                returned: page.len(),
            },
            clusters: page,
            summary,
        }
    }

    /// Greedy single pass; drafts come back in creation order
    fn assign<'a>(&self, records: &'a [FailureRecord], threshold: f64) -> Vec<Draft<'a>> {
        let mut drafts: Vec<Draft<'a>> = Vec::new();
        let mut by_fingerprint: HashMap<String, usize> = HashMap::new();
        // fuzzy candidates per category, in creation order
        let mut by_category: HashMap<ErrorCategory, Vec<usize>> = HashMap::new();

        for (record, signature) in records.iter().zip(self.signatures(records)) {
            if let Some(&idx) = by_fingerprint.get(&signature.fingerprint) {
                drafts[idx].members.push(record);
                continue;
            }

            let best = by_category
                .get(&signature.error_category)
                .and_then(|candidates| best_match(&drafts, candidates, &signature, threshold));

            match best {
                Some((idx, score)) => {
                    tracing::debug!(
                        test = %record.test_name,
                        category = %signature.error_category,
                        score,
                        cluster = idx,
                        "Fuzzy match"
                    );
                    let draft = &mut drafts[idx];
                    draft.members.push(record);
                    draft.match_type = MatchType::Fuzzy;
                    // later records with this exact fingerprint follow it here
                    by_fingerprint.insert(signature.fingerprint, idx);
                }
                None => {
                    let idx = drafts.len();
                    by_fingerprint.insert(signature.fingerprint.clone(), idx);
                    by_category
                        .entry(signature.error_category.clone())
                        .or_default()
                        .push(idx);
                    drafts.push(Draft::new(signature, record));
                }
            }
        }

        drafts
    }
}

/// Highest-scoring candidate at or above `threshold`; earliest wins ties
fn best_match(
    drafts: &[Draft<'_>],
    candidates: &[usize],
    signature: &ErrorSignature,
    threshold: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for &idx in candidates {
        let score = similarity(&drafts[idx].representative, signature);
        if score < threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }

    best
}

/// Stable sort, so equal keys keep creation order
fn sort_clusters(clusters: &mut [Cluster], sort_by: SortBy) {
    match sort_by {
        SortBy::Count => clusters.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.error_category().as_str().cmp(b.error_category().as_str()))
        }),
        SortBy::ErrorCategory => clusters.sort_by(|a, b| {
            a.error_category()
                .as_str()
                .cmp(b.error_category().as_str())
                .then_with(|| b.count.cmp(&a.count))
        }),
    }
}
