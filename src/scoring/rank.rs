use std::collections::{BTreeMap, BTreeSet, HashMap};
use crate::core::config::ScoringConfig;
use crate::core::types::{DocId, DocumentLink};

/// Outcome of a rank computation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRanks {
    pub ranks: BTreeMap<DocId, f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl DocumentRanks {
    pub fn get(&self, doc_id: &DocId) -> f64 {
        self.ranks.get(doc_id).copied().unwrap_or(0.0)
    }

    /// Rank scaled by collection size, so an average document sits near 1.0
    pub fn normalized(&self, doc_id: &DocId) -> f32 {
        (self.get(doc_id) * self.ranks.len() as f64) as f32
    }
}

/// Iterative PageRank over the document link graph.
///
/// `rank(d) = (1 - damping) / N + damping * sum(rank(s) * w(s->d) / out_weight(s))`
/// Documents without incoming links settle at the `(1 - damping) / N` floor.
/// Links touching unknown documents, self-links and non-positive weights are ignored.
pub fn calculate_document_ranks(
    documents: &BTreeSet<DocId>,
    links: &[DocumentLink],
    config: &ScoringConfig,
) -> DocumentRanks {
    let n = documents.len();
    if n == 0 {
        return DocumentRanks { converged: true, ..DocumentRanks::default() };
    }

    let damping = config.damping_factor;
    let floor = (1.0 - damping) / n as f64;

    // target -> [(source, weight)], plus total outgoing weight per source
    let mut incoming: HashMap<&DocId, Vec<(&DocId, f64)>> = HashMap::new();
    let mut out_weight: HashMap<&DocId, f64> = HashMap::new();
    for link in links {
        let weight = link.weight as f64;
        if link.source == link.target
            || !(weight > 0.0)
            || !documents.contains(&link.source)
            || !documents.contains(&link.target)
        {
            continue;
        }
        incoming.entry(&link.target).or_default().push((&link.source, weight));
        *out_weight.entry(&link.source).or_insert(0.0) += weight;
    }

    // Without edges every document sits at the floor
    if incoming.is_empty() {
        return DocumentRanks {
            ranks: documents.iter().map(|doc| (doc.clone(), floor)).collect(),
            iterations: 0,
            converged: true,
        };
    }

    let mut ranks: HashMap<&DocId, f64> = documents.iter().map(|d| (d, 1.0 / n as f64)).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let mut max_delta = 0.0f64;
        let mut next = HashMap::with_capacity(n);

        for doc in documents {
            let inflow: f64 = incoming
                .get(doc)
                .map(|sources| {
                    sources.iter()
                        .map(|(source, weight)| ranks[source] * weight / out_weight[source])
                        .sum()
                })
                .unwrap_or(0.0);
            let rank = floor + damping * inflow;
            max_delta = max_delta.max((rank - ranks[doc]).abs());
            next.insert(doc, rank);
        }

        ranks = next;
        if max_delta < config.convergence_threshold {
            converged = true;
            break;
        }
    }

    DocumentRanks {
        ranks: ranks.into_iter().map(|(doc, rank)| (doc.clone(), rank)).collect(),
        iterations,
        converged,
    }
}
