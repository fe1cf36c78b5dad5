//! Topology classification of a source/destination workload pair
//!
//! | source nodes | destination nodes | outcome |
//! |---|---|---|
//! | 1 | 1 | trivial: the destination node |
//! | 1 | >1 | score the destination nodes |
//! | >1 | 1 | score the source nodes |
//! | >1 | >1 | `UnhandledTopology` error |
//! | 0 | any | `WorkloadNotPlaced` error |
//! | any | 0 | `WorkloadNotPlaced` error |

use nodescore_core::{NodescoreError, NodescoreResult};
use std::collections::BTreeMap;

/// What has to happen to reach a placement decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyClass {
    /// Both workloads sit on a single node each; no scoring needed
    Trivial { node: String },
    /// Source on one node, destination spread: pick among destination nodes
    ScoreDestinations(Vec<String>),
    /// Source spread, destination on one node: pick among source nodes
    ScoreSources(Vec<String>),
}

impl TopologyClass {
    /// Nodes that need scoring, empty for a trivial decision
    pub fn candidates(&self) -> &[String] {
        match self {
            TopologyClass::Trivial { .. } => &[],
            TopologyClass::ScoreDestinations(nodes) | TopologyClass::ScoreSources(nodes) => nodes,
        }
    }
}

/// Nodes hosting at least one instance, in name order
fn occupied(nodes: &BTreeMap<String, u32>) -> Vec<String> {
    nodes
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(node, _)| node.clone())
        .collect()
}

/// Decide between a trivial and a scored placement
pub fn classify(
    source_workload: &str,
    source_nodes: &BTreeMap<String, u32>,
    destination_workload: &str,
    destination_nodes: &BTreeMap<String, u32>,
) -> NodescoreResult<TopologyClass> {
    let sources = occupied(source_nodes);
    let mut destinations = occupied(destination_nodes);

    match (sources.len(), destinations.len()) {
        (0, _) => Err(NodescoreError::WorkloadNotPlaced(source_workload.to_string())),
        (_, 0) => Err(NodescoreError::WorkloadNotPlaced(
            destination_workload.to_string(),
        )),
        (1, 1) => Ok(TopologyClass::Trivial {
            node: destinations.remove(0),
        }),
        (1, _) => Ok(TopologyClass::ScoreDestinations(destinations)),
        (_, 1) => Ok(TopologyClass::ScoreSources(sources)),
        _ => Err(NodescoreError::UnhandledTopology {
            source_workload: source_workload.to_string(),
            destination_workload: destination_workload.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(names: &[&str]) -> BTreeMap<String, u32> {
        names.iter().map(|n| (n.to_string(), 1)).collect()
    }

    #[test]
    fn test_single_to_single_is_trivial() {
        let class = classify("src", &nodes(&["edge-1"]), "dst", &nodes(&["edge-2"])).unwrap();
        assert_eq!(
            class,
            TopologyClass::Trivial {
                node: "edge-2".to_string()
            }
        );
        assert!(class.candidates().is_empty());
    }

    #[test]
    fn test_single_to_many_scores_destinations() {
        let class = classify(
            "src",
            &nodes(&["edge-1"]),
            "dst",
            &nodes(&["edge-3", "edge-2"]),
        )
        .unwrap();
        assert_eq!(
            class,
            TopologyClass::ScoreDestinations(vec!["edge-2".to_string(), "edge-3".to_string()])
        );
    }

    #[test]
    fn test_many_to_single_scores_sources() {
        let class = classify(
            "src",
            &nodes(&["edge-1", "edge-2"]),
            "dst",
            &nodes(&["edge-3"]),
        )
        .unwrap();
        assert_eq!(class.candidates(), ["edge-1".to_string(), "edge-2".to_string()]);
        assert!(matches!(class, TopologyClass::ScoreSources(_)));
    }

    #[test]
    fn test_many_to_many_is_unhandled() {
        let err = classify(
            "src",
            &nodes(&["edge-1", "edge-2"]),
            "dst",
            &nodes(&["edge-3", "edge-4"]),
        )
        .unwrap_err();
        assert!(matches!(err, NodescoreError::UnhandledTopology { .. }));
    }

    #[test]
    fn test_unplaced_workload() {
        let err = classify("src", &BTreeMap::new(), "dst", &nodes(&["edge-1"])).unwrap_err();
        assert!(matches!(err, NodescoreError::WorkloadNotPlaced(ref w) if w == "src"));

        let mut zero = BTreeMap::new();
        zero.insert("edge-2".to_string(), 0);
        let err = classify("src", &nodes(&["edge-1"]), "dst", &zero).unwrap_err();
        assert!(matches!(err, NodescoreError::WorkloadNotPlaced(ref w) if w == "dst"));
    }
}
