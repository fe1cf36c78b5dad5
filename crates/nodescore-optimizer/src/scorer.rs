//! Weighted aggregation of normalized metrics

use nodescore_core::{NodeScore, NormalizedMetric, Weights};
use std::cmp::Ordering;

/// `alpha * latency + beta * bandwidth (+ gamma * energy)` per node.
///
/// The energy term is added only for nodes normalized with energy enabled.
pub fn score_nodes(normalized: &[NormalizedMetric], weights: &Weights) -> Vec<NodeScore> {
    normalized
        .iter()
        .map(|m| {
            let mut score = weights.alpha * m.latency + weights.beta * m.bandwidth;
            if let Some(energy) = m.energy {
                score += weights.gamma * energy;
            }
            NodeScore {
                node: m.node.clone(),
                score,
            }
        })
        .collect()
}

/// Highest score wins; ties go to the lexicographically smallest node name
pub fn select_best(scores: &[NodeScore]) -> Option<&NodeScore> {
    scores.iter().min_by(|a, b| rank(a, b))
}

fn rank(a: &NodeScore, b: &NodeScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.node.cmp(&b.node))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(
        node: &str,
        latency: f64,
        bandwidth: f64,
        energy: Option<f64>,
    ) -> NormalizedMetric {
        NormalizedMetric {
            node: node.to_string(),
            latency,
            bandwidth,
            energy,
        }
    }

    #[test]
    fn test_weighted_score_without_energy() {
        let weights = Weights {
            alpha: 0.5,
            beta: 0.3,
            gamma: 0.2,
        };
        let scores = score_nodes(&[normalized("a", 1.0, 0.5, None)], &weights);
        assert!((scores[0].score - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_score_with_energy() {
        let weights = Weights {
            alpha: 0.5,
            beta: 0.3,
            gamma: 0.2,
        };
        let scores = score_nodes(&[normalized("a", 1.0, 0.5, Some(0.5))], &weights);
        assert!((scores[0].score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        let weights = Weights {
            alpha: 2.0,
            beta: 1.0,
            gamma: 0.0,
        };
        let scores = score_nodes(&[normalized("a", 1.0, 1.0, None)], &weights);
        assert_eq!(scores[0].score, 3.0);
    }

    #[test]
    fn test_select_best() {
        let scores = vec![
            NodeScore { node: "a".to_string(), score: 0.2 },
            NodeScore { node: "b".to_string(), score: 0.9 },
            NodeScore { node: "c".to_string(), score: 0.4 },
        ];
        assert_eq!(select_best(&scores).unwrap().node, "b");
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_select_best_tie_is_order_independent() {
        let forward = vec![
            NodeScore { node: "node-b".to_string(), score: 0.5 },
            NodeScore { node: "node-a".to_string(), score: 0.5 },
        ];
        let reversed: Vec<NodeScore> = forward.iter().rev().cloned().collect();

        assert_eq!(select_best(&forward).unwrap().node, "node-a");
        assert_eq!(select_best(&reversed).unwrap().node, "node-a");
    }
}
