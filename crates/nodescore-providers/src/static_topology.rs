//! Topology provider serving a fixed placement map

use async_trait::async_trait;
use nodescore_core::{NodescoreResult, PlacementMap};

use crate::traits::TopologyProvider;

/// Placement map taken from configuration
pub struct StaticTopology {
    placement: PlacementMap,
}

impl StaticTopology {
    pub fn new(placement: PlacementMap) -> Self {
        Self { placement }
    }
}

#[async_trait]
impl TopologyProvider for StaticTopology {
    async fn placement(&self, workloads: &[String]) -> NodescoreResult<PlacementMap> {
        Ok(workloads
            .iter()
            .filter_map(|w| self.placement.get(w).map(|nodes| (w.clone(), nodes.clone())))
            .collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
