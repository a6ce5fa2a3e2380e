//! Per-attempt selection pipeline.

use tessera_types::{TopologySnapshot, config::RankingStage};

use super::{
    AtMostTwoRandom, CompositeSelector, DeprioritizedNodes, LatencyWindow, LeastLoaded,
    NodeSelector, RegisteredNodes,
};
use crate::{
    config::ClusterSettings,
    context::Deprioritization,
    node::{NodeRegistrySnapshot, SelectedNode},
};

/// Builds the full pipeline for one attempt.
///
/// The race guard and deprioritization are fixed in position around the
/// caller's selector; ranking stages follow in configured order. A configured
/// `custom` stage with no custom selector set is skipped.
pub(crate) fn build<'a>(
    caller: &'a dyn NodeSelector,
    deprioritization: &Deprioritization,
    registry: &NodeRegistrySnapshot,
    settings: &'a ClusterSettings,
) -> CompositeSelector<'a> {
    let mut pipeline = CompositeSelector::new()
        .then(RegisteredNodes::new(registry.clone()))
        .then(caller)
        .then(DeprioritizedNodes::new(deprioritization.attempted()));

    for stage in &settings.config().ranking_stages {
        match stage {
            RankingStage::Custom => {
                if let Some(custom) = settings.custom_selector() {
                    pipeline.push(custom);
                }
            },
            RankingStage::LatencyWindow => {
                pipeline.push(LatencyWindow::new(settings.local_threshold()));
            },
            RankingStage::AtMostTwoRandom => pipeline.push(AtMostTwoRandom),
            RankingStage::LeastLoaded => pipeline.push(LeastLoaded::new(registry.clone())),
        }
    }
    pipeline
}

/// Runs one selection attempt against `snapshot`.
///
/// Reads the registry once, so the race guard and the final handle lookup see
/// the same set of handles. Returns `None` when nothing survives.
pub(crate) fn select(
    caller: &dyn NodeSelector,
    deprioritization: &Deprioritization,
    registry: &NodeRegistrySnapshot,
    settings: &ClusterSettings,
    snapshot: &TopologySnapshot,
) -> Option<SelectedNode> {
    let pipeline = build(caller, deprioritization, registry, settings);
    pipeline.select(snapshot).into_iter().find_map(|description| {
        registry
            .get(&description.address)
            .map(|node| SelectedNode { node: node.clone(), description })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tessera_types::{
        ClusterType, ConnectionMode, NodeDescription, NodeRole, ServerAddress,
        config::ClusterConfig,
    };

    use super::*;
    use crate::{
        mock::MockNode,
        node::ClusterableNode,
        selector::{AddressSelector, ReadableSelector, WritableSelector, selector_fn},
    };

    fn registry(nodes: &[&NodeDescription]) -> NodeRegistrySnapshot {
        nodes
            .iter()
            .map(|n| Arc::new(MockNode::new(n.address.clone())) as Arc<dyn ClusterableNode>)
            .collect()
    }

    fn settings(stages: Vec<RankingStage>) -> ClusterSettings {
        let config = ClusterConfig::builder().ranking_stages(stages).build().unwrap();
        ClusterSettings::builder().with_config(config).build().unwrap()
    }

    fn secondary(port: u16, rtt_ms: u64) -> NodeDescription {
        NodeDescription::connected(ServerAddress::tcp("n", port), NodeRole::Secondary)
            .with_round_trip_time(Duration::from_millis(rtt_ms))
    }

    fn snapshot(nodes: Vec<NodeDescription>) -> TopologySnapshot {
        TopologySnapshot::new(ConnectionMode::Multiple, ClusterType::ReplicaSet, nodes)
    }

    #[test]
    fn test_default_pipeline_stage_order() {
        let settings = ClusterSettings::builder()
            .with_custom_selector(Arc::new(selector_fn("custom", |s| s.nodes.clone())))
            .build()
            .unwrap();
        let pipeline =
            build(&ReadableSelector, &Deprioritization::default(), &registry(&[]), &settings);
        assert_eq!(
            pipeline.to_string(),
            "CompositeSelector{selectors=[RegisteredNodes{count=0}, ReadableSelector, \
             DeprioritizedNodes{attempted=[]}, custom, LatencyWindow{local_threshold=15ms}, \
             AtMostTwoRandom, LeastLoaded]}"
        );
    }

    #[test]
    fn test_missing_custom_selector_is_skipped() {
        let settings = ClusterSettings::default();
        let pipeline =
            build(&ReadableSelector, &Deprioritization::default(), &registry(&[]), &settings);
        assert_eq!(pipeline.len(), 6);
    }

    #[test]
    fn test_unregistered_node_is_never_selected() {
        let a = secondary(1, 0);
        let b = secondary(2, 0);
        let snapshot = snapshot(vec![a.clone(), b.clone()]);
        let registry = registry(&[&b]);
        for _ in 0..20 {
            let selected = select(
                &ReadableSelector,
                &Deprioritization::default(),
                &registry,
                &ClusterSettings::default(),
                &snapshot,
            )
            .unwrap();
            assert_eq!(selected.address(), &b.address);
        }
    }

    #[test]
    fn test_nothing_selected_when_caller_matches_nothing() {
        let a = secondary(1, 0);
        let result = select(
            &WritableSelector,
            &Deprioritization::default(),
            &registry(&[&a]),
            &ClusterSettings::default(),
            &snapshot(vec![a.clone()]),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_latency_window_applies_after_caller() {
        let fast = secondary(1, 1);
        let slow = secondary(2, 100);
        let settings = settings(vec![RankingStage::LatencyWindow]);
        let selected = select(
            &ReadableSelector,
            &Deprioritization::default(),
            &registry(&[&fast, &slow]),
            &settings,
            &snapshot(vec![slow.clone(), fast.clone()]),
        )
        .unwrap();
        assert_eq!(selected.address(), &fast.address);
    }

    #[test]
    fn test_deprioritized_address_is_avoided() {
        let a = secondary(1, 0);
        let b = secondary(2, 0);
        let deprioritization = Deprioritization::default();
        deprioritization.record(&a.address);
        let selected = select(
            &ReadableSelector,
            &deprioritization,
            &registry(&[&a, &b]),
            &settings(vec![]),
            &snapshot(vec![a.clone(), b.clone()]),
        )
        .unwrap();
        assert_eq!(selected.address(), &b.address);
    }

    #[test]
    fn test_deprioritized_address_used_when_only_choice() {
        let a = secondary(1, 0);
        let b = secondary(2, 0);
        let deprioritization = Deprioritization::default();
        deprioritization.record(&a.address);
        let selected = select(
            &AddressSelector::new(a.address.clone()),
            &deprioritization,
            &registry(&[&a, &b]),
            &settings(vec![]),
            &snapshot(vec![a.clone(), b.clone()]),
        )
        .unwrap();
        assert_eq!(selected.address(), &a.address);
    }
}
