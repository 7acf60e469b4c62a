//! Property tests for classification and aggregation.

use std::sync::Arc;

use proptest::prelude::*;
use tier0_audit::{
    ClassificationEngine, Crossing, Direction, EdgeType, FindingsSet, GraphEdge, GraphNode,
    NodeId, PolicyMatrix, Report, WorkerPool,
};

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::IntoT0), Just(Direction::IntoT1)]
}

fn edge_type() -> impl Strategy<Value = EdgeType> {
    (0..EdgeType::ALL.len()).prop_map(|i| EdgeType::ALL[i])
}

fn crossing(id: i64, edge_type: &str, direction: Direction) -> Crossing {
    Crossing::new(
        GraphNode::new(id * 2, format!("SRC{id}")),
        GraphEdge::new(id, edge_type, NodeId::new(id * 2), NodeId::new(id * 2 + 1), id % 2 == 0),
        GraphNode::new(id * 2 + 1, format!("DST{id}")),
        direction,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A crossing is a finding exactly when its matrix cell is set.
    #[test]
    fn prop_included_iff_flagged(
        flags in prop::collection::vec((direction(), edge_type(), any::<bool>()), 0..40),
        probes in prop::collection::vec((direction(), edge_type()), 1..40),
        workers in 1usize..8,
    ) {
        let mut matrix = PolicyMatrix::permissive();
        for (d, t, flag) in &flags {
            matrix = matrix.with_flag(*d, *t, *flag);
        }

        let crossings: Vec<Crossing> = probes
            .iter()
            .enumerate()
            .map(|(i, (d, t))| crossing(i as i64, t.as_str(), *d))
            .collect();
        let expected: usize = probes
            .iter()
            .filter(|(d, t)| matrix.direction(*d).get(*t))
            .count();

        let engine = ClassificationEngine::new(Arc::new(matrix), WorkerPool::new(workers));
        let findings = FindingsSet::new();
        let summary = runtime().block_on(engine.classify_all(crossings, &findings));

        prop_assert_eq!(findings.len(), expected);
        prop_assert_eq!(summary.dangerous, expected);
        prop_assert_eq!(summary.evaluated, probes.len());
    }

    /// Exactly K of N crossings end up in the findings set, and the report
    /// is identical, whatever the pool size.
    #[test]
    fn prop_no_lost_or_duplicate_findings(
        dangerous_mask in prop::collection::vec(any::<bool>(), 1..64),
        workers in 1usize..64,
    ) {
        let matrix = PolicyMatrix::permissive()
            .with_flag(Direction::IntoT0, EdgeType::GenericAll, true);
        let crossings: Vec<Crossing> = dangerous_mask
            .iter()
            .enumerate()
            .map(|(i, dangerous)| {
                let t = if *dangerous { "GenericAll" } else { "MemberOf" };
                crossing(i as i64, t, Direction::IntoT0)
            })
            .collect();
        let k = dangerous_mask.iter().filter(|d| **d).count();
        let workers = workers.min(dangerous_mask.len());

        let rt = runtime();
        let engine = ClassificationEngine::new(Arc::new(matrix.clone()), WorkerPool::new(workers));
        let serial = ClassificationEngine::new(Arc::new(matrix), WorkerPool::new(1));

        let parallel_findings = FindingsSet::new();
        rt.block_on(engine.classify_all(crossings.clone(), &parallel_findings));
        let serial_findings = FindingsSet::new();
        rt.block_on(serial.classify_all(crossings, &serial_findings));

        prop_assert_eq!(parallel_findings.len(), k);
        prop_assert_eq!(
            Report::from_findings(&parallel_findings),
            Report::from_findings(&serial_findings)
        );
    }

    /// Edge types outside the vocabulary are never findings.
    #[test]
    fn prop_unknown_types_never_included(
        name in "[A-Za-z]{4,16}",
        d in direction(),
    ) {
        prop_assume!(EdgeType::parse(&name).is_none());
        let mut matrix = PolicyMatrix::permissive();
        for t in EdgeType::ALL {
            matrix = matrix.with_flag(d, t, true);
        }

        let engine = ClassificationEngine::new(Arc::new(matrix), WorkerPool::new(2));
        let findings = FindingsSet::new();
        let summary = runtime().block_on(engine.classify_all(vec![crossing(1, &name, d)], &findings));

        prop_assert!(findings.is_empty());
        prop_assert_eq!(summary.unlisted.get(&name), Some(&1));
    }
}
