//! End-to-end calibration against the shipped configuration.
//!
//! Each test builds a small computation graph, registers evidence in an
//! [`InMemoryEvidence`] provider and runs the orchestrator the way a caller
//! would.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use mcal_config::{ConfigPaths, ConfigValidationError, QualityBand};
use mcal_core::{
    ComputationGraph, ContextBand, ContextTuple, DataEdge, FusionRule, InterplaySubgraph, LayerId,
    MethodNode, NodeId, NodeSignature, Role,
};
use mcal_engine::{
    enforce, required_layers, role_table, BaseEvidence, CalibrationEnforcementError,
    CalibrationOrchestrator, CalibrationRequest, CalibrationSubject, CancellationToken,
    ContextAxis, EngineError, EngineState, EvaluatorSet, FixedClock, GovernanceEvidence,
    InMemoryEvidence, InterplayProfile,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn shipped_config() -> ConfigPaths {
    let dir: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
    ConfigPaths::in_dir(dir)
}

fn ready(evidence: InMemoryEvidence) -> CalibrationOrchestrator {
    let orchestrator = CalibrationOrchestrator::new(Arc::new(evidence))
        .with_clock(Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())));
    orchestrator.load(&shipped_config()).unwrap();
    orchestrator
}

fn perfect_base() -> BaseEvidence {
    BaseEvidence {
        theory: 1.0,
        implementation: 1.0,
        deployment: 1.0,
    }
}

fn full_governance() -> GovernanceEvidence {
    GovernanceEvidence {
        formula_exported: true,
        full_trace: true,
        logs_conform: true,
        version_tagged: true,
        config_hash_matches: true,
        signature_valid: true,
        runtime_s: Some(0.2),
    }
}

fn signature(required: &[&str], outputs: &[&str]) -> NodeSignature {
    NodeSignature {
        required_inputs: required.iter().map(|s| s.to_string()).collect(),
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
        ..NodeSignature::default()
    }
}

fn context() -> ContextTuple {
    ContextTuple::new(Some("Q1".into()), "D1", "P1", 0.9).unwrap()
}

/// `loader -> scorer -> fuse`, with the scorer pair fused into `score`.
struct Pipeline {
    graph: ComputationGraph,
    loader: NodeId,
    scorer: NodeId,
    fuse: NodeId,
}

fn pipeline() -> Pipeline {
    let mut graph = ComputationGraph::new();
    let loader = graph.add_node(MethodNode::new("loader", signature(&[], &["doc"])));
    let scorer = graph.add_node(MethodNode::new("scorer", signature(&["doc"], &["score"])));
    let fuse = graph.add_node(MethodNode::new("fuse", signature(&["score"], &[])));
    graph.add_edge(loader, scorer, DataEdge::new("doc")).unwrap();
    graph.add_edge(scorer, fuse, DataEdge::new("score")).unwrap();
    Pipeline {
        graph,
        loader,
        scorer,
        fuse,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn shipped_configuration_is_accepted() {
    let orchestrator = CalibrationOrchestrator::new(Arc::new(InMemoryEvidence::new()));
    assert_eq!(orchestrator.state(), EngineState::Uninitialized);

    let store = orchestrator.load(&shipped_config()).unwrap();
    assert_eq!(orchestrator.state(), EngineState::Ready);
    assert!((store.aggregation().total_weight() - 1.0).abs() < 1e-6);
    assert_eq!(store.aggregation().interactions().len(), 4);
}

#[test]
fn meta_tool_without_chain_evaluator_is_incomplete() {
    let mut evidence = InMemoryEvidence::new();
    evidence.with_base("loader", perfect_base());
    let orchestrator =
        ready(evidence).with_evaluators(EvaluatorSet::standard().without(LayerId::Chain));

    let p = pipeline();
    let subject = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    let err = orchestrator.calibrate(&subject, Role::MetaTool).unwrap_err();
    assert_eq!(
        err,
        EngineError::CompletenessViolation {
            method: "loader".into(),
            role: Role::MetaTool,
            missing: [LayerId::Chain].into_iter().collect(),
        }
    );
}

#[test]
fn perfect_meta_tool_scores_its_weighted_sum() {
    let mut evidence = InMemoryEvidence::new();
    evidence
        .with_base("loader", perfect_base())
        .with_governance("loader", full_governance());
    let orchestrator = ready(evidence);

    let p = pipeline();
    let subject = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    let result = orchestrator.calibrate(&subject, Role::MetaTool).unwrap();

    for layer in [LayerId::Base, LayerId::Chain, LayerId::Meta] {
        assert!((result.layer_score(layer).unwrap() - 1.0).abs() < 1e-12, "{layer}");
    }
    assert!(result.breakdown.interactions.is_empty());

    let (b, chain, m) = (0.122951, 0.065574, 0.034426);
    let expected = (b * 1.0 + chain * 1.0 + m * 1.0) / (b + chain + m);
    assert!((result.final_score - expected).abs() < 1e-12);
    assert!((result.final_score - 1.0).abs() < 1e-12);
    assert_eq!(result.quality, Some(QualityBand::Excellent));
    assert!(result.penalties.is_empty());
}

#[test]
fn missing_base_evidence_is_penalized_not_fatal() {
    let mut evidence = InMemoryEvidence::new();
    evidence.with_governance("X", full_governance());
    let orchestrator = ready(evidence);

    let mut graph = ComputationGraph::new();
    let node = graph.add_node(MethodNode::new("X", NodeSignature::default()));
    let subject = CalibrationSubject::new("X", node, &graph, context());
    let result = orchestrator.calibrate(&subject, Role::Transform).unwrap();

    let base = &result.layer_scores[&LayerId::Base];
    assert!((base.score() - 0.1).abs() < 1e-12);
    assert!(base.rationale.contains("uncalibrated"));
    assert_eq!(result.penalties.len(), 1);
    assert_eq!(result.penalties[0].key, "uncalibrated_method");
    assert!(result.penalties[0].configured);
}

#[test]
fn unnormalized_configuration_keeps_engine_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let shipped = shipped_config();
    let paths = ConfigPaths::in_dir(dir.path());
    let weights = fs::read_to_string(&shipped.weights)
        .unwrap()
        .replace("\"value\": 0.15", "\"value\": 0.10");
    fs::write(&paths.weights, weights).unwrap();
    fs::copy(&shipped.penalties, &paths.penalties).unwrap();
    fs::copy(&shipped.thresholds, &paths.thresholds).unwrap();

    let orchestrator = CalibrationOrchestrator::new(Arc::new(InMemoryEvidence::new()));
    match orchestrator.load(&paths) {
        Err(ConfigValidationError::Normalization { sum, .. }) => {
            assert!((sum - 0.95).abs() < 1e-6);
        }
        other => panic!("expected normalization error, got {other:?}"),
    }
    assert_eq!(orchestrator.state(), EngineState::Uninitialized);

    let p = pipeline();
    let subject = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    assert_eq!(
        orchestrator.calibrate(&subject, Role::MetaTool).unwrap_err(),
        EngineError::NotReady
    );
}

// ---------------------------------------------------------------------------
// Properties of results
// ---------------------------------------------------------------------------

#[test]
fn repeated_calls_are_identical() {
    let mut evidence = InMemoryEvidence::new();
    evidence
        .with_base(
            "scorer",
            BaseEvidence {
                theory: 0.7,
                implementation: 0.6,
                deployment: 0.4,
            },
        )
        .with_governance("scorer", GovernanceEvidence::default())
        .with_table(
            "scorer",
            ContextAxis::Question,
            [("Q1".to_string(), ContextBand::Primary)],
        );
    let orchestrator = ready(evidence);

    let p = pipeline();
    let subject = CalibrationSubject::new("scorer", p.scorer, &p.graph, context());
    let first = orchestrator.calibrate(&subject, Role::Executor).unwrap();
    let second = orchestrator.calibrate(&subject, Role::Executor).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.input_hash, second.input_hash);
    assert_eq!(first.evaluated_layers(), required_layers(Role::Executor));
}

#[test]
fn different_evidence_gives_different_scores() {
    let mut evidence = InMemoryEvidence::new();
    evidence
        .with_base("loader", perfect_base())
        .with_base(
            "scorer",
            BaseEvidence {
                theory: 0.2,
                implementation: 0.3,
                deployment: 0.1,
            },
        );
    let orchestrator = ready(evidence);

    let p = pipeline();
    let strong = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    let weak = CalibrationSubject::new("scorer", p.scorer, &p.graph, context());
    let strong = orchestrator.calibrate(&strong, Role::Transform).unwrap();
    let weak = orchestrator.calibrate(&weak, Role::Transform).unwrap();
    assert!(strong.final_score > weak.final_score);
    assert_ne!(strong.input_hash, weak.input_hash);
    assert_eq!(strong.graph_hash, weak.graph_hash);
}

#[test]
fn congruence_uses_interplay_profiles() {
    let mut graph = ComputationGraph::new();
    let a = graph.add_node(MethodNode::new("a", signature(&[], &["score"])));
    let b = graph.add_node(MethodNode::new("b", signature(&[], &["score"])));
    let interplay = InterplaySubgraph::new([a, b], "score", FusionRule::WeightedAverage);

    let profile = InterplayProfile {
        output_range: (0.0, 1.0),
        semantic_tags: ["risk".to_string()].into_iter().collect(),
    };
    let mut evidence = InMemoryEvidence::new();
    evidence
        .with_base("a", perfect_base())
        .with_interplay("a", profile.clone())
        .with_interplay("b", profile);
    let orchestrator = ready(evidence);

    let subject = CalibrationSubject::new("a", a, &graph, context()).with_interplay(&interplay);
    let result = orchestrator.calibrate(&subject, Role::Report).unwrap();
    assert!((result.layer_score(LayerId::Congruence).unwrap() - 1.0).abs() < 1e-12);
    assert!(result
        .breakdown
        .interactions
        .iter()
        .any(|term| term.key == "chain_C"));
}

#[test]
fn interplay_outside_graph_is_rejected() {
    let mut evidence = InMemoryEvidence::new();
    evidence.register("loader");
    let orchestrator = ready(evidence);

    let p = pipeline();
    let interplay = InterplaySubgraph::new([p.loader, NodeId(42)], "score", FusionRule::Max);
    let subject =
        CalibrationSubject::new("loader", p.loader, &p.graph, context()).with_interplay(&interplay);
    assert!(matches!(
        orchestrator.calibrate(&subject, Role::Report),
        Err(EngineError::Graph(_))
    ));
}

#[test]
fn batch_results_follow_request_order() {
    let mut evidence = InMemoryEvidence::new();
    evidence.register("loader").register("scorer");
    let orchestrator = ready(evidence);

    let p = pipeline();
    let requests = vec![
        CalibrationRequest {
            subject: CalibrationSubject::new("scorer", p.scorer, &p.graph, context()),
            role: Role::Extract,
        },
        CalibrationRequest {
            subject: CalibrationSubject::new("fuse", p.fuse, &p.graph, context()),
            role: Role::Aggregate,
        },
        CalibrationRequest {
            subject: CalibrationSubject::new("loader", p.loader, &p.graph, context()),
            role: Role::Ingest,
        },
    ];
    let results = orchestrator.calibrate_batch(&requests, &CancellationToken::new());

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().method_id.as_str(), "scorer");
    assert!(matches!(results[1], Err(EngineError::UnknownMethod { .. })));
    assert_eq!(results[2].as_ref().unwrap().method_id.as_str(), "loader");
}

#[test]
fn cancelled_batch_yields_only_cancellations() {
    let mut evidence = InMemoryEvidence::new();
    evidence.register("loader");
    let orchestrator = ready(evidence);

    let p = pipeline();
    let requests = vec![CalibrationRequest {
        subject: CalibrationSubject::new("loader", p.loader, &p.graph, context()),
        role: Role::Ingest,
    }];
    let cancel = CancellationToken::new();
    cancel.cancel();
    let results = orchestrator.calibrate_batch(&requests, &cancel);
    assert_eq!(results, vec![Err(EngineError::Cancelled)]);
}

#[test]
fn reload_leaves_in_flight_snapshot_untouched() {
    let mut evidence = InMemoryEvidence::new();
    evidence.with_base("loader", perfect_base());
    let orchestrator = ready(evidence);
    let before = orchestrator.config().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let shipped = shipped_config();
    let paths = ConfigPaths::in_dir(dir.path());
    fs::copy(&shipped.weights, &paths.weights).unwrap();
    fs::write(&paths.penalties, r#"{"uncalibrated_method": 0.2}"#).unwrap();
    fs::copy(&shipped.thresholds, &paths.thresholds).unwrap();
    let after = orchestrator.load(&paths).unwrap();

    assert_ne!(before.config_hash(), after.config_hash());
    assert_eq!(before.get_penalty("uncalibrated_method"), Some(0.1));
    assert_eq!(after.get_penalty("uncalibrated_method"), Some(0.2));

    let p = pipeline();
    let subject = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    let result = orchestrator.calibrate(&subject, Role::Transform).unwrap();
    assert_eq!(result.config_hash, after.config_hash());
}

// ---------------------------------------------------------------------------
// Enforcement
// ---------------------------------------------------------------------------

#[test]
fn enforcement_wraps_calls() {
    let mut evidence = InMemoryEvidence::new();
    evidence
        .with_base("loader", perfect_base())
        .with_governance("loader", full_governance())
        .register("scorer");
    let orchestrator = ready(evidence);
    let p = pipeline();

    let load = enforce(0.8, Role::Transform, true).wrap(&orchestrator, |path: String| path.len());

    let good = CalibrationSubject::new("loader", p.loader, &p.graph, context());
    let guarded = load(&good, "corpus.txt".to_string()).unwrap();
    assert_eq!(guarded.value, 10);
    assert!(guarded.calibration.unwrap().passes(0.8));

    let poor = CalibrationSubject::new("scorer", p.scorer, &p.graph, context());
    assert!(matches!(
        load(&poor, "corpus.txt".to_string()),
        Err(CalibrationEnforcementError::BelowThreshold { .. })
    ));
}

#[test]
fn role_table_shape() {
    let table: Vec<BTreeMap<&str, serde_json::Value>> = role_table()
        .iter()
        .map(|profile| {
            let layers: Vec<&str> = profile.required.iter().map(LayerId::as_str).collect();
            BTreeMap::from([
                ("role", serde_json::json!(profile.role.as_str())),
                ("required", serde_json::json!(layers)),
                ("unit", serde_json::json!(profile.unit_transform.as_str())),
            ])
        })
        .collect();

    insta::assert_json_snapshot!(table, @r#"
    [
      {
        "required": [
          "b",
          "chain",
          "u",
          "q",
          "d",
          "p",
          "C",
          "m"
        ],
        "role": "EXECUTOR",
        "unit": "saturating_exponential"
      },
      {
        "required": [
          "b",
          "chain",
          "u",
          "q",
          "d",
          "p",
          "C",
          "m"
        ],
        "role": "ANALYZER",
        "unit": "saturating_exponential"
      },
      {
        "required": [
          "b",
          "chain",
          "d",
          "p",
          "C",
          "m"
        ],
        "role": "AGGREGATE",
        "unit": "insensitive"
      },
      {
        "required": [
          "b",
          "chain",
          "u",
          "m"
        ],
        "role": "INGEST",
        "unit": "identity"
      },
      {
        "required": [
          "b",
          "chain",
          "u",
          "m"
        ],
        "role": "STRUCTURE",
        "unit": "identity"
      },
      {
        "required": [
          "b",
          "chain",
          "u",
          "m"
        ],
        "role": "EXTRACT",
        "unit": "threshold_linear"
      },
      {
        "required": [
          "b",
          "chain",
          "C",
          "m"
        ],
        "role": "REPORT",
        "unit": "insensitive"
      },
      {
        "required": [
          "b",
          "chain",
          "m"
        ],
        "role": "TRANSFORM",
        "unit": "insensitive"
      },
      {
        "required": [
          "b",
          "chain",
          "m"
        ],
        "role": "META_TOOL",
        "unit": "insensitive"
      }
    ]
    "#);
}
