//! `@C`: congruence of the node with the other members of its interplay
//! subgraph.
//!
//! `C = c_scale · c_sem · c_fusion` over the members of `G`:
//!
//! - `c_scale`: 1.0 when all output ranges are identical, 0.8 when they all
//!   lie within `[0,1]`, 0 otherwise
//! - `c_sem`: Jaccard index of the members' semantic tags (0 when nobody has
//!   tags)
//! - `c_fusion`: 1.0 for a declared fusion rule whose target every member
//!   produces, 0.5 when some member does not produce it, 0 when no rule is
//!   declared
//!
//! A single-member subgraph is trivially congruent.

use std::collections::BTreeSet;

use mcal_core::{FusionRule, InterplaySubgraph, LayerId, LayerScore};

use super::{
    penalize, recover_missing, EvaluationInput, LayerEvaluator, LayerOutcome,
    MISSING_INTERPLAY_EVIDENCE,
};
use crate::error::EvaluationError;
use crate::evidence::InterplayProfile;

#[derive(Debug, Clone, Copy, Default)]
pub struct CongruenceEvaluator;

impl LayerEvaluator for CongruenceEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::Congruence
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<LayerOutcome, EvaluationError> {
        let subject = input.subject;
        let Some(interplay) = subject.interplay.filter(|g| g.contains(subject.node)) else {
            return Ok(LayerOutcome::scored(LayerScore::continuous(
                LayerId::Congruence,
                1.0,
                "not part of an interplay subgraph",
            )?));
        };
        interplay.validate_within(subject.graph)?;

        let mut profiles = Vec::with_capacity(interplay.members.len());
        for &member in &interplay.members {
            let method = &subject.graph.node(member)?.method_id;
            let lookup = input.evidence.interplay_profile(method, input.cancel);
            match recover_missing(LayerId::Congruence, lookup)? {
                Some(profile) => profiles.push(profile),
                None => {
                    return penalize(
                        input,
                        LayerId::Congruence,
                        MISSING_INTERPLAY_EVIDENCE,
                        format_args!(
                            "no interplay profile for member '{method}' of '{}'",
                            interplay.target_output
                        ),
                    );
                }
            }
        }

        if profiles.len() < 2 {
            return Ok(LayerOutcome::scored(LayerScore::continuous(
                LayerId::Congruence,
                1.0,
                format!("sole member of interplay '{}'", interplay.target_output),
            )?));
        }

        let c_scale = scale_congruence(&profiles);
        let c_sem = semantic_congruence(&profiles);
        let c_fusion = fusion_validity(input, interplay)?;
        let score = (c_scale * c_sem * c_fusion).clamp(0.0, 1.0);

        tracing::debug!(
            target_output = %interplay.target_output,
            c_scale,
            c_sem,
            c_fusion,
            "congruence computed"
        );
        let rationale = format!(
            "interplay '{}' with {} members: scale {c_scale}, semantic {c_sem:.3}, \
             fusion {c_fusion}",
            interplay.target_output,
            profiles.len()
        );
        Ok(LayerOutcome::scored(LayerScore::continuous(
            LayerId::Congruence,
            score,
            rationale,
        )?))
    }
}

fn scale_congruence(profiles: &[InterplayProfile]) -> f64 {
    let first = profiles[0].output_range;
    if profiles.iter().all(|p| p.output_range == first) {
        return 1.0;
    }
    let unit = |(lo, hi): (f64, f64)| 0.0 <= lo && lo <= hi && hi <= 1.0;
    if profiles.iter().all(|p| unit(p.output_range)) {
        0.8
    } else {
        0.0
    }
}

fn semantic_congruence(profiles: &[InterplayProfile]) -> f64 {
    let union: BTreeSet<&String> = profiles.iter().flat_map(|p| &p.semantic_tags).collect();
    if union.is_empty() {
        return 0.0;
    }
    let intersection = union
        .iter()
        .filter(|tag| profiles.iter().all(|p| p.semantic_tags.contains(**tag)))
        .count();
    intersection as f64 / union.len() as f64
}

fn fusion_validity(
    input: &EvaluationInput<'_>,
    interplay: &InterplaySubgraph,
) -> Result<f64, EvaluationError> {
    if interplay.fusion_rule == FusionRule::Undeclared {
        return Ok(0.0);
    }
    let graph = input.subject.graph;
    let mut all_produce = true;
    for &member in &interplay.members {
        let produces = graph
            .node(member)?
            .signature
            .as_ref()
            .is_some_and(|s| s.produces(&interplay.target_output));
        all_produce &= produces;
    }
    Ok(if all_produce { 1.0 } else { 0.5 })
}
