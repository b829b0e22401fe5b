//! The eight calibration layers and their score domains.
//!
//! Every method is scored on a subset of eight orthogonal quality layers.
//! Four layers are continuous on `[0,1]` (`@b`, `@u`, `@C`, `@m`); the chain
//! layer takes one of five [`ChainBand`]s and the three contextual layers
//! (`@q`, `@d`, `@p`) take one of five [`ContextBand`]s. Bands are ordinal and
//! map onto fixed numeric values before aggregation.
//!
//! [`LayerSet`] is a small `Copy` bitset used by the static role table and by
//! the completeness check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Layer identifiers
// ---------------------------------------------------------------------------

/// Identifier of one of the eight calibration layers.
///
/// Serialized with the short names used in configuration documents
/// (`"b"`, `"chain"`, `"u"`, `"q"`, `"d"`, `"p"`, `"C"`, `"m"`). Parsing also
/// accepts the `@`-prefixed spelling (`"@chain"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerId {
    /// `@b`: intrinsic quality of the method artifact.
    Base,
    /// `@chain`: integration of the node with its data-flow neighbours.
    Chain,
    /// `@u`: sensitivity to the structural quality of the unit of analysis.
    Unit,
    /// `@q`: compatibility with the question being answered.
    Question,
    /// `@d`: compatibility with the analytical dimension.
    Dimension,
    /// `@p`: compatibility with the policy area.
    Policy,
    /// `@C`: congruence with the other members of an interplay subgraph.
    Congruence,
    /// `@m`: transparency, governance and cost disclosure.
    Meta,
}

/// The numeric domain a layer's score lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerDomain {
    Continuous,
    ChainBands,
    ContextBands,
}

impl LayerId {
    /// All eight layers in canonical order.
    pub const ALL: [LayerId; 8] = [
        LayerId::Base,
        LayerId::Chain,
        LayerId::Unit,
        LayerId::Question,
        LayerId::Dimension,
        LayerId::Policy,
        LayerId::Congruence,
        LayerId::Meta,
    ];

    /// Short configuration name of the layer.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::Base => "b",
            LayerId::Chain => "chain",
            LayerId::Unit => "u",
            LayerId::Question => "q",
            LayerId::Dimension => "d",
            LayerId::Policy => "p",
            LayerId::Congruence => "C",
            LayerId::Meta => "m",
        }
    }

    pub fn domain(self) -> LayerDomain {
        match self {
            LayerId::Chain => LayerDomain::ChainBands,
            LayerId::Question | LayerId::Dimension | LayerId::Policy => LayerDomain::ContextBands,
            LayerId::Base | LayerId::Unit | LayerId::Congruence | LayerId::Meta => {
                LayerDomain::Continuous
            }
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl FromStr for LayerId {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.strip_prefix('@').unwrap_or(raw);
        LayerId::ALL
            .into_iter()
            .find(|layer| layer.as_str() == name)
            .ok_or_else(|| CoreError::UnknownLayer {
                raw: raw.to_string(),
            })
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Layer sets
// ---------------------------------------------------------------------------

/// A set of layers, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerSet(u8);

impl LayerSet {
    pub const EMPTY: LayerSet = LayerSet(0);
    pub const ALL: LayerSet = LayerSet(0xff);

    /// Builds a set from a slice of layers. Usable in `const` tables.
    pub const fn of(layers: &[LayerId]) -> LayerSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < layers.len() {
            bits |= layers[i].bit();
            i += 1;
        }
        LayerSet(bits)
    }

    pub fn contains(self, layer: LayerId) -> bool {
        self.0 & layer.bit() != 0
    }

    pub fn insert(&mut self, layer: LayerId) {
        self.0 |= layer.bit();
    }

    pub fn is_superset(self, other: LayerSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Layers in `self` that are not in `other`.
    pub fn difference(self, other: LayerSet) -> LayerSet {
        LayerSet(self.0 & !other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the members in canonical layer order.
    pub fn iter(self) -> impl Iterator<Item = LayerId> {
        LayerId::ALL.into_iter().filter(move |l| self.contains(*l))
    }
}

impl FromIterator<LayerId> for LayerSet {
    fn from_iter<I: IntoIterator<Item = LayerId>>(iter: I) -> Self {
        let mut set = LayerSet::EMPTY;
        for layer in iter {
            set.insert(layer);
        }
        set
    }
}

impl Serialize for LayerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for LayerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let layers = Vec::<LayerId>::deserialize(deserializer)?;
        Ok(layers.into_iter().collect())
    }
}

impl fmt::Display for LayerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|l| l.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Discrete bands
// ---------------------------------------------------------------------------

/// Discrete outcome of the chain layer, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBand {
    /// A required input is missing or an edge carries an undeclared output (0.0).
    HardMismatch,
    /// A critical optional input is missing (0.3).
    MissingCritical,
    /// More than half of the plain optional inputs are missing (0.6).
    ManyOptionalMissing,
    /// Minor gaps: some optionals missing or unexpected inputs (0.8).
    MinorGaps,
    /// Every contract holds (1.0).
    Valid,
}

impl ChainBand {
    pub const ALL: [ChainBand; 5] = [
        ChainBand::HardMismatch,
        ChainBand::MissingCritical,
        ChainBand::ManyOptionalMissing,
        ChainBand::MinorGaps,
        ChainBand::Valid,
    ];

    pub fn value(self) -> f64 {
        match self {
            ChainBand::HardMismatch => 0.0,
            ChainBand::MissingCritical => 0.3,
            ChainBand::ManyOptionalMissing => 0.6,
            ChainBand::MinorGaps => 0.8,
            ChainBand::Valid => 1.0,
        }
    }

    /// Highest band whose value does not exceed `value`.
    pub fn floor(value: f64) -> ChainBand {
        floor_band(&ChainBand::ALL, value, ChainBand::value)
    }
}

/// Compatibility of a method with a question, dimension or policy area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextBand {
    /// Not usable in this context (0.0).
    Incompatible,
    /// Not validated for this context (0.1).
    Undeclared,
    /// Usable with limited effectiveness (0.3).
    Compatible,
    /// Works well, not the designed use (0.7).
    Secondary,
    /// Designed for this context (1.0).
    Primary,
}

impl ContextBand {
    pub const ALL: [ContextBand; 5] = [
        ContextBand::Incompatible,
        ContextBand::Undeclared,
        ContextBand::Compatible,
        ContextBand::Secondary,
        ContextBand::Primary,
    ];

    pub fn value(self) -> f64 {
        match self {
            ContextBand::Incompatible => 0.0,
            ContextBand::Undeclared => 0.1,
            ContextBand::Compatible => 0.3,
            ContextBand::Secondary => 0.7,
            ContextBand::Primary => 1.0,
        }
    }

    /// Highest band whose value does not exceed `value`.
    pub fn floor(value: f64) -> ContextBand {
        floor_band(&ContextBand::ALL, value, ContextBand::value)
    }
}

fn floor_band<B: Copy>(bands: &[B], value: f64, to_value: fn(B) -> f64) -> B {
    let mut chosen = bands[0];
    for &band in bands {
        if to_value(band) <= value + 1e-9 {
            chosen = band;
        }
    }
    chosen
}

// ---------------------------------------------------------------------------
// Layer scores
// ---------------------------------------------------------------------------

/// The value of a layer score, tagged with its domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LayerValue {
    Continuous(f64),
    Chain(ChainBand),
    Context(ContextBand),
}

impl LayerValue {
    /// Numeric value in `[0,1]` used by the aggregator.
    pub fn as_f64(self) -> f64 {
        match self {
            LayerValue::Continuous(v) => v,
            LayerValue::Chain(band) => band.value(),
            LayerValue::Context(band) => band.value(),
        }
    }
}

/// A single layer's score with the rationale that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerScore {
    pub layer: LayerId,
    pub value: LayerValue,
    pub rationale: String,
}

impl LayerScore {
    /// Builds a continuous score. Fails for discrete layers or values outside
    /// `[0,1]` (including NaN).
    pub fn continuous(
        layer: LayerId,
        value: f64,
        rationale: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if layer.domain() != LayerDomain::Continuous || !(0.0..=1.0).contains(&value) {
            return Err(CoreError::ScoreOutOfDomain { layer, value });
        }
        Ok(LayerScore {
            layer,
            value: LayerValue::Continuous(value),
            rationale: rationale.into(),
        })
    }

    pub fn chain(band: ChainBand, rationale: impl Into<String>) -> Self {
        LayerScore {
            layer: LayerId::Chain,
            value: LayerValue::Chain(band),
            rationale: rationale.into(),
        }
    }

    /// Builds a contextual band score. Fails unless `layer` is `@q`, `@d` or `@p`.
    pub fn context(
        layer: LayerId,
        band: ContextBand,
        rationale: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if layer.domain() != LayerDomain::ContextBands {
            return Err(CoreError::ScoreOutOfDomain {
                layer,
                value: band.value(),
            });
        }
        Ok(LayerScore {
            layer,
            value: LayerValue::Context(band),
            rationale: rationale.into(),
        })
    }

    /// Builds the score a penalty value maps to on `layer`: the value itself on
    /// continuous layers, the highest band not above it on discrete layers.
    pub fn from_penalty(
        layer: LayerId,
        penalty: f64,
        rationale: impl Into<String>,
    ) -> Result<Self, CoreError> {
        match layer.domain() {
            LayerDomain::Continuous => LayerScore::continuous(layer, penalty, rationale),
            LayerDomain::ChainBands => Ok(LayerScore::chain(ChainBand::floor(penalty), rationale)),
            LayerDomain::ContextBands => {
                LayerScore::context(layer, ContextBand::floor(penalty), rationale)
            }
        }
    }

    pub fn score(&self) -> f64 {
        self.value.as_f64()
    }
}
