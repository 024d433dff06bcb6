//! The six fixed perception/action layers.
//!
//! Every agent perceives and acts through a subset of these channels. Each
//! layer carries fixed encoding parameters (phase offset, multiplier,
//! entropy weight) that shape how observations are turned into phase
//! vectors and how entropy costs are weighed during decisions.

use serde::{Deserialize, Serialize};

/// One of the six fixed perception/action channels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Raw structured input: numbers, records, measurements.
    Data,

    /// Meaning extracted from language and symbols.
    Semantic,

    /// The agent's own interaction history.
    Experiential,

    /// Embodiment and environment signals.
    Physical,

    /// Forward simulation and anticipation.
    Predictive,

    /// Signals originating from other agents.
    Communal,
}

/// Fixed encoding parameters for a layer.
///
/// These are intrinsic to the layer, not per-agent configuration: the same
/// observation encoded on the same layer always produces the same phases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    /// Constant phase offset applied to every encoded angle.
    pub offset: f64,

    /// Scale factor applied to the raw encoded angle.
    pub multiplier: f64,

    /// Weight applied to an action's entropy cost when it targets this layer.
    pub entropy_weight: f64,
}

impl Layer {
    /// All six layers in canonical order.
    pub const ALL: [Layer; 6] = [
        Layer::Data,
        Layer::Semantic,
        Layer::Experiential,
        Layer::Physical,
        Layer::Predictive,
        Layer::Communal,
    ];

    /// The fixed encoding parameters for this layer.
    pub fn params(self) -> LayerParams {
        use std::f64::consts::PI;
        match self {
            Layer::Data => LayerParams {
                offset: 0.0,
                multiplier: 1.0,
                entropy_weight: 0.8,
            },
            Layer::Semantic => LayerParams {
                offset: PI / 6.0,
                multiplier: 1.2,
                entropy_weight: 1.0,
            },
            Layer::Experiential => LayerParams {
                offset: PI / 4.0,
                multiplier: 0.9,
                entropy_weight: 1.1,
            },
            Layer::Physical => LayerParams {
                offset: PI / 3.0,
                multiplier: 1.1,
                entropy_weight: 0.7,
            },
            Layer::Predictive => LayerParams {
                offset: PI / 2.0,
                multiplier: 1.3,
                entropy_weight: 1.2,
            },
            Layer::Communal => LayerParams {
                offset: 2.0 * PI / 3.0,
                multiplier: 0.8,
                entropy_weight: 0.9,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_layers_distinct_offsets() {
        let offsets: Vec<f64> = Layer::ALL.iter().map(|l| l.params().offset).collect();
        for i in 0..offsets.len() {
            for j in (i + 1)..offsets.len() {
                assert!(
                    (offsets[i] - offsets[j]).abs() > 1e-9,
                    "layers {i} and {j} share an offset"
                );
            }
        }
    }

    #[test]
    fn test_entropy_weights_positive() {
        for layer in Layer::ALL {
            assert!(layer.params().entropy_weight > 0.0);
        }
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Layer::Experiential).unwrap();
        assert_eq!(json, "\"experiential\"");
    }
}
