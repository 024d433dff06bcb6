//! Perception: phase encoding, attention, and entropy estimation.

use super::EPSILON;
use sk_protocol::layer::Layer;
use sk_protocol::runtime_models::{LayerPercept, Percept};
use std::collections::HashMap;
use std::f64::consts::TAU;

/// Encode an observation onto one layer.
///
/// Each byte maps to an angle in [0, 2π) which is then offset and scaled by
/// the layer's fixed parameters. Basis elements are touched cyclically, one
/// per byte, so short observations leave part of the basis untouched.
pub fn encode_layer(observation: &str, layer: Layer, basis: &[u64]) -> LayerPercept {
    let params = layer.params();
    let bytes = observation.as_bytes();

    let mut phases = Vec::with_capacity(bytes.len());
    let mut touched = Vec::new();
    for (i, &byte) in bytes.iter().enumerate() {
        let raw = byte as f64 / 255.0 * TAU;
        let phase = (params.offset + params.multiplier * raw).rem_euclid(TAU);
        phases.push(phase);
        if !basis.is_empty() {
            let element = basis[i % basis.len()];
            if !touched.contains(&element) {
                touched.push(element);
            }
        }
    }

    let magnitude = if phases.is_empty() {
        0.0
    } else {
        phases.iter().map(|p| p.sin().abs()).sum::<f64>() / phases.len() as f64
    };

    LayerPercept {
        layer,
        phases,
        basis: touched,
        magnitude,
    }
}

/// Build a full percept over the configured input layers and pick the
/// dominant layer: the one maximizing `attention[layer] * magnitude`.
pub fn perceive(
    observation: &str,
    input_layers: &[Layer],
    attention: &HashMap<Layer, f64>,
    basis: &[u64],
) -> Percept {
    let layers: Vec<LayerPercept> = input_layers
        .iter()
        .map(|&layer| encode_layer(observation, layer, basis))
        .collect();

    let dominant = layers
        .iter()
        .max_by(|a, b| {
            let score_a = attention.get(&a.layer).copied().unwrap_or(0.0) * a.magnitude;
            let score_b = attention.get(&b.layer).copied().unwrap_or(0.0) * b.magnitude;
            score_a.total_cmp(&score_b)
        })
        .map(|lp| lp.layer)
        .unwrap_or(Layer::Data);

    Percept { layers, dominant }
}

/// Initial attention weights for a fresh session: uniform over the input
/// layers with the configured attention span boosted, then normalized.
pub fn initial_attention(input_layers: &[Layer], attention_span: Layer) -> HashMap<Layer, f64> {
    let mut attention: HashMap<Layer, f64> = input_layers
        .iter()
        .map(|&layer| {
            let weight = if layer == attention_span { 1.5 } else { 1.0 };
            (layer, weight)
        })
        .collect();
    renormalize(&mut attention);
    attention
}

/// Attention update after a perception: layers active this step ×1.1,
/// inactive ×0.9, then renormalized to sum 1.
pub fn update_attention(attention: &mut HashMap<Layer, f64>, active: &[Layer]) {
    for (layer, weight) in attention.iter_mut() {
        if active.contains(layer) {
            *weight *= 1.1;
        } else {
            *weight *= 0.9;
        }
    }
    renormalize(attention);
}

fn renormalize(attention: &mut HashMap<Layer, f64>) {
    let total: f64 = attention.values().sum();
    if total < EPSILON {
        let uniform = 1.0 / attention.len().max(1) as f64;
        for weight in attention.values_mut() {
            *weight = uniform;
        }
        return;
    }
    for weight in attention.values_mut() {
        *weight /= total;
    }
}

/// Shannon entropy of the normalized `|sin(phase)| + ε` magnitudes.
pub fn phase_entropy(phases: &[f64]) -> f64 {
    if phases.is_empty() {
        return 0.0;
    }
    let magnitudes: Vec<f64> = phases.iter().map(|p| p.sin().abs() + EPSILON).collect();
    let total: f64 = magnitudes.iter().sum();
    magnitudes
        .iter()
        .map(|m| {
            let p = m / total;
            -p * p.ln()
        })
        .sum()
}
