use serde::{Deserialize, Serialize};

use crate::artifacts::{decode_payload, encode_payload};
use crate::ml::{Predictor, TrainedModel};
use crate::tensor::{Tensor, TensorShape};

pub(super) const MODEL_VERSION: i64 = 1;
/// Lower bound for per-pixel standard deviation during standardization.
pub(super) const STD_FLOOR: f32 = 0.1;

/// Weights of a fitted network, serialized as the artifact payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpModel {
    pub model_version: i64,
    pub input_shape: TensorShape,
    pub classes: Vec<String>,
    pub hidden_size: usize,
    /// `hidden x input`, row-major.
    pub weights1: Vec<f32>,
    pub bias1: Vec<f32>,
    /// `classes x hidden`, row-major.
    pub weights2: Vec<f32>,
    pub bias2: Vec<f32>,
    pub feature_mean: Vec<f32>,
    pub feature_std: Vec<f32>,
}

impl MlpModel {
    pub fn input_len(&self) -> usize {
        self.input_shape.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            ));
        }
        let input = self.input_len();
        let hidden = self.hidden_size;
        let classes = self.classes.len();
        if input == 0 || hidden == 0 || classes == 0 {
            return Err("Model has an empty layer".to_string());
        }
        if self.weights1.len() != input * hidden {
            return Err("weights1 length mismatch".to_string());
        }
        if self.bias1.len() != hidden {
            return Err("bias1 length mismatch".to_string());
        }
        if self.weights2.len() != classes * hidden {
            return Err("weights2 length mismatch".to_string());
        }
        if self.bias2.len() != classes {
            return Err("bias2 length mismatch".to_string());
        }
        if self.feature_mean.len() != input {
            return Err("feature_mean length mismatch".to_string());
        }
        if self.feature_std.len() != input {
            return Err("feature_std length mismatch".to_string());
        }
        Ok(())
    }

    /// Class probabilities for one flattened input; empty on length mismatch.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.input_len() || self.classes.is_empty() {
            return Vec::new();
        }
        let mut hidden_act = vec![0.0f32; self.hidden_size];
        let mut logits = vec![0.0f32; self.classes.len()];
        let normalized = self.standardize(features);
        self.forward(&normalized, &mut hidden_act, &mut logits);
        let mut probs = vec![0.0f32; logits.len()];
        softmax_inplace(&logits, &mut probs);
        probs
    }

    pub(super) fn standardize(&self, features: &[f32]) -> Vec<f32> {
        features
            .iter()
            .zip(self.feature_mean.iter().zip(&self.feature_std))
            .map(|(&x, (&mean, &std))| (x - mean) / std.max(STD_FLOOR))
            .collect()
    }

    /// Forward pass over standardized input; fills ReLU activations and logits.
    pub(super) fn forward(&self, x_norm: &[f32], hidden_act: &mut [f32], logits: &mut [f32]) {
        let input = self.input_len();
        for (h, act) in hidden_act.iter_mut().enumerate() {
            let row = &self.weights1[h * input..(h + 1) * input];
            let sum: f32 = row.iter().zip(x_norm).map(|(w, x)| w * x).sum();
            *act = (sum + self.bias1[h]).max(0.0);
        }
        let hidden = self.hidden_size;
        for (c, logit) in logits.iter_mut().enumerate() {
            let row = &self.weights2[c * hidden..(c + 1) * hidden];
            let sum: f32 = row.iter().zip(hidden_act.iter()).map(|(w, a)| w * a).sum();
            *logit = sum + self.bias2[c];
        }
    }

    /// Rebuild from artifact bytes (plain or zipped JSON).
    pub fn from_artifact(bytes: &[u8]) -> Result<Self, String> {
        let json = decode_payload(bytes).map_err(|err| err.to_string())?;
        let model: MlpModel =
            serde_json::from_slice(&json).map_err(|err| format!("Invalid model JSON: {err}"))?;
        model.validate()?;
        Ok(model)
    }
}

impl Predictor for MlpModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, inputs: &[Tensor]) -> Vec<Vec<f32>> {
        inputs
            .iter()
            .map(|tensor| self.predict_proba(tensor.as_slice()))
            .collect()
    }

    fn input_shape(&self) -> Option<TensorShape> {
        Some(self.input_shape)
    }
}

impl TrainedModel for MlpModel {
    fn export(&self, compress: bool) -> Result<Vec<u8>, String> {
        let json = serde_json::to_vec(self).map_err(|err| err.to_string())?;
        encode_payload(&json, compress).map_err(|err| err.to_string())
    }
}

pub(super) fn softmax_inplace(raw: &[f32], out: &mut [f32]) {
    if raw.is_empty() || out.is_empty() {
        return;
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut sum = 0.0f32;
    for (o, &v) in out.iter_mut().zip(raw) {
        *o = (v - max).exp();
        sum += *o;
    }
    if sum == 0.0 || !sum.is_finite() {
        out.fill(1.0 / raw.len() as f32);
        return;
    }
    for v in out.iter_mut() {
        *v /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_model(input_shape: TensorShape) -> MlpModel {
        let input = input_shape.len();
        MlpModel {
            model_version: MODEL_VERSION,
            input_shape,
            classes: vec!["Circle".into(), "Rectangle".into()],
            hidden_size: 2,
            weights1: vec![0.0; input * 2],
            bias1: vec![0.0; 2],
            weights2: vec![0.0; 2 * 2],
            bias2: vec![0.0, 1.0],
            feature_mean: vec![0.0; input],
            feature_std: vec![1.0; input],
        }
    }

    #[test]
    fn softmax_output_sums_to_one() {
        let model = zero_model(TensorShape::grayscale(2, 2));
        let out = model.predict_proba(&[0.0; 4]);
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(out[1] > out[0]);
    }

    #[test]
    fn mismatched_input_yields_empty_distribution() {
        let model = zero_model(TensorShape::grayscale(2, 2));
        assert!(model.predict_proba(&[0.0; 3]).is_empty());
    }

    #[test]
    fn export_round_trips_compressed_and_plain() {
        let model = zero_model(TensorShape::grayscale(2, 2));
        for compress in [false, true] {
            let bytes = model.export(compress).unwrap();
            let loaded = MlpModel::from_artifact(&bytes).unwrap();
            assert_eq!(loaded.bias2, model.bias2);
            assert_eq!(loaded.input_shape, model.input_shape);
            assert_eq!(Predictor::input_shape(&loaded), Some(TensorShape::grayscale(2, 2)));
        }
    }

    #[test]
    fn validate_rejects_truncated_weights() {
        let mut model = zero_model(TensorShape::grayscale(2, 2));
        model.weights1.pop();
        assert!(model.validate().is_err());
        let bytes = serde_json::to_vec(&model).unwrap();
        assert!(MlpModel::from_artifact(&bytes).is_err());
    }
}
