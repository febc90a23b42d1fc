// Feed-forward regressor exported from a trained network in eval mode.
//
//   {
//     "model_type": "mlp",
//     "n_features": 126,
//     "layers": [
//       { "weights": [[...126...], ...512 rows], "bias": [...512...],
//         "batch_norm": { "mean": [...], "var": [...], "gamma": [...], "beta": [...], "eps": 1e-5 },
//         "activation": "relu" },
//       ...
//       { "weights": [[...128...]], "bias": [0.3] }
//     ]
//   }
//
// Each layer computes `W x + b`, then batch-norm with running statistics,
// then the activation. Dropout is the identity at inference and is not
// exported. The last layer must have a single output.

use serde::Deserialize;

fn default_eps() -> f64 {
    1e-5
}

#[derive(Debug, Deserialize)]
struct BatchNormJson {
    mean: Vec<f64>,
    var: Vec<f64>,
    gamma: Vec<f64>,
    beta: Vec<f64>,
    #[serde(default = "default_eps")]
    eps: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    #[default]
    Identity,
}

#[derive(Debug, Deserialize)]
struct LayerJson {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    batch_norm: Option<BatchNormJson>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MlpJson {
    n_features: usize,
    layers: Vec<LayerJson>,
}

/// A dense layer with batch-norm folded into a per-unit affine transform.
#[derive(Debug, Clone)]
struct Dense {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    scale: Vec<f64>,
    shift: Vec<f64>,
    activation: Activation,
}

impl Dense {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .zip(self.scale.iter().zip(&self.shift))
            .map(|((row, b), (scale, shift))| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                let z = z * scale + shift;
                match self.activation {
                    Activation::Relu => z.max(0.0),
                    Activation::Identity => z,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Mlp {
    n_features: usize,
    layers: Vec<Dense>,
}

fn fold_layer(index: usize, layer: LayerJson, n_in: usize) -> Result<Dense, String> {
    let n_out = layer.weights.len();
    if n_out == 0 {
        return Err(format!("layer {index} has no units"));
    }
    if layer.bias.len() != n_out {
        return Err(format!(
            "layer {index}: {} biases for {n_out} units",
            layer.bias.len()
        ));
    }
    if let Some(row) = layer.weights.iter().position(|r| r.len() != n_in) {
        return Err(format!(
            "layer {index}: row {row} has {} weights, expected {n_in}",
            layer.weights[row].len()
        ));
    }

    let (scale, shift) = match layer.batch_norm {
        None => (vec![1.0; n_out], vec![0.0; n_out]),
        Some(bn) => {
            if [bn.mean.len(), bn.var.len(), bn.gamma.len(), bn.beta.len()]
                .iter()
                .any(|len| *len != n_out)
            {
                return Err(format!("layer {index}: batch-norm size does not match {n_out} units"));
            }
            let mut scale = Vec::with_capacity(n_out);
            let mut shift = Vec::with_capacity(n_out);
            for u in 0..n_out {
                let denom = (bn.var[u] + bn.eps).sqrt();
                if !(denom.is_finite() && denom > 0.0) {
                    return Err(format!("layer {index}: unit {u} has non-positive variance"));
                }
                let s = bn.gamma[u] / denom;
                scale.push(s);
                shift.push(bn.beta[u] - bn.mean[u] * s);
            }
            (scale, shift)
        }
    };

    Ok(Dense {
        weights: layer.weights,
        bias: layer.bias,
        scale,
        shift,
        activation: layer.activation,
    })
}

impl Mlp {
    pub(crate) fn from_parsed(model: MlpJson) -> Result<Self, String> {
        if model.n_features == 0 {
            return Err("n_features must be positive".into());
        }
        if model.layers.is_empty() {
            return Err("network has no layers".into());
        }
        let mut n_in = model.n_features;
        let mut layers = Vec::with_capacity(model.layers.len());
        for (i, layer) in model.layers.into_iter().enumerate() {
            let dense = fold_layer(i, layer, n_in)?;
            n_in = dense.weights.len();
            layers.push(dense);
        }
        if n_in != 1 {
            return Err(format!("final layer has {n_in} outputs, expected 1"));
        }
        Ok(Mlp {
            n_features: model.n_features,
            layers,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut x = features.to_vec();
        x.resize(self.n_features, 0.0);
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        x.first().copied().unwrap_or(0.0)
    }
}
