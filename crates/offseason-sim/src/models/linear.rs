// Linear regressor: `w . x + b`.
//
//   { "model_type": "linear", "coefficients": [0.91, -0.002], "intercept": 0.05 }

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct LinearJson {
    #[serde(alias = "weights")]
    coefficients: Vec<f64>,
    #[serde(alias = "bias")]
    intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        LinearModel {
            coefficients,
            intercept,
        }
    }

    pub(crate) fn from_parsed(model: LinearJson) -> Result<Self, String> {
        if model.coefficients.is_empty() {
            return Err("linear model has no coefficients".into());
        }
        if !model
            .coefficients
            .iter()
            .chain(std::iter::once(&model.intercept))
            .all(|v| v.is_finite())
        {
            return Err("linear model has non-finite parameters".into());
        }
        Ok(Self::new(model.coefficients, model.intercept))
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Missing trailing features count as zero.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_plus_bias() {
        let m = LinearModel::new(vec![2.0, -0.5], 1.0);
        assert!((m.predict(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(m.n_features(), 2);
    }

    #[test]
    fn accepts_weight_aliases() {
        let json = r#"{"weights": [1.0], "bias": 0.5}"#;
        let m = LinearModel::from_parsed(serde_json::from_str(json).unwrap()).unwrap();
        assert!((m.predict(&[2.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty() {
        let json = r#"{"coefficients": [], "intercept": 0.0}"#;
        assert!(LinearModel::from_parsed(serde_json::from_str(json).unwrap()).is_err());
    }
}
