// Trained-model capabilities and JSON artifact loading.
//
// The forecaster and simulator only see the two traits below. Artifacts on
// disk are sklearn/torch exports tagged by `model_type`; every one of them is
// loaded and validated at startup, and any failure is fatal.

mod forest;
mod linear;
mod mlp;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use offseason_core::catalog::StatLine;

use crate::season::{FeatureVector, FEATURE_WIDTH};

pub use forest::{RandomForest, TreeNode};
pub use linear::LinearModel;
pub use mlp::{Activation, Mlp};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Next-season value of one stat from its last-season value and the
/// player's last-season age.
pub trait StatRegressor: Send + Sync {
    fn predict(&self, last: f64, age_last: f64) -> f64;
}

/// Regular-season wins from a team's ranked feature vector.
pub trait WinPredictor: Send + Sync {
    fn predict_wins(&self, features: &FeatureVector) -> f64;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid model {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
enum ModelArtifact {
    RandomForest(forest::RandomForestJson),
    Linear(linear::LinearJson),
    Mlp(mlp::MlpJson),
}

/// Any supported trained model.
#[derive(Debug, Clone)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    Linear(LinearModel),
    Mlp(Mlp),
}

impl TrainedModel {
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ModelArtifact) -> Result<Self, String> {
        match artifact {
            ModelArtifact::RandomForest(m) => RandomForest::from_parsed(m).map(TrainedModel::RandomForest),
            ModelArtifact::Linear(m) => LinearModel::from_parsed(m).map(TrainedModel::Linear),
            ModelArtifact::Mlp(m) => Mlp::from_parsed(m).map(TrainedModel::Mlp),
        }
    }

    /// Read, parse, and validate one artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&content).map_err(|e| ModelError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_artifact(artifact).map_err(|message| ModelError::Invalid {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::RandomForest(m) => m.n_features(),
            TrainedModel::Linear(m) => m.n_features(),
            TrainedModel::Mlp(m) => m.n_features(),
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            TrainedModel::RandomForest(m) => m.predict(features),
            TrainedModel::Linear(m) => m.predict(features),
            TrainedModel::Mlp(m) => m.predict(features),
        }
    }
}

impl StatRegressor for TrainedModel {
    fn predict(&self, last: f64, age_last: f64) -> f64 {
        TrainedModel::predict(self, &[last, age_last])
    }
}

impl WinPredictor for TrainedModel {
    fn predict_wins(&self, features: &FeatureVector) -> f64 {
        TrainedModel::predict(self, features.as_slice())
    }
}

fn load_with_width(path: &Path, width: usize) -> Result<TrainedModel, ModelError> {
    let model = TrainedModel::load(path)?;
    if model.n_features() != width {
        return Err(ModelError::Invalid {
            path: path.to_path_buf(),
            message: format!("expected {width} input features, got {}", model.n_features()),
        });
    }
    Ok(model)
}

// ---------------------------------------------------------------------------
// Aging regressors
// ---------------------------------------------------------------------------

/// Counting stats projected through a per-minute regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountingStat {
    Points,
    Rebounds,
    OffensiveRebounds,
    Assists,
    Steals,
    Blocks,
    Turnovers,
}

impl CountingStat {
    pub const ALL: [CountingStat; 7] = [
        CountingStat::Points,
        CountingStat::Rebounds,
        CountingStat::OffensiveRebounds,
        CountingStat::Assists,
        CountingStat::Steals,
        CountingStat::Blocks,
        CountingStat::Turnovers,
    ];

    /// Artifact file stem under `aging/`.
    pub fn file_stem(self) -> &'static str {
        match self {
            CountingStat::Points => "pts_per_min",
            CountingStat::Rebounds => "reb_per_min",
            CountingStat::OffensiveRebounds => "oreb_per_min",
            CountingStat::Assists => "ast_per_min",
            CountingStat::Steals => "stl_per_min",
            CountingStat::Blocks => "blk_per_min",
            CountingStat::Turnovers => "tov_per_min",
        }
    }

    /// Season total from a stat line.
    pub fn total(self, line: &StatLine) -> f64 {
        match self {
            CountingStat::Points => line.points,
            CountingStat::Rebounds => line.rebounds,
            CountingStat::OffensiveRebounds => line.offensive_rebounds,
            CountingStat::Assists => line.assists,
            CountingStat::Steals => line.steals,
            CountingStat::Blocks => line.blocks,
            CountingStat::Turnovers => line.turnovers,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The eight regressors behind a player projection.
#[derive(Clone)]
pub struct AgingModels {
    /// Indexed by `CountingStat::index`; always one per stat.
    per_minute: Vec<Arc<dyn StatRegressor>>,
    threes_made: Arc<dyn StatRegressor>,
}

impl AgingModels {
    pub fn new(
        per_minute: impl Fn(CountingStat) -> Arc<dyn StatRegressor>,
        threes_made: Arc<dyn StatRegressor>,
    ) -> Self {
        AgingModels {
            per_minute: CountingStat::ALL.iter().map(|s| per_minute(*s)).collect(),
            threes_made,
        }
    }

    /// Load `aging/<stat>_per_min.json` for each counting stat and
    /// `aging/fg3m.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let aging = dir.join("aging");
        let mut per_minute: Vec<Arc<dyn StatRegressor>> = Vec::with_capacity(CountingStat::ALL.len());
        for stat in CountingStat::ALL {
            let path = aging.join(format!("{}.json", stat.file_stem()));
            per_minute.push(Arc::new(load_with_width(&path, 2)?));
        }
        let threes_made = Arc::new(load_with_width(&aging.join("fg3m.json"), 2)?);
        info!("Loaded {} aging regressors from {}", per_minute.len() + 1, aging.display());
        Ok(AgingModels {
            per_minute,
            threes_made,
        })
    }

    pub fn per_minute(&self, stat: CountingStat) -> &dyn StatRegressor {
        self.per_minute[stat.index()].as_ref()
    }

    pub fn threes_made(&self) -> &dyn StatRegressor {
        self.threes_made.as_ref()
    }
}

/// Load `win_predictor.json` from `dir`; it must take exactly
/// [`FEATURE_WIDTH`] inputs.
pub fn load_win_predictor(dir: &Path) -> Result<Arc<dyn WinPredictor>, ModelError> {
    let path = dir.join("win_predictor.json");
    let model = load_with_width(&path, FEATURE_WIDTH)?;
    info!("Loaded win predictor from {}", path.display());
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn linear_json(coefficients: &[f64], intercept: f64) -> String {
        serde_json::json!({
            "model_type": "linear",
            "coefficients": coefficients,
            "intercept": intercept,
        })
        .to_string()
    }

    fn write_aging_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("aging")).unwrap();
        for stat in CountingStat::ALL {
            fs::write(
                dir.join("aging").join(format!("{}.json", stat.file_stem())),
                linear_json(&[1.0, 0.0], 0.0),
            )
            .unwrap();
        }
        fs::write(dir.join("aging/fg3m.json"), linear_json(&[0.9, 0.0], 1.0)).unwrap();
        dir
    }

    #[test]
    fn dispatches_on_model_type() {
        let m = TrainedModel::from_json_str(&linear_json(&[2.0, 1.0], 0.5)).unwrap();
        assert!(matches!(m, TrainedModel::Linear(_)));
        assert!((StatRegressor::predict(&m, 1.0, 20.0) - 22.5).abs() < 1e-12);

        let err = TrainedModel::from_json_str(r#"{"model_type": "svm"}"#).unwrap_err();
        assert!(err.contains("JSON parse error"));
    }

    #[test]
    fn loads_full_aging_set() {
        let dir = write_aging_dir("offseason_models_full");
        let models = AgingModels::load(&dir).unwrap();
        assert!((models.per_minute(CountingStat::Blocks).predict(0.3, 30.0) - 0.3).abs() < 1e-12);
        assert!((models.threes_made().predict(100.0, 30.0) - 91.0).abs() < 1e-12);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = write_aging_dir("offseason_models_missing");
        fs::remove_file(dir.join("aging/tov_per_min.json")).unwrap();
        match AgingModels::load(&dir) {
            Err(ModelError::Io { path, .. }) => assert!(path.ends_with("tov_per_min.json")),
            Err(other) => panic!("expected Io error, got {other}"),
            Ok(_) => panic!("expected failure"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_artifact_is_fatal() {
        let dir = write_aging_dir("offseason_models_malformed");
        fs::write(dir.join("aging/fg3m.json"), "{ not json").unwrap();
        assert!(matches!(AgingModels::load(&dir), Err(ModelError::Parse { .. })));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn win_predictor_width_is_checked() {
        let dir = std::env::temp_dir().join("offseason_models_width");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("win_predictor.json"), linear_json(&[1.0; 10], 0.0)).unwrap();
        match load_win_predictor(&dir) {
            Err(ModelError::Invalid { message, .. }) => assert!(message.contains("126")),
            Err(other) => panic!("expected Invalid, got {other}"),
            Ok(_) => panic!("expected failure"),
        }

        fs::write(dir.join("win_predictor.json"), linear_json(&[0.0; 126], 41.0)).unwrap();
        let predictor = load_win_predictor(&dir).unwrap();
        assert!((predictor.predict_wins(&FeatureVector::zeros()) - 41.0).abs() < 1e-12);
        let _ = fs::remove_dir_all(&dir);
    }
}
