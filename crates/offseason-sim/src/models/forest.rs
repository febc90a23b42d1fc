// Random-forest regressor loaded from an sklearn JSON export.
//
// JSON format:
//
//   {
//     "model_type": "random_forest",
//     "n_features": 2,
//     "trees": [
//       { "nodes": [
//           { "feature": 0, "threshold": 0.41, "left": 1, "right": 2, "value": null },
//           { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 0.38 },
//           { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 0.52 }
//       ] }
//     ]
//   }
//
// Traversal starts at node 0. `feature == -1` marks a leaf. Otherwise a NaN
// feature or one `<= threshold` goes left, anything else goes right. The
// forest prediction is the mean of the leaf values.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaves).
    pub feature: i32,
    pub threshold: f64,
    pub left: i32,
    pub right: i32,
    /// Leaf value (None for internal nodes).
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RandomForestJson {
    n_features: usize,
    trees: Vec<TreeJson>,
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Vec<TreeNode>>,
}

fn validate_tree(tree: usize, nodes: &[TreeNode], n_features: usize) -> Result<(), String> {
    if nodes.is_empty() {
        return Err(format!("tree {tree} has no nodes"));
    }
    for (i, node) in nodes.iter().enumerate() {
        if node.feature == -1 {
            match node.value {
                Some(v) if v.is_finite() => {}
                _ => return Err(format!("tree {tree}: leaf {i} has no finite value")),
            }
            continue;
        }
        if node.feature < 0 || node.feature as usize >= n_features {
            return Err(format!(
                "tree {tree}: node {i} has invalid feature index {}",
                node.feature
            ));
        }
        // Pre-order export: children always follow their parent.
        for child in [node.left, node.right] {
            if child <= i as i32 || child as usize >= nodes.len() {
                return Err(format!("tree {tree}: node {i} has invalid child {child}"));
            }
        }
    }
    Ok(())
}

impl RandomForest {
    pub(crate) fn from_parsed(model: RandomForestJson) -> Result<Self, String> {
        if model.n_features == 0 {
            return Err("n_features must be positive".into());
        }
        if model.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        let trees: Vec<Vec<TreeNode>> = model.trees.into_iter().map(|t| t.nodes).collect();
        for (i, nodes) in trees.iter().enumerate() {
            validate_tree(i, nodes, model.n_features)?;
        }
        Ok(RandomForest {
            n_features: model.n_features,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    fn traverse(nodes: &[TreeNode], features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &nodes[idx];
            if node.feature == -1 {
                return node.value.unwrap_or(0.0);
            }
            let x = features
                .get(node.feature as usize)
                .copied()
                .unwrap_or(f64::NAN);
            idx = if x.is_nan() || x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let sum: f64 = self
            .trees
            .iter()
            .map(|nodes| Self::traverse(nodes, features))
            .sum();
        sum / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_json() -> &'static str {
        r#"{
            "n_features": 2,
            "trees": [
                { "nodes": [
                    {"feature": 0, "threshold": 0.5, "left": 1, "right": 2, "value": null},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 1.0},
                    {"feature": 1, "threshold": 30.0, "left": 3, "right": 4, "value": null},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 2.0},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 3.0}
                ]},
                { "nodes": [
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 5.0}
                ]}
            ]
        }"#
    }

    fn forest() -> RandomForest {
        RandomForest::from_parsed(serde_json::from_str(forest_json()).unwrap()).unwrap()
    }

    #[test]
    fn mean_of_leaves() {
        let f = forest();
        assert_eq!(f.n_features(), 2);
        // left leaf (1.0) and the stump (5.0)
        assert!((f.predict(&[0.4, 20.0]) - 3.0).abs() < 1e-12);
        // right then right: 3.0 and 5.0
        assert!((f.predict(&[0.6, 31.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_and_nan_go_left() {
        let f = forest();
        assert!((f.predict(&[0.5, 99.0]) - 3.0).abs() < 1e-12);
        assert!((f.predict(&[f64::NAN, 99.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_backward_child() {
        let json = r#"{"n_features": 1, "trees": [{ "nodes": [
            {"feature": 0, "threshold": 0.5, "left": 0, "right": 1, "value": null},
            {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 1.0}
        ]}]}"#;
        let err = RandomForest::from_parsed(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(err.contains("invalid child"));
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let json = r#"{"n_features": 1, "trees": [{ "nodes": [
            {"feature": 3, "threshold": 0.5, "left": 1, "right": 2, "value": null},
            {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 1.0},
            {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 1.0}
        ]}]}"#;
        assert!(RandomForest::from_parsed(serde_json::from_str(json).unwrap()).is_err());
    }

    #[test]
    fn rejects_empty_forest() {
        let json = r#"{"n_features": 2, "trees": []}"#;
        assert!(RandomForest::from_parsed(serde_json::from_str(json).unwrap()).is_err());
    }
}
