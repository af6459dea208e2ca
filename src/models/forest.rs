//! Decision forest classifier stored as JSON.
//!
//! Trees use the flat array layout of scikit-learn's `tree_` attribute:
//! node `i` is a leaf when `children_left[i] == -1`, otherwise samples go
//! left when `x[feature[i]] <= threshold[i]`. Leaf `value` rows hold class
//! counts or fractions; they are normalized per tree, averaged across the
//! forest and the arg-max indexes `classes`.

use crate::error::ModelError;
use crate::models::Classifier;
use crate::types::record::FeatureColumn;
use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;

const TREE_LEAF: i64 = -1;

/// On-disk form of a single tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

/// On-disk form of the whole forest.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestArtifact {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_artifact(tree: &TreeArtifact, n_features: usize, n_classes: usize) -> Result<Self> {
        let n = tree.children_left.len();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            tree.children_right.len() == n
                && tree.feature.len() == n
                && tree.threshold.len() == n
                && tree.value.len() == n,
            "tree arrays have inconsistent lengths"
        );

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = tree.children_left[i];
            let right = tree.children_right[i];
            if left == TREE_LEAF {
                let counts = &tree.value[i];
                ensure!(
                    counts.len() == n_classes,
                    "node {} has {} class values, expected {}",
                    i,
                    counts.len(),
                    n_classes
                );
                let total: f64 = counts.iter().sum();
                ensure!(total > 0.0, "leaf {} has no class weight", i);
                nodes.push(Node::Leaf(counts.iter().map(|c| c / total).collect()));
                continue;
            }

            let child = |idx: i64| -> Result<usize> {
                // children always come after their parent in a fitted tree
                if idx <= i as i64 || idx as usize >= n {
                    bail!("node {} has invalid child index {}", i, idx);
                }
                Ok(idx as usize)
            };
            let feature = tree.feature[i];
            ensure!(
                feature >= 0 && (feature as usize) < n_features,
                "node {} splits on invalid feature {}",
                i,
                feature
            );
            nodes.push(Node::Split {
                feature: feature as usize,
                threshold: tree.threshold[i],
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(proba) => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Random-forest style classifier evaluated in process.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    name: String,
    n_features: usize,
    classes: Vec<i64>,
    trees: Vec<Tree>,
}

impl ForestClassifier {
    pub fn from_artifact(name: &str, artifact: &ForestArtifact) -> Result<Self> {
        ensure!(
            artifact.n_features == FeatureColumn::COUNT,
            "forest expects {} features, the service provides {}",
            artifact.n_features,
            FeatureColumn::COUNT
        );
        ensure!(artifact.classes.len() >= 2, "forest needs at least two classes");
        ensure!(!artifact.trees.is_empty(), "forest has no trees");

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                Tree::from_artifact(tree, artifact.n_features, artifact.classes.len())
                    .with_context(|| format!("invalid tree {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            n_features: artifact.n_features,
            classes: artifact.classes.clone(),
            trees,
        })
    }

    /// Load a forest from a JSON artifact file.
    pub fn load<P: AsRef<Path>>(path: P, name: &str) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        let artifact: ForestArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse forest artifact {}", path.display()))?;
        Self::from_artifact(name, &artifact)
            .with_context(|| format!("Invalid forest artifact {}", path.display()))
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Class probabilities averaged over all trees.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if let Some((idx, value)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::NonFinite {
                column: FeatureColumn::ALL[idx].name(),
                value: *value,
            });
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}

impl Classifier for ForestClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        let proba = self.predict_proba(features)?;

        // first maximum wins on ties
        let mut best = 0;
        for (idx, p) in proba.iter().enumerate().skip(1) {
            if *p > proba[best] {
                best = idx;
            }
        }
        Ok(self.classes[best])
    }
}
