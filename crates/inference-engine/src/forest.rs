//! Random Forest (bagged CART trees)

use crate::InferenceError;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// sqrt(n_features)
    #[default]
    Sqrt,
    /// log2(n_features)
    Log2,
    /// Every feature
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let count = match self {
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::All => n_features,
        };
        count.clamp(1, n_features.max(1))
    }
}

/// Random forest hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth (None grows until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Train each tree on a bootstrap resample
    pub bootstrap: bool,
    /// RNG seed; fitting is deterministic for a given seed
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 10,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Class probabilities
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART decision tree stored as a node arena (root at index 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class probabilities for one row
    pub fn predict_proba(&self, row: &[f64]) -> Result<&[f64], InferenceError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { distribution }) => return Ok(distribution.as_slice()),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        InferenceError::InferenceFailed(format!(
                            "tree splits on feature {} but row has {}",
                            feature,
                            row.len()
                        ))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(InferenceError::InferenceFailed(format!(
                        "tree node {} does not exist",
                        idx
                    )))
                }
            }
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf (root only = 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
}

/// Grows one tree over a set of sample indices
struct TreeBuilder<'f, 'a, 'r> {
    features: ArrayView2<'f, f64>,
    targets: &'a [usize],
    n_classes: usize,
    params: &'a RandomForestParams,
    max_features: usize,
    rng: &'r mut StdRng,
    nodes: Vec<Node>,
}

impl<'f, 'a, 'r> TreeBuilder<'f, 'a, 'r> {
    fn build(mut self, samples: Vec<usize>) -> DecisionTree {
        self.grow(samples, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&samples);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.map_or(false, |max| depth >= max);

        if is_pure || depth_reached || samples.len() < self.params.min_samples_split {
            return self.push_leaf(&counts, samples.len());
        }

        let Some(split) = self.best_split(&samples, &counts) else {
            return self.push_leaf(&counts, samples.len());
        };

        let features = self.features;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| features[[s, split.feature]] <= split.threshold);

        // Reserve the slot so the parent precedes its children
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn push_leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let total = total.max(1) as f64;
        self.nodes.push(Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
        });
        self.nodes.len() - 1
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &s in samples {
            counts[self.targets[s]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini impurity split among a random feature subset
    fn best_split(&mut self, samples: &[usize], parent_counts: &[usize]) -> Option<BestSplit> {
        let n_features = self.features.ncols();
        let candidates = rand::seq::index::sample(&mut *self.rng, n_features, self.max_features);

        let total = samples.len();
        let mut best: Option<BestSplit> = None;
        let mut best_score = weighted_gini(parent_counts, total);

        let mut column: Vec<(f64, usize)> = Vec::with_capacity(total);
        for feature in candidates.iter() {
            column.clear();
            column.extend(
                samples
                    .iter()
                    .map(|&s| (self.features[[s, feature]], self.targets[s])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0; self.n_classes];
            let mut right_counts = parent_counts.to_vec();

            for i in 0..total - 1 {
                let (value, class) = column[i];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                let next = column[i + 1].0;
                if value >= next {
                    continue;
                }

                let left_n = i + 1;
                let score = weighted_gini(&left_counts, left_n)
                    + weighted_gini(&right_counts, total - left_n);
                if score < best_score - 1e-12 {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best_score = score;
                    best = Some(BestSplit { feature, threshold });
                }
            }
        }

        best
    }
}

/// Gini impurity multiplied by the node size
fn weighted_gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

/// Ensemble of decision trees with soft voting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    /// Create an unfitted forest
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    /// Hyper-parameters
    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Whether the forest has been fitted
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Number of input features seen during fitting
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fit on a feature matrix and class indices in `0..n_classes`
    pub fn fit(
        &mut self,
        features: ArrayView2<'_, f64>,
        targets: &[usize],
        n_classes: usize,
    ) -> Result<(), InferenceError> {
        let n_samples = features.nrows();
        if n_samples == 0 {
            return Err(InferenceError::TrainingFailed("no training rows".to_string()));
        }
        if targets.len() != n_samples {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", targets.len()),
            });
        }
        if features.ncols() == 0 {
            return Err(InferenceError::TrainingFailed("no feature columns".to_string()));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= n_classes) {
            return Err(InferenceError::TrainingFailed(format!(
                "target {} outside {} classes",
                bad, n_classes
            )));
        }
        if self.params.n_trees == 0 {
            return Err(InferenceError::TrainingFailed("n_trees must be positive".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let max_features = self.params.max_features.resolve(features.ncols());
        let mut trees = Vec::with_capacity(self.params.n_trees);

        for _ in 0..self.params.n_trees {
            let samples: Vec<usize> = if self.params.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let builder = TreeBuilder {
                features,
                targets,
                n_classes,
                params: &self.params,
                max_features,
                rng: &mut rng,
                nodes: Vec::new(),
            };
            trees.push(builder.build(samples));
        }

        debug!(
            "Fitted random forest: {} trees, {} features, {} classes",
            trees.len(),
            features.ncols(),
            n_classes
        );

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = features.ncols();
        Ok(())
    }

    /// Mean class probabilities across trees
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if !self.is_fitted() {
            return Err(InferenceError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", row.len()),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::InferenceFailed(
                "feature row contains non-finite values".to_string(),
            ));
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)?) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }

    /// Most probable class index (lowest index wins ties)
    pub fn predict(&self, row: &[f64]) -> Result<usize, InferenceError> {
        let proba = self.predict_proba(row)?;
        let mut best = 0;
        for (idx, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = idx;
            }
        }
        Ok(best)
    }
}
