//! Random forest classifier
//!
//! Bootstrap-aggregated CART trees split on Gini impurity. Each tree is stored
//! as a flat node array; leaves keep the class distribution of the bootstrap
//! samples that reached them, and forest probabilities are the mean of the
//! per-tree leaf distributions.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Number of candidate features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    #[default]
    Sqrt,
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
            MaxFeatures::All => n_features,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_distribution(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    /// Children must point forward so traversal always terminates
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", idx, feature));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} classes, expected {}",
                            idx,
                            distribution.len(),
                            n_classes
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Sorted class labels; probability vectors follow this order
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(rows: &[Vec<f64>], labels: &[String], params: &ForestParams) -> AppResult<Self> {
        if rows.is_empty() {
            return Err(AppError::InsufficientData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if params.n_trees == 0 {
            return Err(AppError::InvalidInput(
                "forest needs at least one tree".to_string(),
            ));
        }

        let n_features = rows[0].len();
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = rows.len();
        let trees = (0..params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut builder = TreeBuilder {
                    rows,
                    targets: &targets,
                    n_classes: classes.len(),
                    n_features,
                    params,
                    nodes: Vec::new(),
                };
                builder.grow(bootstrap, &mut rng);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Ok(Self {
            classes,
            n_features,
            trees,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean leaf distribution across trees, in `classes()` order
    pub fn predict_proba(&self, row: &[f64]) -> AppResult<Vec<f64>> {
        AppError::check_dimensions(self.n_features, row.len())?;

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.leaf_distribution(row)) {
                *total += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n_trees).collect())
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("classifier has no classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("classifier has no trees".to_string());
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features, self.classes.len()))
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    n_features: usize,
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Sample-weighted Gini impurity of the two children
    score: f64,
}

impl TreeBuilder<'_> {
    /// Returns the index of the subtree root
    fn grow(&mut self, samples: Vec<usize>, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&samples);
        let n = samples.len();

        let splittable = n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf
            && gini(&counts, n) > 0.0;

        if splittable {
            if let Some(split) = self.best_split(&samples, rng) {
                let (left, right): (Vec<usize>, Vec<usize>) = samples
                    .iter()
                    .partition(|&&i| self.rows[i][split.feature] <= split.threshold);

                let idx = self.nodes.len();
                self.nodes.push(Node::Leaf {
                    distribution: Vec::new(),
                });
                let left = self.grow(left, rng);
                let right = self.grow(right, rng);
                self.nodes[idx] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return idx;
            }
        }

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / n as f64).collect(),
        });
        idx
    }

    /// Inspects `max_features` random features, continuing past that budget
    /// only while no valid split has been found
    fn best_split(&self, samples: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let budget = self.params.max_features.resolve(self.n_features);
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= budget && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_on(samples, feature) {
                if best.as_ref().map_or(true, |b| candidate.score < b.score) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_split_on(&self, samples: &[usize], feature: usize) -> Option<SplitCandidate> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

        let n = sorted.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut left = vec![0usize; self.n_classes];
        let mut right = self.class_counts(&sorted);
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            let class = self.targets[sorted[pos]];
            left[class] += 1;
            right[class] -= 1;

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let value = self.rows[sorted[pos]][feature];
            let next = self.rows[sorted[pos + 1]][feature];
            if next <= value {
                continue;
            }

            let score =
                n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right);
            if best.as_ref().map_or(true, |b| score < b.score) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    score,
                });
            }
        }
        best
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in samples {
            counts[self.targets[i]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / n).powi(2))
        .sum::<f64>()
}
