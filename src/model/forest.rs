//! Random-forest regressor stored as flattened decision trees.
//!
//! Each tree uses the parallel-array node layout produced by common
//! tree learners: node `i` splits on `feature[i]` at `threshold[i]`, going to
//! `children_left[i]` when `x <= threshold` and `children_right[i]` otherwise.
//! Leaves have both children set to `-1` and predict `value[i]`.

use serde::Deserialize;

const LEAF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

/// Mean of independently fitted regression trees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forest {
    pub trees: Vec<RegressionTree>,
}

impl RegressionTree {
    /// Check array lengths, index ranges and that every child id is greater
    /// than its parent's, which rules out cycles.
    fn validate(&self, width: usize) -> Result<(), String> {
        let nodes = self.value.len();
        if nodes == 0 {
            return Err("tree has no nodes".into());
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != nodes)
        {
            return Err(format!("tree arrays disagree on node count {nodes}"));
        }

        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            match (left == LEAF, right == LEAF) {
                (true, true) => {
                    if !self.value[node].is_finite() {
                        return Err(format!("leaf {node} has a non-finite value"));
                    }
                }
                (false, false) => {
                    for child in [left, right] {
                        if child <= node as i64 || child >= nodes as i64 {
                            return Err(format!("node {node} has invalid child {child}"));
                        }
                    }
                    let feature = self.feature[node];
                    if feature < 0 || feature as usize >= width {
                        return Err(format!(
                            "node {node} splits on feature {feature}, model has {width}"
                        ));
                    }
                }
                _ => return Err(format!("node {node} has exactly one child")),
            }
        }
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = row[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }
}

impl Forest {
    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(width).map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        total / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on feature 0 at 25.0: 23 below, 21 above.
    fn stump(low: f64, high: f64) -> RegressionTree {
        RegressionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![25.0, -2.0, -2.0],
            value: vec![22.0, low, high],
        }
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let tree = stump(23.0, 21.0);
        assert_eq!(tree.predict(&[25.0]), 23.0);
        assert_eq!(tree.predict(&[25.1]), 21.0);
    }

    #[test]
    fn forest_averages_its_trees() {
        let forest = Forest {
            trees: vec![stump(23.0, 21.0), stump(25.0, 19.0)],
        };
        forest.validate(1).unwrap();
        assert_eq!(forest.predict(&[10.0]), 24.0);
        assert_eq!(forest.predict(&[30.0]), 20.0);
    }

    #[test]
    fn split_feature_must_exist() {
        let mut tree = stump(1.0, 2.0);
        tree.feature[0] = 3;
        assert!(tree.validate(2).unwrap_err().contains("feature 3"));
    }

    #[test]
    fn backward_child_is_rejected() {
        let mut tree = stump(1.0, 2.0);
        tree.children_left[0] = 0;
        assert!(tree.validate(1).is_err());
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let mut tree = stump(1.0, 2.0);
        tree.threshold.pop();
        assert!(tree.validate(1).is_err());
    }

    #[test]
    fn empty_forest_is_rejected() {
        assert!(Forest { trees: vec![] }.validate(1).is_err());
    }
}
