use serde::Deserialize;

/// Ordinary linear regression: `intercept + Σ coefficient_i · x_i`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub(crate) fn validate(&self, width: usize) -> Result<(), String> {
        if self.coefficients.len() != width {
            return Err(format!(
                "linear model has {} coefficients for {width} features",
                self.coefficients.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("linear model contains a non-finite parameter".into());
        }
        Ok(())
    }

    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(coef, x)| coef * x)
                .sum::<f64>()
    }
}
