use common::error::Error;

use crate::traits::{AngularDistribution, OneDDistribution};

/// Constant value over `[lower, upper]`, zero elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDistribution {
    lower: f64,
    upper: f64,
    value: f64,
}

impl UniformDistribution {
    pub fn new(lower: f64, upper: f64, value: f64) -> Result<Self, Error> {
        if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
            return Err(Error::InvalidKernelParameter {
                name: "uniform upper bound",
                value: upper,
            });
        }
        if !value.is_finite() {
            return Err(Error::InvalidKernelParameter {
                name: "uniform value",
                value,
            });
        }

        Ok(Self {
            lower,
            upper,
            value,
        })
    }
}

impl OneDDistribution for UniformDistribution {
    fn evaluate(&self, x: f64) -> f64 {
        if x >= self.lower && x <= self.upper {
            self.value
        } else {
            0.0
        }
    }

    fn evaluate_pdf(&self, x: f64) -> f64 {
        if x >= self.lower && x <= self.upper {
            1.0 / (self.upper - self.lower)
        } else {
            0.0
        }
    }

    fn sample_with_random_number(&self, random_number: f64) -> f64 {
        self.lower + random_number * (self.upper - self.lower)
    }

    fn lower_bound_of_indep_var(&self) -> f64 {
        self.lower
    }

    fn upper_bound_of_indep_var(&self) -> f64 {
        self.upper
    }
}

/// Tabulated values with linear-linear interpolation, zero outside of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDistribution {
    grid: Vec<f64>,
    values: Vec<f64>,
    cdf: Vec<f64>,
    norm: f64,
}

impl TabularDistribution {
    /// # Errors
    /// Requires at least two strictly increasing grid points, one non-negative value per
    /// point, and a positive integral.
    pub fn new(grid: Vec<f64>, values: Vec<f64>) -> Result<Self, Error> {
        if grid.len() < 2 || grid.len() != values.len() {
            return Err(Error::InvalidKernelParameter {
                name: "tabular grid size",
                value: grid.len() as f64,
            });
        }
        if grid.iter().any(|x| !x.is_finite()) || grid.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidKernelParameter {
                name: "tabular grid",
                value: grid[0],
            });
        }
        if let Some(&bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(Error::InvalidKernelParameter {
                name: "tabular value",
                value: bad,
            });
        }

        let mut cdf = Vec::with_capacity(grid.len());
        cdf.push(0.0);
        for i in 1..grid.len() {
            let area = 0.5 * (values[i] + values[i - 1]) * (grid[i] - grid[i - 1]);
            cdf.push(cdf[i - 1] + area);
        }

        let norm = cdf[cdf.len() - 1];
        if !(norm > 0.0) {
            return Err(Error::InvalidKernelParameter {
                name: "tabular integral",
                value: norm,
            });
        }

        for c in cdf.iter_mut() {
            *c /= norm;
        }

        Ok(Self {
            grid,
            values,
            cdf,
            norm,
        })
    }

    fn bin_of(&self, x: f64) -> usize {
        self.grid
            .partition_point(|g| *g <= x)
            .saturating_sub(1)
            .min(self.grid.len() - 2)
    }
}

impl OneDDistribution for TabularDistribution {
    fn evaluate(&self, x: f64) -> f64 {
        let (Some(&lo), Some(&hi)) = (self.grid.first(), self.grid.last()) else {
            return 0.0;
        };
        if x < lo || x > hi {
            return 0.0;
        }

        let i = self.bin_of(x);
        let slope = (self.values[i + 1] - self.values[i]) / (self.grid[i + 1] - self.grid[i]);

        self.values[i] + slope * (x - self.grid[i])
    }

    fn evaluate_pdf(&self, x: f64) -> f64 {
        self.evaluate(x) / self.norm
    }

    fn sample_with_random_number(&self, random_number: f64) -> f64 {
        let i = self
            .cdf
            .partition_point(|c| *c <= random_number)
            .saturating_sub(1)
            .min(self.grid.len() - 2);

        let pdf_lo = self.values[i] / self.norm;
        let pdf_hi = self.values[i + 1] / self.norm;
        let width = self.grid[i + 1] - self.grid[i];
        let slope = (pdf_hi - pdf_lo) / width;
        let remaining = random_number - self.cdf[i];

        let offset = if slope == 0.0 {
            if pdf_lo > 0.0 { remaining / pdf_lo } else { 0.0 }
        } else {
            let discriminant = (pdf_lo * pdf_lo + 2.0 * slope * remaining).max(0.0);
            (discriminant.sqrt() - pdf_lo) / slope
        };

        (self.grid[i] + offset.clamp(0.0, width)).min(self.grid[i + 1])
    }

    fn lower_bound_of_indep_var(&self) -> f64 {
        self.grid[0]
    }

    fn upper_bound_of_indep_var(&self) -> f64 {
        self.grid[self.grid.len() - 1]
    }
}

/// Isotropic scattering: `p(mu) = 1/2` on `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsotropicAngularDistribution;

impl AngularDistribution for IsotropicAngularDistribution {
    fn evaluate_pdf(&self, _incoming_energy: f64, angle_cosine: f64) -> f64 {
        if (-1.0..=1.0).contains(&angle_cosine) {
            0.5
        } else {
            0.0
        }
    }
}

/// `p(mu) = (1 + 3 mu_bar mu) / 2`, non-negative for `|mu_bar| <= 1/3`.
#[derive(Debug, Clone, Copy)]
pub struct LinearlyAnisotropicAngularDistribution {
    mean_cosine: f64,
}

impl LinearlyAnisotropicAngularDistribution {
    pub fn new(mean_cosine: f64) -> Result<Self, Error> {
        if !(mean_cosine.abs() <= 1.0 / 3.0) {
            return Err(Error::InvalidKernelParameter {
                name: "mean_cosine",
                value: mean_cosine,
            });
        }

        Ok(Self { mean_cosine })
    }

    pub fn mean_cosine(&self) -> f64 {
        self.mean_cosine
    }
}

impl AngularDistribution for LinearlyAnisotropicAngularDistribution {
    fn evaluate_pdf(&self, _incoming_energy: f64, angle_cosine: f64) -> f64 {
        if (-1.0..=1.0).contains(&angle_cosine) {
            0.5 * (1.0 + 3.0 * self.mean_cosine * angle_cosine)
        } else {
            0.0
        }
    }
}
