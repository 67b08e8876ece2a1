use crate::numeric_kernel::{
    calculate_figure_of_merit, calculate_mean, calculate_relative_error, calculate_relative_vov,
};

/// The four raw power sums of the per-history contributions to one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentAccumulator {
    first: f64,
    second: f64,
    third: f64,
    fourth: f64,
}

impl MomentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an accumulator from previously collected power sums.
    pub fn from_raw(first: f64, second: f64, third: f64, fourth: f64) -> Self {
        Self {
            first,
            second,
            third,
            fourth,
        }
    }

    /// Folds one history's total contribution into the moments.
    ///
    /// Must be called at most once per history and bin.
    #[inline]
    pub fn add(&mut self, contribution: f64) {
        let c2 = contribution * contribution;
        let c3 = c2 * contribution;
        let c4 = c3 * contribution;

        self.first += contribution;
        self.second += c2;
        self.third += c3;
        self.fourth += c4;
    }

    /// Element-wise sum with a replica's moments.
    pub fn merge(&mut self, other: &MomentAccumulator) {
        self.first += other.first;
        self.second += other.second;
        self.third += other.third;
        self.fourth += other.fourth;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn first(&self) -> f64 {
        self.first
    }

    pub fn second(&self) -> f64 {
        self.second
    }

    pub fn third(&self) -> f64 {
        self.third
    }

    pub fn fourth(&self) -> f64 {
        self.fourth
    }

    pub fn is_zero(&self) -> bool {
        self.first == 0.0 && self.second == 0.0 && self.third == 0.0 && self.fourth == 0.0
    }

    pub fn mean(&self, num_histories: u64) -> f64 {
        calculate_mean(self.first, num_histories)
    }

    pub fn relative_error(&self, num_histories: u64) -> f64 {
        calculate_relative_error(self.first, self.second, num_histories)
    }

    pub fn variance_of_variance(&self, num_histories: u64) -> f64 {
        calculate_relative_vov(
            self.first,
            self.second,
            self.third,
            self.fourth,
            num_histories,
        )
    }

    pub fn figure_of_merit(&self, num_histories: u64, elapsed_time: f64) -> f64 {
        calculate_figure_of_merit(self.relative_error(num_histories), elapsed_time)
    }
}
