// ----------------------------
// Moment accumulation layouts
// ----------------------------

use common::moments::MomentAccumulator;

/// One per-history contribution to one bin.
#[derive(Debug, Clone, Copy)]
pub struct Contribution {
    pub bin: usize,
    pub value: f64,
}

/// Array of Structs (AoS) - the four moments of a bin are contiguous.
pub type MomentsAOS = Vec<MomentAccumulator>;

/// Struct of Arrays (SoA) - each moment order is contiguous across bins.
#[derive(Debug, Clone, Default)]
pub struct MomentColumns {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub third: Vec<f64>,
    pub fourth: Vec<f64>,
}

impl MomentColumns {
    pub fn new(num_bins: usize) -> Self {
        MomentColumns {
            first: vec![0.0; num_bins],
            second: vec![0.0; num_bins],
            third: vec![0.0; num_bins],
            fourth: vec![0.0; num_bins],
        }
    }

    #[inline]
    pub fn add(&mut self, bin: usize, value: f64) {
        let v2 = value * value;
        let v3 = v2 * value;
        let v4 = v3 * value;

        self.first[bin] += value;
        self.second[bin] += v2;
        self.third[bin] += v3;
        self.fourth[bin] += v4;
    }
}

impl From<&MomentColumns> for MomentsAOS {
    fn from(soa: &MomentColumns) -> Self {
        (0..soa.first.len())
            .map(|i| {
                MomentAccumulator::from_raw(soa.first[i], soa.second[i], soa.third[i], soa.fourth[i])
            })
            .collect()
    }
}

pub const NUM_BINS: usize = 1_024;
pub const NUM_CONTRIBUTIONS: usize = 1_000_000;

/// Generates a deterministic stream of contributions spread over all bins.
///
/// Values vary by index so the compiler cannot fold the accumulation.
pub fn generate_benchmark_contributions() -> Vec<Contribution> {
    (0..NUM_CONTRIBUTIONS)
        .map(|i| Contribution {
            bin: (i * 7919) % NUM_BINS,
            value: 0.5 + (i % 97) as f64 * 1e-3,
        })
        .collect()
}

/// Order-independent summary used by both benchmarks.
pub fn checksum(first: impl Iterator<Item = f64>, fourth: impl Iterator<Item = f64>) -> f64 {
    first.sum::<f64>() + fourth.sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_accumulate_the_same_moments() {
        let contributions: Vec<Contribution> =
            generate_benchmark_contributions().into_iter().take(10_000).collect();

        let mut aos: MomentsAOS = vec![MomentAccumulator::new(); NUM_BINS];
        let mut soa = MomentColumns::new(NUM_BINS);

        for c in &contributions {
            aos[c.bin].add(c.value);
            soa.add(c.bin, c.value);
        }

        let converted: MomentsAOS = (&soa).into();
        assert_eq!(converted, aos);
    }
}
