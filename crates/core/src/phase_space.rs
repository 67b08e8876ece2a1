use common::error::Error;
use common::types::{PhaseSpaceDimension, PhaseSpacePoint};
use std::fmt::Write;

/// Index of the bin of a continuous axis that contains `value`.
///
/// Bins are half-open `[b_i, b_{i+1})` except the last one, which is closed on the right.
/// Values outside of the axis are clamped to the first or last bin, callers are
/// expected to check containment first.
#[inline]
pub fn bin_index_for_axis(boundaries: &[f64], value: f64) -> usize {
    debug_assert!(boundaries.len() >= 2);

    let upper_bound = boundaries.partition_point(|b| *b <= value);
    upper_bound.saturating_sub(1).min(boundaries.len() - 2)
}

/// Index of the collision number bin containing `value`.
///
/// The edges are inclusive right bounds, so this is the first edge `>= value`.
#[inline]
pub fn collision_number_bin_index(edges: &[u32], value: u32) -> usize {
    debug_assert!(!edges.is_empty());

    edges.partition_point(|e| *e < value).min(edges.len() - 1)
}

/// Number of bins along each axis, energy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinDimensions {
    pub energy: usize,
    pub cosine: usize,
    pub time: usize,
    pub collision_number: usize,
}

impl BinDimensions {
    pub fn num_bins(&self) -> usize {
        self.energy * self.cosine * self.time * self.collision_number
    }
}

/// Flat bin index with energy varying fastest and the response function slowest.
///
/// This ordering is relied upon by every report and by replica merging.
#[inline]
pub fn combined_bin_index(
    energy_index: usize,
    cosine_index: usize,
    time_index: usize,
    collision_index: usize,
    response_function_index: usize,
    dims: &BinDimensions,
) -> usize {
    let energy_cosine = dims.energy * dims.cosine;
    let energy_cosine_time = energy_cosine * dims.time;

    energy_index
        + cosine_index * dims.energy
        + time_index * energy_cosine
        + collision_index * energy_cosine_time
        + response_function_index * energy_cosine_time * dims.collision_number
}

/// Bin boundaries along the four axes of an estimator's phase space.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpaceDiscretization {
    energy_boundaries: Vec<f64>,
    cosine_boundaries: Vec<f64>,
    time_boundaries: Vec<f64>,
    collision_number_edges: Vec<u32>,
}

impl Default for PhaseSpaceDiscretization {
    fn default() -> Self {
        Self {
            energy_boundaries: vec![0.0, f64::MAX],
            cosine_boundaries: vec![-1.0, 1.0],
            time_boundaries: vec![0.0, f64::MAX],
            collision_number_edges: vec![u32::MAX],
        }
    }
}

fn validate_continuous_boundaries(
    dimension: PhaseSpaceDimension,
    boundaries: &[f64],
    min: f64,
    max: f64,
) -> Result<(), Error> {
    if boundaries.len() < 2 {
        return Err(Error::TooFewBinBoundaries {
            dimension,
            required: 2,
            got: boundaries.len(),
        });
    }

    for &value in boundaries {
        if value.is_nan() || value < min || value > max {
            return Err(Error::BinBoundaryOutOfRange { dimension, value });
        }
    }

    for (index, pair) in boundaries.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(Error::NonAscendingBinBoundaries {
                dimension,
                index: index + 1,
            });
        }
    }

    Ok(())
}

impl PhaseSpaceDiscretization {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Fails unless there are at least two strictly increasing, non-negative boundaries.
    pub fn set_energy_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        validate_continuous_boundaries(PhaseSpaceDimension::Energy, boundaries, 0.0, f64::MAX)?;
        self.energy_boundaries = boundaries.to_vec();
        Ok(())
    }

    /// # Errors
    /// Fails unless there are at least two strictly increasing boundaries in `[-1, 1]`.
    pub fn set_cosine_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        validate_continuous_boundaries(PhaseSpaceDimension::Cosine, boundaries, -1.0, 1.0)?;
        self.cosine_boundaries = boundaries.to_vec();
        Ok(())
    }

    /// # Errors
    /// Fails unless there are at least two strictly increasing, non-negative boundaries.
    pub fn set_time_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        validate_continuous_boundaries(PhaseSpaceDimension::Time, boundaries, 0.0, f64::MAX)?;
        self.time_boundaries = boundaries.to_vec();
        Ok(())
    }

    /// Sets the inclusive right edges of the collision number bins.
    /// `u32::MAX` acts as an unbounded last edge.
    ///
    /// # Errors
    /// Fails unless there is at least one edge and the edges strictly increase.
    pub fn set_collision_number_bins(&mut self, edges: &[u32]) -> Result<(), Error> {
        let dimension = PhaseSpaceDimension::CollisionNumber;

        if edges.is_empty() {
            return Err(Error::TooFewBinBoundaries {
                dimension,
                required: 1,
                got: 0,
            });
        }

        for (index, pair) in edges.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(Error::NonAscendingBinBoundaries {
                    dimension,
                    index: index + 1,
                });
            }
        }

        self.collision_number_edges = edges.to_vec();
        Ok(())
    }

    pub fn energy_bin_boundaries(&self) -> &[f64] {
        &self.energy_boundaries
    }

    pub fn cosine_bin_boundaries(&self) -> &[f64] {
        &self.cosine_boundaries
    }

    pub fn time_bin_boundaries(&self) -> &[f64] {
        &self.time_boundaries
    }

    pub fn collision_number_bins(&self) -> &[u32] {
        &self.collision_number_edges
    }

    pub fn dimensions(&self) -> BinDimensions {
        BinDimensions {
            energy: self.energy_boundaries.len() - 1,
            cosine: self.cosine_boundaries.len() - 1,
            time: self.time_boundaries.len() - 1,
            collision_number: self.collision_number_edges.len(),
        }
    }

    pub fn num_bins_of(&self, dimension: PhaseSpaceDimension) -> usize {
        let dims = self.dimensions();

        match dimension {
            PhaseSpaceDimension::Energy => dims.energy,
            PhaseSpaceDimension::Cosine => dims.cosine,
            PhaseSpaceDimension::Time => dims.time,
            PhaseSpaceDimension::CollisionNumber => dims.collision_number,
        }
    }

    /// Number of bins for a single response function.
    pub fn num_bins(&self) -> usize {
        self.dimensions().num_bins()
    }

    /// Inclusive containment test along all four axes.
    pub fn is_point_in_phase_space(&self, point: &PhaseSpacePoint) -> bool {
        fn within(boundaries: &[f64], value: f64) -> bool {
            match (boundaries.first(), boundaries.last()) {
                (Some(lo), Some(hi)) => *lo <= value && value <= *hi,
                _ => false,
            }
        }

        within(&self.energy_boundaries, point.energy)
            && within(&self.cosine_boundaries, point.cosine)
            && within(&self.time_boundaries, point.time)
            && self
                .collision_number_edges
                .last()
                .is_some_and(|last| point.collision_number <= *last)
    }

    /// Flat bin index of `point` for the given response function.
    ///
    /// Returns `None` when the point lies outside the phase space.
    pub fn calculate_bin_index(
        &self,
        point: &PhaseSpacePoint,
        response_function_index: usize,
    ) -> Option<usize> {
        if !self.is_point_in_phase_space(point) {
            return None;
        }

        Some(combined_bin_index(
            bin_index_for_axis(&self.energy_boundaries, point.energy),
            bin_index_for_axis(&self.cosine_boundaries, point.cosine),
            bin_index_for_axis(&self.time_boundaries, point.time),
            collision_number_bin_index(&self.collision_number_edges, point.collision_number),
            response_function_index,
            &self.dimensions(),
        ))
    }

    /// Splits a bin index (modulo the number of bins) into its per-axis indices.
    pub fn decompose_bin_index(&self, bin_index: usize) -> [usize; 4] {
        let dims = self.dimensions();
        let bin_index = bin_index % dims.num_bins();

        let energy = bin_index % dims.energy;
        let cosine = (bin_index / dims.energy) % dims.cosine;
        let time = (bin_index / (dims.energy * dims.cosine)) % dims.time;
        let collision = bin_index / (dims.energy * dims.cosine * dims.time);

        [energy, cosine, time, collision]
    }

    /// Describes the bin of every axis that `bin_index` falls in.
    ///
    /// e.g. `Energy Bin: [0,0.1], Cosine Bin: [-1,1], Time Bin: [0,max], Collision Number Bin: [0,max]`
    pub fn bin_name(&self, bin_index: usize) -> String {
        let [e, c, t, n] = self.decompose_bin_index(bin_index);

        let mut name = String::new();
        Self::write_continuous_bin(&mut name, "Energy", &self.energy_boundaries, e);
        name.push_str(", ");
        Self::write_continuous_bin(&mut name, "Cosine", &self.cosine_boundaries, c);
        name.push_str(", ");
        Self::write_continuous_bin(&mut name, "Time", &self.time_boundaries, t);
        name.push_str(", ");

        let lower = if n == 0 {
            0
        } else {
            self.collision_number_edges[n - 1] + 1
        };
        let upper = self.collision_number_edges[n];
        let _ = if upper == u32::MAX {
            write!(name, "Collision Number Bin: [{},max]", lower)
        } else {
            write!(name, "Collision Number Bin: [{},{}]", lower, upper)
        };

        name
    }

    fn write_continuous_bin(out: &mut String, label: &str, boundaries: &[f64], index: usize) {
        let open = if index == 0 { '[' } else { '(' };
        let _ = write!(out, "{} Bin: {}{},", label, open, boundaries[index]);

        // The default upper bound of the unbounded axes.
        let upper = boundaries[index + 1];
        let _ = if upper == f64::MAX {
            write!(out, "max]")
        } else {
            write!(out, "{}]", upper)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(energy: f64, cosine: f64, time: f64, collision_number: u32) -> PhaseSpacePoint {
        PhaseSpacePoint {
            energy,
            cosine,
            time,
            collision_number,
        }
    }

    /// Boundary values belong to the bin they open, the last bin is closed.
    fn one_ulp_up(x: f64) -> f64 {
        f64::from_bits(x.to_bits() + 1)
    }

    fn one_ulp_down(x: f64) -> f64 {
        f64::from_bits(x.to_bits() - 1)
    }

    #[test]
    fn axis_index_half_open_convention() {
        let b = [0.0, 0.1, 1.0, 10.0];

        assert_eq!(bin_index_for_axis(&b, 0.0), 0);
        assert_eq!(bin_index_for_axis(&b, 0.05), 0);
        assert_eq!(bin_index_for_axis(&b, 0.1), 1);
        assert_eq!(bin_index_for_axis(&b, 5.0), 2);
        assert_eq!(bin_index_for_axis(&b, 10.0), 2);
    }

    #[test]
    fn collision_edges_are_inclusive() {
        let edges = [0, 1, 5];

        assert_eq!(collision_number_bin_index(&edges, 0), 0);
        assert_eq!(collision_number_bin_index(&edges, 1), 1);
        assert_eq!(collision_number_bin_index(&edges, 2), 2);
        assert_eq!(collision_number_bin_index(&edges, 5), 2);
    }

    #[test]
    fn combined_index_strides() {
        let dims = BinDimensions {
            energy: 3,
            cosine: 2,
            time: 4,
            collision_number: 2,
        };

        assert_eq!(combined_bin_index(0, 0, 0, 0, 0, &dims), 0);
        assert_eq!(combined_bin_index(1, 0, 0, 0, 0, &dims), 1);
        assert_eq!(combined_bin_index(0, 1, 0, 0, 0, &dims), 3);
        assert_eq!(combined_bin_index(0, 0, 1, 0, 0, &dims), 6);
        assert_eq!(combined_bin_index(0, 0, 0, 1, 0, &dims), 24);
        assert_eq!(combined_bin_index(0, 0, 0, 0, 1, &dims), dims.num_bins());
        assert_eq!(combined_bin_index(2, 1, 3, 1, 1, &dims), 2 + 3 + 18 + 24 + 48);
    }

    #[test]
    fn default_discretization_has_one_bin() {
        let d = PhaseSpaceDiscretization::new();
        assert_eq!(d.num_bins(), 1);
        assert_eq!(d.calculate_bin_index(&point(1.0, 0.3, 2.0, 7), 0), Some(0));
    }

    #[test]
    fn containment_is_inclusive() {
        let mut d = PhaseSpaceDiscretization::new();
        d.set_energy_bin_boundaries(&[1.0, 2.0]).unwrap();
        d.set_collision_number_bins(&[0, 3]).unwrap();

        assert!(d.is_point_in_phase_space(&point(1.0, -1.0, 0.0, 3)));
        assert!(d.is_point_in_phase_space(&point(2.0, 1.0, 0.0, 0)));
        assert!(!d.is_point_in_phase_space(&point(one_ulp_up(2.0), 0.0, 0.0, 0)));
        assert!(!d.is_point_in_phase_space(&point(one_ulp_down(1.0), 0.0, 0.0, 0)));
        assert!(!d.is_point_in_phase_space(&point(1.5, 0.0, 0.0, 4)));
    }

    #[test]
    fn rejects_invalid_boundaries() {
        let mut d = PhaseSpaceDiscretization::new();

        assert!(matches!(
            d.set_energy_bin_boundaries(&[1.0]),
            Err(Error::TooFewBinBoundaries { required: 2, got: 1, .. })
        ));
        assert!(matches!(
            d.set_energy_bin_boundaries(&[1.0, 1.0]),
            Err(Error::NonAscendingBinBoundaries { index: 1, .. })
        ));
        assert!(matches!(
            d.set_energy_bin_boundaries(&[-1.0, 1.0]),
            Err(Error::BinBoundaryOutOfRange { .. })
        ));
        assert!(matches!(
            d.set_cosine_bin_boundaries(&[-1.5, 1.0]),
            Err(Error::BinBoundaryOutOfRange { .. })
        ));
        assert!(matches!(
            d.set_time_bin_boundaries(&[0.0, f64::NAN]),
            Err(Error::BinBoundaryOutOfRange { .. })
        ));
        assert!(matches!(
            d.set_collision_number_bins(&[]),
            Err(Error::TooFewBinBoundaries { required: 1, .. })
        ));
        assert!(matches!(
            d.set_collision_number_bins(&[2, 1]),
            Err(Error::NonAscendingBinBoundaries { .. })
        ));

        // A failed setter leaves the previous discretization in place.
        assert_eq!(d, PhaseSpaceDiscretization::default());
    }

    #[test]
    fn decompose_inverts_combined_index() {
        let mut d = PhaseSpaceDiscretization::new();
        d.set_energy_bin_boundaries(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        d.set_cosine_bin_boundaries(&[-1.0, 0.0, 1.0]).unwrap();
        d.set_time_bin_boundaries(&[0.0, 1.0, 2.0]).unwrap();
        d.set_collision_number_bins(&[0, 1, 2]).unwrap();

        let dims = d.dimensions();
        let idx = combined_bin_index(2, 1, 0, 2, 0, &dims);
        assert_eq!(d.decompose_bin_index(idx), [2, 1, 0, 2]);
    }

    #[test]
    fn bin_names() {
        let mut d = PhaseSpaceDiscretization::new();
        d.set_energy_bin_boundaries(&[0.0, 0.1, 1.0]).unwrap();
        d.set_collision_number_bins(&[0, 10]).unwrap();

        assert_eq!(
            d.bin_name(0),
            "Energy Bin: [0,0.1], Cosine Bin: [-1,1], Time Bin: [0,max], Collision Number Bin: [0,0]"
        );
        assert_eq!(
            d.bin_name(3),
            "Energy Bin: (0.1,1], Cosine Bin: [-1,1], Time Bin: [0,max], Collision Number Bin: [1,10]"
        );
    }
}
