use serde::Deserialize;
use std::fmt;

use super::error::Error;

/// The particle species an estimator can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleType {
    Neutron,
    Photon,
    Electron,
    Positron,
    AdjointNeutron,
    AdjointPhoton,
    AdjointElectron,
}

impl ParticleType {
    pub const ALL: [ParticleType; 7] = [
        ParticleType::Neutron,
        ParticleType::Photon,
        ParticleType::Electron,
        ParticleType::Positron,
        ParticleType::AdjointNeutron,
        ParticleType::AdjointPhoton,
        ParticleType::AdjointElectron,
    ];

    /// Charge in units of the elementary charge.
    pub fn charge(&self) -> f64 {
        match self {
            ParticleType::Electron | ParticleType::AdjointElectron => -1.0,
            ParticleType::Positron => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ParticleType::Neutron => "neutron",
            ParticleType::Photon => "photon",
            ParticleType::Electron => "electron",
            ParticleType::Positron => "positron",
            ParticleType::AdjointNeutron => "adjoint neutron",
            ParticleType::AdjointPhoton => "adjoint photon",
            ParticleType::AdjointElectron => "adjoint electron",
        };
        write!(f, "{}", name)
    }
}

/// The four discretized axes of an estimator's phase space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseSpaceDimension {
    Energy,
    Cosine,
    Time,
    CollisionNumber,
}

impl fmt::Display for PhaseSpaceDimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PhaseSpaceDimension::Energy => "Energy",
            PhaseSpaceDimension::Cosine => "Cosine",
            PhaseSpaceDimension::Time => "Time",
            PhaseSpaceDimension::CollisionNumber => "Collision Number",
        };
        write!(f, "{}", name)
    }
}

/// The phase-space coordinates of a single contribution. Transient, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSpacePoint {
    pub energy: f64,
    pub cosine: f64,
    pub time: f64,
    pub collision_number: u32,
}

impl PhaseSpacePoint {
    /// A point that is only meaningful along the energy axis.
    ///
    /// The remaining coordinates sit inside the default discretization of their axes.
    pub fn energy_only(energy: f64) -> Self {
        Self {
            energy,
            cosine: 0.0,
            time: 0.0,
            collision_number: 0,
        }
    }
}

/// Run-wide values needed to turn raw moments into processed estimates.
///
/// Built once when the run starts and passed by reference to every reporting call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    num_histories: u64,
    start_time: f64,
    end_time: f64,
}

impl RunContext {
    /// # Errors
    /// Returns `Error::InvalidHistoryCount` if `num_histories` is zero and
    /// `Error::InvalidElapsedTime` unless `end_time > start_time`.
    pub fn new(num_histories: u64, start_time: f64, end_time: f64) -> Result<Self, Error> {
        if num_histories == 0 {
            return Err(Error::InvalidHistoryCount);
        }

        let elapsed = end_time - start_time;
        if !(elapsed > 0.0) || !elapsed.is_finite() {
            return Err(Error::InvalidElapsedTime(elapsed));
        }

        Ok(Self {
            num_histories,
            start_time,
            end_time,
        })
    }

    pub fn num_histories(&self) -> u64 {
        self.num_histories
    }

    pub fn elapsed_time(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_context_rejects_zero_histories() {
        assert_eq!(
            RunContext::new(0, 0.0, 1.0),
            Err(Error::InvalidHistoryCount)
        );
    }

    #[test]
    fn run_context_rejects_non_positive_elapsed_time() {
        assert!(matches!(
            RunContext::new(10, 1.0, 1.0),
            Err(Error::InvalidElapsedTime(_))
        ));
        assert!(matches!(
            RunContext::new(10, 2.0, 1.0),
            Err(Error::InvalidElapsedTime(_))
        ));
    }

    #[test]
    fn run_context_elapsed_time() {
        let ctx = RunContext::new(5, 1.5, 4.0).unwrap();
        assert_eq!(ctx.num_histories(), 5);
        assert_eq!(ctx.elapsed_time(), 2.5);
    }

    #[test]
    fn charge_follows_particle_type() {
        assert_eq!(ParticleType::Electron.charge(), -1.0);
        assert_eq!(ParticleType::Positron.charge(), 1.0);
        assert_eq!(ParticleType::Photon.charge(), 0.0);
        assert_eq!(ParticleType::Neutron.charge(), 0.0);
    }
}
