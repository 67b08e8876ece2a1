use crate::traits::{ContributionMultiplier, ParticleStateLike, PulseHeightMultiplier};

/// Contributions scale with the particle weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightMultiplier;

/// Contributions scale with the particle weight times its energy.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightAndEnergyMultiplier;

/// Contributions scale with the particle weight times its charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightAndChargeMultiplier;

impl ContributionMultiplier for WeightMultiplier {
    #[inline]
    fn multiplier(particle: &dyn ParticleStateLike) -> f64 {
        particle.weight()
    }
}

impl ContributionMultiplier for WeightAndEnergyMultiplier {
    #[inline]
    fn multiplier(particle: &dyn ParticleStateLike) -> f64 {
        particle.weight() * particle.energy()
    }
}

impl ContributionMultiplier for WeightAndChargeMultiplier {
    #[inline]
    fn multiplier(particle: &dyn ParticleStateLike) -> f64 {
        particle.weight() * particle.charge()
    }
}

/// Pulse height counts: every history with a deposition in the bin scores one.
impl PulseHeightMultiplier for WeightMultiplier {
    #[inline]
    fn pulse_contribution(_energy_deposition: f64) -> f64 {
        1.0
    }
}

/// Energy weighted pulse height: the deposition itself is scored.
impl PulseHeightMultiplier for WeightAndEnergyMultiplier {
    #[inline]
    fn pulse_contribution(energy_deposition: f64) -> f64 {
        energy_deposition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleState;
    use common::types::ParticleType;

    #[test]
    fn multipliers() {
        let electron = ParticleState::new(ParticleType::Electron, 2.0).with_weight(0.5);

        assert_eq!(WeightMultiplier::multiplier(&electron), 0.5);
        assert_eq!(WeightAndEnergyMultiplier::multiplier(&electron), 1.0);
        assert_eq!(WeightAndChargeMultiplier::multiplier(&electron), -0.5);
    }

    #[test]
    fn pulse_contributions() {
        assert_eq!(WeightMultiplier::pulse_contribution(0.7), 1.0);
        assert_eq!(WeightAndEnergyMultiplier::pulse_contribution(0.7), 0.7);
    }
}
