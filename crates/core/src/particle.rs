use common::constants::{
    ELECTRON_REST_MASS_ENERGY_MEV, NEUTRON_REST_MASS_ENERGY_MEV, SPEED_OF_LIGHT_CM_PER_S,
};
use common::types::ParticleType;

use crate::traits::ParticleStateLike;

/// Plain particle state used by drivers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    pub particle_type: ParticleType,
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub energy: f64,
    pub weight: f64,
    pub time: f64,
    pub collision_number: u32,
}

impl ParticleState {
    /// A particle at the origin moving along +x with unit weight.
    pub fn new(particle_type: ParticleType, energy: f64) -> Self {
        Self {
            particle_type,
            position: [0.0; 3],
            direction: [1.0, 0.0, 0.0],
            energy,
            weight: 1.0,
            time: 0.0,
            collision_number: 0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_direction(mut self, direction: [f64; 3]) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn with_collision_number(mut self, collision_number: u32) -> Self {
        self.collision_number = collision_number;
        self
    }

    /// Moves the particle `distance` cm along its direction and advances its clock.
    pub fn advance(&mut self, distance: f64) {
        for (p, d) in self.position.iter_mut().zip(self.direction.iter()) {
            *p += distance * d;
        }
        self.time += distance / self.speed();
    }

    fn rest_mass_energy(&self) -> Option<f64> {
        match self.particle_type {
            ParticleType::Neutron | ParticleType::AdjointNeutron => {
                Some(NEUTRON_REST_MASS_ENERGY_MEV)
            }
            ParticleType::Electron | ParticleType::Positron | ParticleType::AdjointElectron => {
                Some(ELECTRON_REST_MASS_ENERGY_MEV)
            }
            ParticleType::Photon | ParticleType::AdjointPhoton => None,
        }
    }
}

impl ParticleStateLike for ParticleState {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    fn direction(&self) -> [f64; 3] {
        self.direction
    }

    fn position(&self) -> [f64; 3] {
        self.position
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn collision_number(&self) -> u32 {
        self.collision_number
    }

    fn particle_type(&self) -> ParticleType {
        self.particle_type
    }

    fn speed(&self) -> f64 {
        match self.rest_mass_energy() {
            None => SPEED_OF_LIGHT_CM_PER_S,
            Some(rest_mass) => {
                let gamma_inv = rest_mass / (self.energy + rest_mass);
                SPEED_OF_LIGHT_CM_PER_S * (1.0 - gamma_inv * gamma_inv).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photons_travel_at_the_speed_of_light() {
        let photon = ParticleState::new(ParticleType::Photon, 1.0);
        assert_eq!(photon.speed(), SPEED_OF_LIGHT_CM_PER_S);
    }

    #[test]
    fn thermal_neutron_speed() {
        // 0.0253 eV neutrons move at roughly 2200 m/s
        let neutron = ParticleState::new(ParticleType::Neutron, 2.53e-8);
        let speed = neutron.speed();
        assert!((speed - 2.2e5).abs() / 2.2e5 < 1e-2, "speed {}", speed);
    }

    #[test]
    fn advance_moves_along_direction() {
        let mut p = ParticleState::new(ParticleType::Photon, 1.0)
            .with_direction([0.0, 0.6, 0.8]);
        p.advance(5.0);

        assert_eq!(p.position, [0.0, 3.0, 4.0]);
        assert!((p.time - 5.0 / SPEED_OF_LIGHT_CM_PER_S).abs() < 1e-25);
    }

    #[test]
    fn charge_comes_from_type() {
        let p = ParticleState::new(ParticleType::Positron, 1.0);
        assert_eq!(p.charge(), 1.0);
    }
}
