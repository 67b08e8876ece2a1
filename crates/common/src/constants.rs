//! Physical constants (CODATA 2018).

/// Speed of light in vacuum (cm/s).
pub const SPEED_OF_LIGHT_CM_PER_S: f64 = 29_979_245_800.0;

/// Neutron rest mass energy (MeV).
pub const NEUTRON_REST_MASS_ENERGY_MEV: f64 = 939.565_420_52;

/// Electron rest mass energy (MeV).
pub const ELECTRON_REST_MASS_ENERGY_MEV: f64 = 0.510_998_950_00;

/// Boltzmann constant (MeV/K).
pub const BOLTZMANN_CONSTANT_MEV_PER_K: f64 = 8.617_333_262e-11;
