// UFS DA Infrastructure - System Adapters
// Implements: ObjectStore for the noaa_hpss platform

pub mod hpss_store;

pub use hpss_store::{HpssObjectStore, HpssSettings};
