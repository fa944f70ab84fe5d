//! lockstep adapters - registry publishers
//!
//! Implementations of [`lockstep_core::RegistryPublisher`] that run a package
//! manager's publish command inside a package directory.

pub mod npm;

pub use npm::NpmPublisher;
