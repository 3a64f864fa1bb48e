//! Core library components.
//!
//! This module contains the reusable logic for group registry management,
//! key provisioning, remote device operations and verified uploads. Nothing
//! here prints; every operation returns a [`outcome::Outcome`] or a
//! [`crate::error::Result`].

pub mod batch;
pub mod config;
pub mod constants;
pub mod device;
pub mod digest;
pub mod enroll;
pub mod keys;
pub mod outcome;
pub mod registry;
pub mod remote;
pub mod status;
pub mod transfer;
pub mod types;
pub mod validation;
