//! Integration test crate for Stabilo.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every stabilo library crate to verify they work together.

#[cfg(test)]
mod scene;

#[cfg(test)]
mod pipeline;

#[cfg(test)]
mod region;

#[cfg(test)]
mod media;
