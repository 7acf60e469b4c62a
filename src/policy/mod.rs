//! Boundary-crossing policy definitions.

pub mod matrix;

pub use matrix::{PolicyMatrix, DirectionPolicy, PolicyError};
