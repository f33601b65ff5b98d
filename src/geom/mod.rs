//! Pixel-frame geometry.

pub mod jacobian;

pub use jacobian::{Jacobian, Matrix2, SingularJacobian};
