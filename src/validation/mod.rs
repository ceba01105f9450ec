//! Structural validation used while building class maps

pub mod circular_refs;

pub use circular_refs::{CircularRefError, CircularRefErrorKind, TypeChainGuard};
