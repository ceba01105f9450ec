//! Cycle protection for recursive type expansion
//!
//! Prevents infinite recursion when automatically mapping record types whose
//! references lead back to a type already being expanded.

use std::any::TypeId;

/// Tracks the chain of types currently being expanded
#[derive(Debug, Clone)]
pub struct TypeChainGuard {
    /// Maximum chain length before expansion stops
    max_depth: usize,

    /// Types on the current access chain, outermost first
    chain: Vec<(TypeId, &'static str)>,
}

impl TypeChainGuard {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            chain: Vec::new(),
        }
    }

    /// Push a type onto the chain.
    ///
    /// Fails without modifying the chain if the type is already on it or the
    /// chain is at its maximum depth.
    pub fn enter(
        &mut self,
        id: TypeId,
        name: &'static str,
        path: &str,
    ) -> Result<(), CircularRefError> {
        if self.contains(id) {
            return Err(CircularRefError::circular_reference_detected(name, path));
        }
        if self.chain.len() >= self.max_depth {
            return Err(CircularRefError::max_depth_exceeded(path, self.max_depth));
        }
        self.chain.push((id, name));
        Ok(())
    }

    /// Pop the innermost type
    pub fn leave(&mut self) {
        self.chain.pop();
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.chain.iter().any(|(existing, _)| *existing == id)
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn max_depth_limit(&self) -> usize {
        self.max_depth
    }

    /// Type names on the chain, joined for diagnostics
    pub fn describe(&self) -> String {
        self.chain
            .iter()
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Reset the guard for reuse
    pub fn reset(&mut self) {
        self.chain.clear();
    }
}

/// Reason a type could not be expanded
#[derive(Debug, Clone)]
pub struct CircularRefError {
    pub kind: CircularRefErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CircularRefErrorKind {
    CircularReference,
    MaxDepthExceeded,
}

impl CircularRefError {
    pub fn circular_reference_detected(type_name: &str, path: &str) -> Self {
        Self {
            kind: CircularRefErrorKind::CircularReference,
            message: format!(
                "{} at '{}' is already being expanded on this access path",
                type_name, path
            ),
        }
    }

    pub fn max_depth_exceeded(path: &str, max: usize) -> Self {
        Self {
            kind: CircularRefErrorKind::MaxDepthExceeded,
            message: format!("Maximum reference depth ({}) reached at '{}'", max, path),
        }
    }
}

impl std::fmt::Display for CircularRefError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CircularRefError {}
