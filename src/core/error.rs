use thiserror::Error;

/// Reasons a structure or query is rejected before any distances are computed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("Structure contains no atoms.")]
    EmptyStructure,

    #[error("Lattice has zero or near-zero volume (det = {determinant:.3e}).")]
    SingularLattice { determinant: f64 },

    #[error("Atom {index} has a non-finite fractional coordinate.")]
    NonFiniteCoordinate { index: usize },

    #[error("Cutoff radius must be a non-negative number, got {cutoff}.")]
    InvalidCutoff { cutoff: f64 },
}
