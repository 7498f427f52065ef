use crate::core::error::StructureError;
use nalgebra::{Matrix3, Vector3};

/// Volume threshold below which a lattice is treated as degenerate.
const MIN_DETERMINANT: f64 = 1e-6;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Periodic lattice. The columns of `matrix` are the basis vectors a, b, c in Å.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    pub matrix: Matrix3<f64>,
    pub reciprocal_matrix: Matrix3<f64>,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, StructureError> {
        let determinant = matrix.determinant();
        if !determinant.is_finite() || determinant.abs() < MIN_DETERMINANT {
            return Err(StructureError::SingularLattice { determinant });
        }
        let reciprocal_matrix = matrix
            .try_inverse()
            .ok_or(StructureError::SingularLattice { determinant })?
            .transpose();
        Ok(Self {
            matrix,
            reciprocal_matrix,
        })
    }

    /// Builds a lattice from row basis vectors, the layout used by `CELL_PARAMETERS`.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self, StructureError> {
        let columns = rows.map(Vector3::from);
        Self::new(Matrix3::from_columns(&columns))
    }

    /// Lattice with basis vectors as rows, so that `frac_row * rows = cart_row`.
    pub fn row_matrix(&self) -> Matrix3<f64> {
        self.matrix.transpose()
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> { self.matrix * frac }
    pub fn to_fractional(&self, cart: &Vector3<f64>) -> Vector3<f64> { self.reciprocal_matrix.transpose() * cart }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical symbol, e.g. "Fe".
    pub element: String,
    pub fractional_coords: Vector3<f64>,
}

impl Atom {
    pub fn new(element: impl Into<String>, fractional_coords: Vector3<f64>) -> Self {
        Self {
            element: element.into(),
            fractional_coords,
        }
    }
}

/// Base (unreplicated) periodic structure.
#[derive(Debug, Clone)]
pub struct Crystal {
    pub lattice: Lattice,
    pub atoms: Vec<Atom>,
}

impl Crystal {
    /// Validates and wraps a lattice and its atoms.
    ///
    /// Coordinates outside [0, 1) are accepted as given; they are never wrapped.
    pub fn new(lattice: Lattice, atoms: Vec<Atom>) -> Result<Self, StructureError> {
        let crystal = Self { lattice, atoms };
        crystal.validate()?;
        Ok(crystal)
    }

    /// Re-checks the invariants of `new`. Fields are public, so a crystal may
    /// have been built or edited without going through it.
    pub fn validate(&self) -> Result<(), StructureError> {
        if self.atoms.is_empty() {
            return Err(StructureError::EmptyStructure);
        }
        let determinant = self.lattice.matrix.determinant();
        if !determinant.is_finite() || determinant.abs() < MIN_DETERMINANT {
            return Err(StructureError::SingularLattice { determinant });
        }
        if let Some(index) = self
            .atoms
            .iter()
            .position(|a| a.fractional_coords.iter().any(|x| !x.is_finite()))
        {
            return Err(StructureError::NonFiniteCoordinate { index });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.atoms.iter().map(|a| a.element.as_str()).collect()
    }
}
