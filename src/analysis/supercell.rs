use crate::core::error::StructureError;
use crate::core::structure::Crystal;
use nalgebra::{MatrixXx3, RowVector3, Vector3};

/// Number of neighbouring cells included on each side of the base cell.
pub const SC_SIZE: i32 = 1;

/// Number of image cells in the expansion, the base cell included.
pub const N_IMAGES: usize = ((2 * SC_SIZE + 1) * (2 * SC_SIZE + 1) * (2 * SC_SIZE + 1)) as usize;

// ============================================================================
// SUPERCELL
// ============================================================================

/// Finite 3x3x3 expansion of a base structure.
///
/// Atom `i < N` is base atom `i` untranslated. Afterwards come translated copies,
/// one block of N atoms per non-zero offset, offsets ordered x outer, z inner.
#[derive(Debug, Clone)]
pub struct Supercell {
    /// Cartesian positions, one row per supercell atom.
    pub positions: MatrixXx3<f64>,
    /// `base_to_images[i][c]` is the supercell index of base atom `i` in image cell `c`.
    pub base_to_images: Vec<[usize; N_IMAGES]>,
    /// Base-atom index of every supercell atom.
    pub supercell_to_base: Vec<usize>,
}

impl Supercell {
    pub fn len(&self) -> usize {
        self.supercell_to_base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supercell_to_base.is_empty()
    }

    pub fn base_len(&self) -> usize {
        self.base_to_images.len()
    }

    pub fn position(&self, i: usize) -> Vector3<f64> {
        self.positions.row(i).transpose()
    }

    pub fn base_index(&self, i: usize) -> usize {
        self.supercell_to_base[i]
    }

    pub fn image_index(&self, base: usize, cell: usize) -> usize {
        self.base_to_images[base][cell]
    }
}

/// Image-cell offsets in expansion order: the zero offset first, then
/// every other offset of {-1, 0, 1}^3 with x outermost and z innermost.
pub fn image_offsets() -> Vec<[i32; 3]> {
    let mut offsets = Vec::with_capacity(N_IMAGES);
    offsets.push([0, 0, 0]);
    for nx in -SC_SIZE..=SC_SIZE {
        for ny in -SC_SIZE..=SC_SIZE {
            for nz in -SC_SIZE..=SC_SIZE {
                if nx == 0 && ny == 0 && nz == 0 {
                    continue;
                }
                offsets.push([nx, ny, nz]);
            }
        }
    }
    offsets
}

// ============================================================================
// EXPANDER
// ============================================================================

pub struct SupercellExpander;

impl SupercellExpander {
    /// Replicates `crystal` over the 27 image cells and converts to Cartesian.
    ///
    /// Fails on an empty structure, a singular lattice or a non-finite coordinate
    /// instead of producing NaN positions.
    pub fn expand(crystal: &Crystal) -> Result<Supercell, StructureError> {
        crystal.validate()?;
        let n_base = crystal.atoms.len();
        let n_super = N_IMAGES * n_base;

        let mut frac = MatrixXx3::<f64>::zeros(n_super);
        let mut base_to_images = vec![[0usize; N_IMAGES]; n_base];
        let mut supercell_to_base = vec![0usize; n_super];

        for (i, atom) in crystal.atoms.iter().enumerate() {
            frac.set_row(i, &atom.fractional_coords.transpose());
            base_to_images[i][0] = i;
            supercell_to_base[i] = i;
        }

        let mut iatom = n_base;
        for (icell, offset) in image_offsets().into_iter().enumerate().skip(1) {
            let shift = RowVector3::new(offset[0] as f64, offset[1] as f64, offset[2] as f64);
            for (i, atom) in crystal.atoms.iter().enumerate() {
                frac.set_row(iatom, &(atom.fractional_coords.transpose() + shift));
                base_to_images[i][icell] = iatom;
                supercell_to_base[iatom] = i;
                iatom += 1;
            }
        }

        // Single (M x 3) * (3 x 3) product, lattice rows being the basis vectors.
        let positions = frac * crystal.lattice.row_matrix();

        Ok(Supercell {
            positions,
            base_to_images,
            supercell_to_base,
        })
    }
}
