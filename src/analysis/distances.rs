use nalgebra::{DMatrix, MatrixXx3};

/// Dense symmetric matrix of Euclidean distances between supercell atoms.
///
/// # Complexity
/// O(M^2) memory and time with M = 27 N. Fine for cells of a few hundred atoms.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    data: DMatrix<f64>,
}

impl DistanceMatrix {
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Distances from atom `i` to every supercell atom.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data.row(i).iter().copied().collect()
    }

    /// Supercell indices ordered by increasing distance from atom `i`.
    /// Equal distances keep ascending index order; NaN entries go last.
    pub fn sorted_neighbors(&self, i: usize) -> Vec<usize> {
        let row = self.data.row(i);
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            row[a]
                .partial_cmp(&row[b])
                .unwrap_or_else(|| row[a].is_nan().cmp(&row[b].is_nan()))
        });
        order
    }
}

/// Computes all pairwise distances between the rows of `positions`.
///
/// No minimum-image correction is applied: periodicity is carried entirely
/// by the explicit image atoms of the supercell.
pub fn pairwise_distances(positions: &MatrixXx3<f64>) -> DistanceMatrix {
    let n = positions.nrows();
    let mut data = DMatrix::<f64>::zeros(n, n);

    for i in 0..n {
        let p_i = positions.row(i);
        for j in (i + 1)..n {
            let d = (p_i - positions.row(j)).norm();
            data[(i, j)] = d;
            data[(j, i)] = d;
        }
    }

    DistanceMatrix { data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::supercell::SupercellExpander;
    use crate::core::structure::{Atom, Crystal, Lattice};
    use nalgebra::Vector3;

    const TOL: f64 = 1e-10;

    fn cubic_single_atom(a: f64) -> DistanceMatrix {
        let lattice = Lattice::from_rows([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]).unwrap();
        let crystal = Crystal::new(lattice, vec![Atom::new("Cu", Vector3::zeros())]).unwrap();
        let sc = SupercellExpander::expand(&crystal).unwrap();
        pairwise_distances(&sc.positions)
    }

    fn triclinic_pair() -> DistanceMatrix {
        let lattice = Lattice::from_rows([[3.1, 0.0, 0.0], [0.7, 2.9, 0.0], [0.4, -0.3, 4.2]]).unwrap();
        let atoms = vec![
            Atom::new("Ti", Vector3::new(0.1, 0.2, 0.3)),
            Atom::new("O", Vector3::new(0.6, 0.55, 0.9)),
        ];
        let crystal = Crystal::new(lattice, atoms).unwrap();
        let sc = SupercellExpander::expand(&crystal).unwrap();
        pairwise_distances(&sc.positions)
    }

    #[test]
    fn symmetric_with_zero_diagonal() {
        let d = triclinic_pair();
        assert_eq!(d.len(), 54);
        for i in 0..d.len() {
            assert_eq!(d.get(i, i), 0.0);
            for j in 0..d.len() {
                assert_eq!(d.get(i, j), d.get(j, i));
                assert!(d.get(i, j) >= 0.0);
            }
        }
    }

    #[test]
    fn triangle_inequality_holds() {
        let d = triclinic_pair();
        let n = d.len();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    assert!(d.get(i, k) <= d.get(i, j) + d.get(j, k) + TOL);
                }
            }
        }
    }

    #[test]
    fn simple_cubic_shells() {
        let a = 2.5;
        let d = cubic_single_atom(a);
        let order = d.sorted_neighbors(0);

        assert_eq!(order[0], 0);
        let shells = [(1..7, a), (7..19, a * 2f64.sqrt()), (19..27, a * 3f64.sqrt())];
        for (range, expected) in shells {
            for &j in &order[range] {
                assert!((d.get(0, j) - expected).abs() < TOL, "atom {} at {}", j, d.get(0, j));
            }
        }
    }

    #[test]
    fn unit_cube_face_neighbors_at_one() {
        let d = cubic_single_atom(1.0);
        let faces = d.row(0).iter().filter(|&&x| (x - 1.0).abs() < TOL).count();
        assert_eq!(faces, 6);
        assert_eq!(format!("{:.3}", d.get(0, d.sorted_neighbors(0)[1])), "1.000");
    }

    #[test]
    fn ties_keep_index_order() {
        let d = cubic_single_atom(1.0);
        let order = d.sorted_neighbors(0);
        for w in order.windows(2) {
            if d.get(0, w[0]) == d.get(0, w[1]) {
                assert!(w[0] < w[1]);
            }
        }
    }
}
