use crate::analysis::distances::DistanceMatrix;
use crate::analysis::supercell::Supercell;
use crate::core::error::StructureError;
use crate::core::structure::Crystal;
use log::{debug, warn};
use std::fmt;

pub const DEFAULT_CUTOFF: f64 = 5.0;

/// Parameters of a neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Largest reported distance in Å (inclusive).
    pub cutoff: f64,
    /// Species allowed as the centre atom. `None` keeps every atom.
    pub elements: Option<Vec<String>>,
    /// Report the zero-distance pair of each centre atom with itself.
    pub include_self: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            elements: None,
            include_self: true,
        }
    }
}

/// One reported pair. Indices are 1-based; `neighbor_index` counts supercell atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    pub center_symbol: String,
    pub neighbor_symbol: String,
    pub center_index: usize,
    pub neighbor_index: usize,
    pub distance: f64,
}

impl fmt::Display for PairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "V {:<4} {:<4} {:>5} {:>5} {:.3}",
            self.center_symbol, self.neighbor_symbol, self.center_index, self.neighbor_index, self.distance
        )
    }
}

pub struct NeighborReporter;

impl NeighborReporter {
    /// Lists, for every selected base atom, all supercell atoms within the cutoff,
    /// nearest first.
    pub fn report(
        crystal: &Crystal,
        supercell: &Supercell,
        distances: &DistanceMatrix,
        config: &ReportConfig,
    ) -> Result<Vec<PairRecord>, StructureError> {
        if config.cutoff.is_nan() || config.cutoff < 0.0 {
            return Err(StructureError::InvalidCutoff { cutoff: config.cutoff });
        }

        if let Some(elements) = &config.elements {
            for el in elements {
                if !crystal.atoms.iter().any(|a| &a.element == el) {
                    warn!("No '{}' atoms in the structure; nothing will be reported for it.", el);
                }
            }
        }

        let mut records = Vec::new();

        for (i, center) in crystal.atoms.iter().enumerate() {
            if let Some(elements) = &config.elements {
                if !elements.iter().any(|el| el == &center.element) {
                    continue;
                }
            }

            let before = records.len();
            for j in distances.sorted_neighbors(i) {
                let d = distances.get(i, j);
                // NaN never counts as within the cutoff.
                if !(d <= config.cutoff) {
                    break;
                }
                if j == i && !config.include_self {
                    continue;
                }
                let neighbor = &crystal.atoms[supercell.base_index(j)];
                records.push(PairRecord {
                    center_symbol: center.element.clone(),
                    neighbor_symbol: neighbor.element.clone(),
                    center_index: i + 1,
                    neighbor_index: j + 1,
                    distance: d,
                });
            }
            debug!("Atom {} ({}): {} neighbours within {:.3} Å", i + 1, center.element, records.len() - before, config.cutoff);
        }

        Ok(records)
    }
}
