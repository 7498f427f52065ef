// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod analysis;
pub mod chemistry;
pub mod core;
pub mod io;
pub mod logger;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::analysis::distances::{pairwise_distances, DistanceMatrix};
pub use crate::analysis::neighbors::{NeighborReporter, PairRecord, ReportConfig, DEFAULT_CUTOFF};
pub use crate::analysis::supercell::{Supercell, SupercellExpander, N_IMAGES, SC_SIZE};
pub use crate::core::error::StructureError;
pub use crate::core::structure::{Atom, Crystal, Lattice};
pub use crate::io::parser;

use log::info;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Configuration for an intersite (Hubbard V) neighbour query.
pub type IntersiteConfig = ReportConfig;

/// The full pipeline: supercell expansion, all-pairs distances, neighbour report.
///
/// Nothing is cached; every call recomputes the supercell and the distance matrix.
pub fn find_intersite_pairs(crystal: &Crystal, config: &IntersiteConfig) -> Result<Vec<PairRecord>, StructureError> {
    // 1. EXPANSION
    let supercell = SupercellExpander::expand(crystal)?;
    info!(
        "Expanded {} base atoms into {} supercell atoms.",
        supercell.base_len(),
        supercell.len()
    );

    // 2. DISTANCES
    let distances = pairwise_distances(&supercell.positions);
    info!("Computed {0}x{0} distance matrix.", distances.len());

    // 3. REPORT
    let records = NeighborReporter::report(crystal, &supercell, &distances, config)?;
    info!("{} pairs within {:.3} Å.", records.len(), config.cutoff);

    Ok(records)
}
