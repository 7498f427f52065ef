pub mod distances;
pub mod neighbors;
pub mod supercell;
