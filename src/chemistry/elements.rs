/// Chemical symbols ordered by atomic number (index 0 is H).
pub const CHEMICAL_SYMBOLS: [&str; 118] = [
    // --- Period 1-2 ---
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    // --- Period 3-4 ---
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr",
    // --- Period 5 ---
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd",
    "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe",
    // --- Period 6 ---
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W",
    "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po",
    "At", "Rn",
    // --- Period 7 ---
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg",
    "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv",
    "Ts", "Og",
];

pub fn is_chemical_symbol(symbol: &str) -> bool {
    CHEMICAL_SYMBOLS.contains(&symbol)
}

/// Reduces a species label such as "Fe1", "Fe_up" or "O2" to its chemical symbol.
///
/// A two-letter match wins over a one-letter one, so "Co1" is cobalt, "C1" is carbon.
pub fn label_to_symbol(label: &str) -> Option<String> {
    let mut chars = label.chars();
    let first = chars.next()?.to_ascii_uppercase();

    if let Some(second) = chars.next() {
        let two = format!("{}{}", first, second.to_ascii_lowercase());
        if is_chemical_symbol(&two) {
            return Some(two);
        }
    }

    let one = first.to_string();
    is_chemical_symbol(&one).then_some(one)
}
