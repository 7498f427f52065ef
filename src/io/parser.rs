use crate::chemistry::elements::label_to_symbol;
use crate::core::structure::{Atom, Crystal, Lattice};
use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Bohr radius in Å (CODATA 2014).
pub const BOHR_TO_ANGSTROM: f64 = 0.52917721067;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthUnit {
    Alat,
    Bohr,
    Angstrom,
    Crystal,
}

impl LengthUnit {
    /// Reads the option of a card header, e.g. `ATOMIC_POSITIONS {crystal}`.
    fn from_card_option(header: &str) -> Result<Option<Self>> {
        let option: String = header
            .split_whitespace()
            .skip(1)
            .collect::<String>()
            .trim_matches(|c: char| matches!(c, '{' | '}' | '(' | ')'))
            .to_lowercase();
        match option.as_str() {
            "" => Ok(None),
            "alat" => Ok(Some(Self::Alat)),
            "bohr" => Ok(Some(Self::Bohr)),
            "angstrom" => Ok(Some(Self::Angstrom)),
            "crystal" => Ok(Some(Self::Crystal)),
            other => bail!("Unsupported card option '{}' in '{}'", other, header),
        }
    }
}

/// Parses a Fortran real, accepting `d` exponents. Example: "1.5d-2" -> 0.015
fn parse_fortran_float(s: &str) -> Result<f64> {
    let clean = s.trim().trim_end_matches(',').replace(['d', 'D'], "e");
    clean.parse::<f64>().with_context(|| format!("Failed to parse '{}' as float", s))
}

/// Cuts a line at the first `!` or `#` that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (pos, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '!' | '#') => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// Splits a namelist line into `key = value` entries, ignoring commas inside quotes.
fn split_entries(line: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (pos, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, ',') => {
                entries.push(&line[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    entries.push(&line[start..]);
    entries.into_iter().map(str::trim).filter(|e| !e.is_empty()).collect()
}

fn parse_vec3(line: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        bail!("Expected three numbers, found '{}'", line);
    }
    Ok([
        parse_fortran_float(parts[0])?,
        parse_fortran_float(parts[1])?,
        parse_fortran_float(parts[2])?,
    ])
}

/// Namelist variables, keys lower-cased with blanks removed (`celldm (1)` -> `celldm(1)`).
#[derive(Debug, Default)]
struct Namelists {
    values: HashMap<String, String>,
}

impl Namelists {
    fn insert_line(&mut self, line: &str) -> Result<()> {
        for entry in split_entries(line) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Malformed namelist entry '{}'", entry))?;
            let key: String = key.split_whitespace().collect::<String>().to_lowercase();
            let value = value.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string();
            self.values.insert(key, value);
        }
        Ok(())
    }

    fn float(&self, key: &str) -> Result<Option<f64>> {
        self.values.get(key).map(|v| parse_fortran_float(v)).transpose()
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        self.values
            .get(key)
            .map(|v| v.parse::<i64>().with_context(|| format!("Failed to parse {} = '{}' as integer", key, v)))
            .transpose()
    }

    /// Lattice parameter in Å, from `celldm(1)` (Bohr) or `A` (Å).
    fn alat(&self) -> Result<Option<f64>> {
        match (self.float("celldm(1)")?, self.float("a")?) {
            (Some(_), Some(_)) => bail!("Both celldm(1) and A are set; use only one."),
            (Some(celldm), None) => Ok(Some(celldm * BOHR_TO_ANGSTROM)),
            (None, a) => Ok(a),
        }
    }

    /// c/a ratio for hexagonal cells, from `celldm(3)` or `C / A`.
    fn c_over_a(&self) -> Result<Option<f64>> {
        if let Some(ratio) = self.float("celldm(3)")? {
            return Ok(Some(ratio));
        }
        match (self.float("c")?, self.float("a")?) {
            (Some(c), Some(a)) => Ok(Some(c / a)),
            _ => Ok(None),
        }
    }
}

/// Lattice rows for the Bravais lattices pw.x builds from `ibrav`.
fn bravais_rows(ibrav: i64, alat: f64, c_over_a: Option<f64>) -> Result<[[f64; 3]; 3]> {
    let h = alat / 2.0;
    let rows = match ibrav {
        1 => [[alat, 0.0, 0.0], [0.0, alat, 0.0], [0.0, 0.0, alat]],
        2 => [[-h, 0.0, h], [0.0, h, h], [-h, h, 0.0]],
        3 => [[h, h, h], [-h, h, h], [-h, -h, h]],
        -3 => [[-h, h, h], [h, -h, h], [h, h, -h]],
        4 => {
            let ratio = c_over_a.context("ibrav = 4 requires celldm(3) or C")?;
            [
                [alat, 0.0, 0.0],
                [-h, alat * 3f64.sqrt() / 2.0, 0.0],
                [0.0, 0.0, alat * ratio],
            ]
        }
        other => bail!("Unsupported ibrav = {}; use ibrav = 0 with CELL_PARAMETERS.", other),
    };
    Ok(rows)
}

/// Reads a Quantum ESPRESSO pw.x input file into a Crystal.
pub fn from_pw_input(path: &Path) -> Result<Crystal> {
    let contents = fs::read_to_string(path).with_context(|| format!("Could not read pw.x input: {:?}", path))?;
    parse_pw_input(&contents).with_context(|| format!("Invalid pw.x input: {:?}", path))
}

/// Parses pw.x input text. Only the namelist variables and cards that define
/// the geometry are interpreted; everything else is skipped.
pub fn parse_pw_input(contents: &str) -> Result<Crystal> {
    let lines: Vec<&str> = contents
        .lines()
        .map(|l| strip_comment(l).trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut namelists = Namelists::default();
    let mut cell_card: Option<(Option<LengthUnit>, [[f64; 3]; 3])> = None;
    let mut position_card: Option<(Option<LengthUnit>, Vec<(String, [f64; 3])>)> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.starts_with('&') {
            i += 1;
            while i < lines.len() && !lines[i].starts_with('/') {
                namelists.insert_line(lines[i])?;
                i += 1;
            }
        } else {
            let keyword = line.split_whitespace().next().unwrap_or("").to_uppercase();
            match keyword.as_str() {
                "CELL_PARAMETERS" => {
                    let unit = LengthUnit::from_card_option(line)?;
                    if i + 3 >= lines.len() {
                        bail!("CELL_PARAMETERS needs three lattice vectors.");
                    }
                    let rows = [
                        parse_vec3(lines[i + 1])?,
                        parse_vec3(lines[i + 2])?,
                        parse_vec3(lines[i + 3])?,
                    ];
                    cell_card = Some((unit, rows));
                    i += 3;
                }
                "ATOMIC_POSITIONS" => {
                    let unit = LengthUnit::from_card_option(line)?;
                    let nat = namelists.int("nat")?.context("Missing 'nat' in &SYSTEM")?;
                    let nat = usize::try_from(nat).map_err(|_| anyhow!("Invalid nat = {}", nat))?;

                    let mut sites = Vec::with_capacity(nat);
                    for k in 1..=nat {
                        let site_line = lines
                            .get(i + k)
                            .with_context(|| format!("ATOMIC_POSITIONS has fewer than nat = {} lines", nat))?;
                        // Trailing if_pos flags are ignored.
                        let (label, rest) = site_line
                            .split_once(char::is_whitespace)
                            .ok_or_else(|| anyhow!("Malformed atomic position '{}'", site_line))?;
                        sites.push((label.to_string(), parse_vec3(rest)?));
                    }
                    position_card = Some((unit, sites));
                    i += nat;
                }
                _ => {}
            }
        }
        i += 1;
    }

    // Lattice
    let ibrav = namelists.int("ibrav")?.context("Missing 'ibrav' in &SYSTEM")?;
    let mut alat = namelists.alat()?;

    let rows = if ibrav == 0 {
        let (unit, raw) = cell_card.context("ibrav = 0 requires a CELL_PARAMETERS card")?;
        let scale = match (unit, alat) {
            (Some(LengthUnit::Angstrom), _) => 1.0,
            (Some(LengthUnit::Bohr), _) | (None, None) => BOHR_TO_ANGSTROM,
            (Some(LengthUnit::Alat), Some(a)) | (None, Some(a)) => a,
            (Some(LengthUnit::Alat), None) => bail!("CELL_PARAMETERS alat requires celldm(1) or A"),
            (Some(LengthUnit::Crystal), _) => bail!("CELL_PARAMETERS does not accept 'crystal' units"),
        };
        let rows = raw.map(|r| r.map(|x| x * scale));
        if alat.is_none() {
            alat = Some(Vector3::from(rows[0]).norm());
        }
        rows
    } else {
        let a = alat.context("ibrav != 0 requires celldm(1) or A")?;
        bravais_rows(ibrav, a, namelists.c_over_a()?)?
    };

    let lattice = Lattice::from_rows(rows)?;
    debug!(
        "ibrav = {}, alat = {:.6} Å, volume = {:.4} Å^3",
        ibrav,
        alat.unwrap_or_default(),
        lattice.volume()
    );

    // Atoms
    let (unit, sites) = position_card.context("Missing ATOMIC_POSITIONS card")?;
    let unit = unit.unwrap_or(LengthUnit::Alat);

    let mut atoms = Vec::with_capacity(sites.len());
    for (label, coords) in sites {
        let element = label_to_symbol(&label).with_context(|| format!("Unknown species label '{}'", label))?;
        let v = Vector3::from(coords);
        let fractional_coords = match unit {
            LengthUnit::Crystal => v,
            LengthUnit::Angstrom => lattice.to_fractional(&v),
            LengthUnit::Bohr => lattice.to_fractional(&(v * BOHR_TO_ANGSTROM)),
            LengthUnit::Alat => {
                let a = alat.context("ATOMIC_POSITIONS alat requires a lattice parameter")?;
                lattice.to_fractional(&(v * a))
            }
        };
        atoms.push(Atom { element, fractional_coords });
    }

    Ok(Crystal::new(lattice, atoms)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn explicit_cell_in_angstrom() {
        let input = "\
&CONTROL
  calculation = 'scf', prefix = 'nio'
/
&SYSTEM
  ibrav = 0, nat = 2, ntyp = 2
  ecutwfc = 4.0d1
/
ATOMIC_SPECIES
Ni1 58.69 Ni.upf
O   16.00 O.upf
CELL_PARAMETERS angstrom
  4.17 0.0 0.0
  0.0 4.17 0.0
  0.0 0.0 4.17
ATOMIC_POSITIONS {crystal}
Ni1 0.0 0.0 0.0
O   0.5 0.5 0.5  0 0 0
K_POINTS automatic
4 4 4 0 0 0
";
        let crystal = parse_pw_input(input).unwrap();
        assert_eq!(crystal.symbols(), vec!["Ni", "O"]);
        assert!((crystal.lattice.matrix[(0, 0)] - 4.17).abs() < TOL);
        assert!((crystal.atoms[1].fractional_coords - Vector3::new(0.5, 0.5, 0.5)).norm() < TOL);
    }

    #[test]
    fn fcc_from_ibrav_with_alat_positions() {
        let input = "\
&system
  ibrav = 2, celldm(1) = 6.8d0, nat = 1, ntyp = 1
/
ATOMIC_POSITIONS
Cu 0.0 0.0 0.0
";
        let crystal = parse_pw_input(input).unwrap();
        let a = 6.8 * BOHR_TO_ANGSTROM;
        let a1 = crystal.lattice.matrix.column(0);
        assert!((a1 - Vector3::new(-a / 2.0, 0.0, a / 2.0)).norm() < TOL);
        assert!((a1.norm() - a / 2f64.sqrt()).abs() < TOL);
        assert!(crystal.atoms[0].fractional_coords.norm() < TOL);
    }

    #[test]
    fn cartesian_positions_become_fractional() {
        let input = "\
&SYSTEM
  ibrav = 1, A = 3.0, nat = 2, ntyp = 1 ! simple cubic
/
ATOMIC_POSITIONS angstrom
Po 0.0 0.0 0.0
Po 1.5 0.75 0.0
";
        let crystal = parse_pw_input(input).unwrap();
        assert!((crystal.atoms[1].fractional_coords - Vector3::new(0.5, 0.25, 0.0)).norm() < TOL);
    }

    #[test]
    fn cell_without_unit_uses_alat() {
        let input = "\
&SYSTEM
  ibrav = 0, celldm(1) = 2.0, nat = 1
/
CELL_PARAMETERS
  1.0 0.0 0.0
  0.0 1.0 0.0
  0.0 0.0 2.0
ATOMIC_POSITIONS bohr
H 1.0 0.0 0.0
";
        let crystal = parse_pw_input(input).unwrap();
        let a = 2.0 * BOHR_TO_ANGSTROM;
        assert!((crystal.lattice.matrix[(2, 2)] - 2.0 * a).abs() < TOL);
        assert!((crystal.atoms[0].fractional_coords - Vector3::new(0.5, 0.0, 0.0)).norm() < TOL);
    }

    #[test]
    fn hexagonal_needs_c_over_a() {
        let missing = "&SYSTEM\n ibrav = 4, A = 2.5, nat = 1\n/\nATOMIC_POSITIONS crystal\nC 0 0 0\n";
        assert!(parse_pw_input(missing).is_err());

        let ok = "&SYSTEM\n ibrav = 4, A = 2.5, C = 6.7, nat = 1\n/\nATOMIC_POSITIONS crystal\nC 0 0 0\n";
        let crystal = parse_pw_input(ok).unwrap();
        assert!((crystal.lattice.matrix.column(2).norm() - 6.7).abs() < TOL);
        assert!((crystal.lattice.matrix.column(1).norm() - 2.5).abs() < TOL);
    }

    #[test]
    fn rejects_inconsistent_input() {
        let short = "&SYSTEM\n ibrav = 1, A = 3.0, nat = 2\n/\nATOMIC_POSITIONS crystal\nNa 0 0 0\n";
        assert!(parse_pw_input(short).is_err());

        let no_cell = "&SYSTEM\n ibrav = 0, nat = 1\n/\nATOMIC_POSITIONS crystal\nNa 0 0 0\n";
        assert!(parse_pw_input(no_cell).is_err());

        let bad_label = "&SYSTEM\n ibrav = 1, A = 3.0, nat = 1\n/\nATOMIC_POSITIONS crystal\nQq 0 0 0\n";
        assert!(parse_pw_input(bad_label).is_err());

        let flat = "&SYSTEM\n ibrav = 0, nat = 1\n/\nCELL_PARAMETERS angstrom\n1 0 0\n2 0 0\n0 0 1\nATOMIC_POSITIONS crystal\nNa 0 0 0\n";
        assert!(parse_pw_input(flat).is_err());
    }

    #[test]
    fn bcc_conventions() {
        let a = 3.0;
        let h = a / 2.0;
        let rows = bravais_rows(3, a, None).unwrap();
        assert_eq!(rows, [[h, h, h], [-h, h, h], [-h, -h, h]]);
        let rows = bravais_rows(-3, a, None).unwrap();
        assert_eq!(rows, [[-h, h, h], [h, -h, h], [h, h, -h]]);

        let input = "&SYSTEM\n ibrav = 3, A = 3.0, nat = 1\n/\nATOMIC_POSITIONS crystal\nFe 0 0 0\n";
        let crystal = parse_pw_input(input).unwrap();
        assert!((crystal.lattice.matrix.column(0) - Vector3::new(h, h, h)).norm() < TOL);
        assert!((crystal.lattice.matrix.column(2) - Vector3::new(-h, -h, h)).norm() < TOL);
        // Two atoms per conventional cube.
        assert!((crystal.lattice.volume() - a.powi(3) / 2.0).abs() < TOL);

        let input = "&SYSTEM\n ibrav = -3, A = 3.0, nat = 1\n/\nATOMIC_POSITIONS crystal\nFe 0 0 0\n";
        let crystal = parse_pw_input(input).unwrap();
        assert!((crystal.lattice.matrix.column(1) - Vector3::new(h, -h, h)).norm() < TOL);
        assert!((crystal.lattice.volume() - a.powi(3) / 2.0).abs() < TOL);
    }

    #[test]
    fn cell_in_bohr_is_scaled_to_angstrom() {
        let input = "\
&SYSTEM
  ibrav = 0, nat = 1
/
CELL_PARAMETERS bohr
  8.0 0.0 0.0
  0.0 8.0 0.0
  0.0 0.0 10.0
ATOMIC_POSITIONS angstrom
Mn 0.0 0.0 0.0
";
        let crystal = parse_pw_input(input).unwrap();
        assert!((crystal.lattice.matrix[(0, 0)] - 8.0 * BOHR_TO_ANGSTROM).abs() < TOL);
        assert!((crystal.lattice.matrix[(2, 2)] - 10.0 * BOHR_TO_ANGSTROM).abs() < TOL);
        assert!(crystal.lattice.matrix[(1, 0)].abs() < TOL);
    }

    #[test]
    fn comment_markers_inside_quotes_are_kept() {
        assert_eq!(strip_comment("title = 'NiO #1' ! run"), "title = 'NiO #1' ");
        assert_eq!(strip_comment("prefix = \"a!b\""), "prefix = \"a!b\"");
        assert_eq!(strip_comment("nat = 2 # atoms"), "nat = 2 ");

        let input = "\
&CONTROL
  title = 'NiO #1', prefix = 'x!y'
/
&SYSTEM
  ibrav = 1, A = 4.0, nat = 1
/
ATOMIC_POSITIONS crystal
Ni 0 0 0
";
        assert_eq!(parse_pw_input(input).unwrap().symbols(), vec!["Ni"]);
    }

    #[test]
    fn namelist_entries_respect_quotes() {
        assert_eq!(split_entries("title = 'a, b', nat = 2"), vec!["title = 'a, b'", "nat = 2"]);
        assert_eq!(parse_fortran_float("1.5d-2").unwrap(), 0.015);
    }
}
