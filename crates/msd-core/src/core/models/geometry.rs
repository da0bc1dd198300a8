use super::lattice::Lattice;
use super::molecule::{MoleculeGraph, MoleculeType};
use super::parameters::Parameters;
use crate::core::utils::vector::Vector;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Lattice dimensions must be positive, got {width}x{height}x{depth}")]
    EmptyDimension {
        width: usize,
        height: usize,
        depth: usize,
    },
    #[error("A {width}x{height}x{depth} lattice has more sites than can be stored")]
    TooLarge {
        width: usize,
        height: usize,
        depth: usize,
    },
    #[error("The {axis} span must be at least one site long")]
    EmptySpan { axis: &'static str },
    #[error("The {axis} length {length} disagrees with bounds [{low}, {high}]")]
    LengthMismatch {
        axis: &'static str,
        length: usize,
        low: usize,
        high: usize,
    },
    #[error("Conflicting values for {name}: {first} and {second}")]
    ConflictingValues {
        name: &'static str,
        first: usize,
        second: usize,
    },
    #[error("The {axis} bounds must be given together, or implied by a length")]
    Underspecified { axis: &'static str },
    #[error("The {axis} span [{low}, {high}] does not fit in an extent of {extent}")]
    OutOfRange {
        axis: &'static str,
        low: i64,
        high: i64,
        extent: usize,
    },
    #[error("Only one of an explicit molecule and a molecule type may be given")]
    ConflictingMolecule,
    #[error("The molecule has {nodes} nodes but the molecule length is {length}")]
    MoleculeLengthMismatch { nodes: usize, length: usize },
}

const MOLECULE_AXIS: &str = "molecule";
const LEFT_AXIS: &str = "left lead";
const RIGHT_AXIS: &str = "right lead";

// Largest site count whose spin array is still addressable.
const MAX_SITES: usize = isize::MAX as usize / std::mem::size_of::<Vector>();

/// The part of the lattice a site belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Left,
    Right,
    Molecule,
    Spacer,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Left => "left lead",
            Region::Right => "right lead",
            Region::Molecule => "molecule",
            Region::Spacer => "spacer",
        };
        write!(f, "{}", name)
    }
}

/// Resolved region boundaries of a lattice. All bounds are inclusive.
///
/// The molecule spans `[mol_pos_l, mol_pos_r]` along x. The left lead fills
/// `x < mol_pos_l` for rows `top_l..=bottom_l`, the right lead fills
/// `x > mol_pos_r` for layers `front_r..=back_r`. Molecule instances sit on
/// the perimeter rows of the `[top_l, bottom_l] x [front_r, back_r]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub mol_pos_l: usize,
    pub mol_pos_r: usize,
    pub top_l: usize,
    pub bottom_l: usize,
    pub front_r: usize,
    pub back_r: usize,
}

impl Geometry {
    /// Saturates for hand-built geometries; resolved ones never exceed the storable site count.
    pub fn site_count(&self) -> usize {
        self.width
            .saturating_mul(self.height)
            .saturating_mul(self.depth)
    }

    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.width * (y + self.height * z)
    }

    pub fn coordinates(&self, index: usize) -> [usize; 3] {
        let x = index % self.width;
        let y = index % (self.width * self.height) / self.width;
        let z = index / (self.width * self.height);
        [x, y, z]
    }

    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.width && y < self.height && z < self.depth
    }

    pub fn molecule_length(&self) -> usize {
        self.mol_pos_r + 1 - self.mol_pos_l
    }

    pub fn left_exists(&self) -> bool {
        self.mol_pos_l > 0
    }

    pub fn right_exists(&self) -> bool {
        self.mol_pos_r + 1 < self.width
    }

    /// Whether row `(y, z)` carries a molecule instance.
    pub fn is_molecule_row(&self, y: usize, z: usize) -> bool {
        let in_rows = (self.top_l..=self.bottom_l).contains(&y);
        let in_layers = (self.front_r..=self.back_r).contains(&z);
        ((y == self.top_l || y == self.bottom_l) && in_layers)
            || ((z == self.front_r || z == self.back_r) && in_rows)
    }

    pub fn region(&self, x: usize, y: usize, z: usize) -> Region {
        if x < self.mol_pos_l {
            if (self.top_l..=self.bottom_l).contains(&y) {
                Region::Left
            } else {
                Region::Spacer
            }
        } else if x > self.mol_pos_r {
            if (self.front_r..=self.back_r).contains(&z) {
                Region::Right
            } else {
                Region::Spacer
            }
        } else if self.is_molecule_row(y, z) {
            Region::Molecule
        } else {
            Region::Spacer
        }
    }
}

/// Collects the partially specified placement of a lattice and resolves it.
///
/// Every axis pair (molecule span along x, left lead along y, right lead
/// along z) accepts any consistent subset of its two bounds and its length.
#[derive(Debug, Clone, Default)]
pub struct LatticeBuilder {
    width: usize,
    height: usize,
    depth: usize,
    mol_pos_l: Option<usize>,
    mol_pos_r: Option<usize>,
    mol_pos: Option<usize>,
    mol_len: Option<usize>,
    top_l: Option<usize>,
    bottom_l: Option<usize>,
    height_l: Option<usize>,
    front_r: Option<usize>,
    back_r: Option<usize>,
    depth_r: Option<usize>,
    molecule: Option<MoleculeGraph>,
    molecule_type: Option<MoleculeType>,
    parameters: Option<Parameters>,
}

impl LatticeBuilder {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
            ..Self::default()
        }
    }

    pub fn mol_pos_l(mut self, x: usize) -> Self {
        self.mol_pos_l = Some(x);
        self
    }
    pub fn mol_pos_r(mut self, x: usize) -> Self {
        self.mol_pos_r = Some(x);
        self
    }
    /// Shorthand for a one-column molecule, setting both bounds.
    pub fn mol_pos(mut self, x: usize) -> Self {
        self.mol_pos = Some(x);
        self
    }
    pub fn mol_len(mut self, length: usize) -> Self {
        self.mol_len = Some(length);
        self
    }
    pub fn top_l(mut self, y: usize) -> Self {
        self.top_l = Some(y);
        self
    }
    pub fn bottom_l(mut self, y: usize) -> Self {
        self.bottom_l = Some(y);
        self
    }
    pub fn height_l(mut self, rows: usize) -> Self {
        self.height_l = Some(rows);
        self
    }
    pub fn front_r(mut self, z: usize) -> Self {
        self.front_r = Some(z);
        self
    }
    pub fn back_r(mut self, z: usize) -> Self {
        self.back_r = Some(z);
        self
    }
    pub fn depth_r(mut self, layers: usize) -> Self {
        self.depth_r = Some(layers);
        self
    }
    pub fn molecule(mut self, molecule: MoleculeGraph) -> Self {
        self.molecule = Some(molecule);
        self
    }
    pub fn molecule_type(mut self, molecule_type: MoleculeType) -> Self {
        self.molecule_type = Some(molecule_type);
        self
    }
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Resolves every boundary without building the lattice.
    pub fn resolve(&self) -> Result<Geometry, ConfigurationError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(ConfigurationError::EmptyDimension {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        let sites = self
            .width
            .checked_mul(self.height)
            .and_then(|area| area.checked_mul(self.depth));
        if !sites.is_some_and(|sites| sites <= MAX_SITES) {
            return Err(ConfigurationError::TooLarge {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        if self.molecule.is_some() && self.molecule_type.is_some() {
            return Err(ConfigurationError::ConflictingMolecule);
        }

        let mut mol_len = self.mol_len;
        if let Some(molecule) = &self.molecule {
            let nodes = molecule.node_count();
            match mol_len {
                Some(length) if length != nodes => {
                    return Err(ConfigurationError::MoleculeLengthMismatch { nodes, length });
                }
                _ => mol_len = Some(nodes),
            }
        }

        let mol_pos_l = merge_shorthand("molPosL", self.mol_pos_l, self.mol_pos)?;
        let mol_pos_r = merge_shorthand("molPosR", self.mol_pos_r, self.mol_pos)?;
        let (mol_l, mol_r) = resolve_span(MOLECULE_AXIS, self.width, mol_pos_l, mol_pos_r, mol_len)?;
        let (mol_l, mol_r) = match (mol_l, mol_r) {
            (Some(l), Some(r)) => (l, r),
            (None, None) => {
                let center = (self.width as i64 - 1) / 2;
                (center, center)
            }
            _ => return Err(ConfigurationError::Underspecified { axis: MOLECULE_AXIS }),
        };

        let (top, bottom) = resolve_span(LEFT_AXIS, self.height, self.top_l, self.bottom_l, self.height_l)?;
        let (front, back) = resolve_span(RIGHT_AXIS, self.depth, self.front_r, self.back_r, self.depth_r)?;

        let (mol_pos_l, mol_pos_r) = check_span(MOLECULE_AXIS, self.width, mol_l, mol_r)?;
        let (top_l, bottom_l) = check_span(
            LEFT_AXIS,
            self.height,
            top.unwrap_or(0),
            bottom.unwrap_or(self.height as i64 - 1),
        )?;
        let (front_r, back_r) = check_span(
            RIGHT_AXIS,
            self.depth,
            front.unwrap_or(0),
            back.unwrap_or(self.depth as i64 - 1),
        )?;

        Ok(Geometry {
            width: self.width,
            height: self.height,
            depth: self.depth,
            mol_pos_l,
            mol_pos_r,
            top_l,
            bottom_l,
            front_r,
            back_r,
        })
    }

    /// Resolves the geometry and builds the lattice.
    ///
    /// Without an explicit molecule or molecule type, a linear molecule
    /// spanning the resolved molecule columns is used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the placement is contradictory or incomplete.
    pub fn build(self) -> Result<Lattice, ConfigurationError> {
        let geometry = self.resolve()?;
        let length = geometry.molecule_length();
        let molecule = match (self.molecule, self.molecule_type) {
            (Some(molecule), _) => molecule,
            (None, Some(molecule_type)) => molecule_type.build(length),
            (None, None) => MoleculeType::Linear.build(length),
        };
        Ok(Lattice::new(
            geometry,
            molecule,
            self.parameters.unwrap_or_default(),
        ))
    }
}

fn merge_shorthand(
    name: &'static str,
    explicit: Option<usize>,
    shorthand: Option<usize>,
) -> Result<Option<usize>, ConfigurationError> {
    match (explicit, shorthand) {
        (Some(first), Some(second)) if first != second => Err(ConfigurationError::ConflictingValues {
            name,
            first,
            second,
        }),
        (Some(value), _) | (None, Some(value)) => Ok(Some(value)),
        (None, None) => Ok(None),
    }
}

// Applies the length rules; bounds stay `None` where neither rule nor input sets them.
// Values beyond `i64::MAX` saturate and are rejected later by `check_span`.
fn resolve_span(
    axis: &'static str,
    extent: usize,
    low: Option<usize>,
    high: Option<usize>,
    length: Option<usize>,
) -> Result<(Option<i64>, Option<i64>), ConfigurationError> {
    let (low, high) = (low.map(saturate), high.map(saturate));
    let Some(length) = length else {
        return Ok((low, high));
    };
    if length == 0 {
        return Err(ConfigurationError::EmptySpan { axis });
    }
    let Ok(n) = i64::try_from(length) else {
        return Err(ConfigurationError::OutOfRange {
            axis,
            low: low.unwrap_or(0),
            high: i64::MAX,
            extent,
        });
    };
    match (low, high) {
        (Some(l), Some(h)) => {
            if h.checked_sub(l).and_then(|d| d.checked_add(1)) != Some(n) {
                return Err(ConfigurationError::LengthMismatch {
                    axis,
                    length,
                    low: l as usize,
                    high: h as usize,
                });
            }
            Ok((Some(l), Some(h)))
        }
        (Some(l), None) => Ok((Some(l), Some(l.saturating_add(n - 1)))),
        (None, Some(h)) => Ok((Some(h - (n - 1)), Some(h))),
        (None, None) => {
            let l = (saturate(extent) - n).max(0) / 2;
            Ok((Some(l), Some(l + n - 1)))
        }
    }
}

fn saturate(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn check_span(
    axis: &'static str,
    extent: usize,
    low: i64,
    high: i64,
) -> Result<(usize, usize), ConfigurationError> {
    if low < 0 || high < low || high >= saturate(extent) {
        return Err(ConfigurationError::OutOfRange {
            axis,
            low,
            high,
            extent,
        });
    }
    Ok((low as usize, high as usize))
}
