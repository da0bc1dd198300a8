//! # Hamiltonian
//!
//! Energy terms of the spin lattice.
//!
//! ## Overview
//!
//! Every site carries a local moment `m = s + f` (spin plus flux). The total
//! energy is the sum of an onsite term per site and a pair term per coupled
//! pair of sites:
//!
//! ```text
//! onsite = -(B.m + A.(mx^2, my^2, mz^2) + Je0 s.f)
//! pair   = -(J s.s' + Je1 (s.f' + f.s') + Jee f.f' + b (m.m')^2 + D.(m x m'))
//! ```
//!
//! Coefficients depend on where the sites live: inside a lead, on a molecule
//! bond, between a molecule lead node and a ferromagnet, or directly between
//! the two ferromagnets. Energies are bucketed the same way so that
//! [`Results`] can report them per region.
//!
//! ## Architecture
//!
//! - [`for_each_coupling`] enumerates the partners of one site.
//! - [`evaluate`] sums every term once to produce fresh [`Results`].
//! - [`local_energy`] sums every term touching one site, which is all a single
//!   site update needs to compute its energy change.

use crate::core::models::geometry::{Geometry, Region};
use crate::core::models::lattice::Lattice;
use crate::core::models::molecule::MoleculeGraph;
use crate::core::models::parameters::{Parameters, Results};
use crate::core::utils::vector::{self, Vector};
use std::ops::{AddAssign, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CouplingKind {
    Left,
    Right,
    Molecule { edge: usize },
    MoleculeLeft,
    MoleculeRight,
    LeftRight,
}

/// A pair interaction as seen from one of its two sites.
///
/// The Dzyaloshinskii term is evaluated as `D.(sign * m_site x m_neighbor)`,
/// which keeps it antisymmetric when seen from the other end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling {
    pub neighbor: usize,
    pub kind: CouplingKind,
    pub sign: f64,
}

impl Coupling {
    fn between(site: usize, neighbor: usize, kind: CouplingKind) -> Self {
        Self {
            neighbor,
            kind,
            sign: if site < neighbor { 1.0 } else { -1.0 },
        }
    }

    // Each pair is counted once, from the end that sees a positive sign.
    fn is_primary(&self) -> bool {
        self.sign > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondCoefficients {
    pub j: f64,
    pub je1: f64,
    pub jee: f64,
    pub b: f64,
    pub d: Vector,
}

/// Energies grouped the way [`Results`] reports them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Energies {
    pub ul: f64,
    pub ur: f64,
    pub um: f64,
    pub uml: f64,
    pub umr: f64,
    pub ulr: f64,
}

impl Energies {
    pub fn total(&self) -> f64 {
        self.ul + self.ur + self.um + self.uml + self.umr + self.ulr
    }

    fn region_mut(&mut self, region: Region) -> Option<&mut f64> {
        match region {
            Region::Left => Some(&mut self.ul),
            Region::Right => Some(&mut self.ur),
            Region::Molecule => Some(&mut self.um),
            Region::Spacer => None,
        }
    }

    fn coupling_mut(&mut self, kind: CouplingKind) -> &mut f64 {
        match kind {
            CouplingKind::Left => &mut self.ul,
            CouplingKind::Right => &mut self.ur,
            CouplingKind::Molecule { .. } => &mut self.um,
            CouplingKind::MoleculeLeft => &mut self.uml,
            CouplingKind::MoleculeRight => &mut self.umr,
            CouplingKind::LeftRight => &mut self.ulr,
        }
    }
}

impl Sub for Energies {
    type Output = Energies;

    fn sub(self, rhs: Energies) -> Energies {
        Energies {
            ul: self.ul - rhs.ul,
            ur: self.ur - rhs.ur,
            um: self.um - rhs.um,
            uml: self.uml - rhs.uml,
            umr: self.umr - rhs.umr,
            ulr: self.ulr - rhs.ulr,
        }
    }
}

impl AddAssign for Energies {
    fn add_assign(&mut self, rhs: Energies) {
        self.ul += rhs.ul;
        self.ur += rhs.ur;
        self.um += rhs.um;
        self.uml += rhs.uml;
        self.umr += rhs.umr;
        self.ulr += rhs.ulr;
    }
}

/// Calls `visit` once for every coupling of `site`.
///
/// Lead sites couple to their nearest neighbours inside the same lead. The
/// lead column touching the molecule also couples to the lead node of the
/// molecule instance on its row and, across the molecule, to the other lead.
/// Molecule sites couple along the molecule's edges (self-loops are ignored)
/// and, for lead nodes, to the adjacent ferromagnet.
pub fn for_each_coupling<F>(geometry: &Geometry, molecule: &MoleculeGraph, site: usize, mut visit: F)
where
    F: FnMut(Coupling),
{
    let g = geometry;
    let [x, y, z] = g.coordinates(site);
    let length = g.molecule_length();
    let mut lattice_bond = |nx: usize, ny: usize, nz: usize, kind: CouplingKind| {
        visit(Coupling::between(site, g.index(nx, ny, nz), kind))
    };

    match g.region(x, y, z) {
        Region::Left => {
            let kind = CouplingKind::Left;
            if x > 0 {
                lattice_bond(x - 1, y, z, kind);
            }
            if x + 1 < g.mol_pos_l {
                lattice_bond(x + 1, y, z, kind);
            }
            if y > g.top_l {
                lattice_bond(x, y - 1, z, kind);
            }
            if y < g.bottom_l {
                lattice_bond(x, y + 1, z, kind);
            }
            if z > 0 {
                lattice_bond(x, y, z - 1, kind);
            }
            if z + 1 < g.depth {
                lattice_bond(x, y, z + 1, kind);
            }
            if x + 1 == g.mol_pos_l {
                if g.is_molecule_row(y, z) && molecule.left_lead() < length {
                    lattice_bond(g.mol_pos_l + molecule.left_lead(), y, z, CouplingKind::MoleculeLeft);
                }
                if g.right_exists() && (g.front_r..=g.back_r).contains(&z) {
                    lattice_bond(g.mol_pos_r + 1, y, z, CouplingKind::LeftRight);
                }
            }
        }
        Region::Right => {
            let kind = CouplingKind::Right;
            if x > g.mol_pos_r + 1 {
                lattice_bond(x - 1, y, z, kind);
            }
            if x + 1 < g.width {
                lattice_bond(x + 1, y, z, kind);
            }
            if y > 0 {
                lattice_bond(x, y - 1, z, kind);
            }
            if y + 1 < g.height {
                lattice_bond(x, y + 1, z, kind);
            }
            if z > g.front_r {
                lattice_bond(x, y, z - 1, kind);
            }
            if z < g.back_r {
                lattice_bond(x, y, z + 1, kind);
            }
            if x == g.mol_pos_r + 1 {
                if g.is_molecule_row(y, z) && molecule.right_lead() < length {
                    lattice_bond(g.mol_pos_l + molecule.right_lead(), y, z, CouplingKind::MoleculeRight);
                }
                if g.left_exists() && (g.top_l..=g.bottom_l).contains(&y) {
                    lattice_bond(g.mol_pos_l - 1, y, z, CouplingKind::LeftRight);
                }
            }
        }
        Region::Molecule => {
            let node = x - g.mol_pos_l;
            for edge in molecule.outgoing(node) {
                if edge.destination == node || edge.destination >= length {
                    continue;
                }
                visit(Coupling {
                    neighbor: g.index(g.mol_pos_l + edge.destination, y, z),
                    kind: CouplingKind::Molecule {
                        edge: edge.identity,
                    },
                    sign: edge.direction,
                });
            }
            let mut lattice_bond = |nx: usize, kind: CouplingKind| {
                visit(Coupling::between(site, g.index(nx, y, z), kind))
            };
            if node == molecule.left_lead() && g.left_exists() {
                lattice_bond(g.mol_pos_l - 1, CouplingKind::MoleculeLeft);
            }
            if node == molecule.right_lead() && g.right_exists() {
                lattice_bond(g.mol_pos_r + 1, CouplingKind::MoleculeRight);
            }
        }
        Region::Spacer => {}
    }
}

pub fn bond_coefficients(
    kind: CouplingKind,
    p: &Parameters,
    molecule: &MoleculeGraph,
) -> BondCoefficients {
    let (j, je1, jee, b, d) = match kind {
        CouplingKind::Left => (p.jl, p.je1l, p.jeel, p.bl, p.dl),
        CouplingKind::Right => (p.jr, p.je1r, p.jeer, p.br, p.dr),
        CouplingKind::MoleculeLeft => (p.jml, p.je1ml, p.jeeml, p.bml, p.dml),
        CouplingKind::MoleculeRight => (p.jmr, p.je1mr, p.jeemr, p.bmr, p.dmr),
        CouplingKind::LeftRight => (p.jlr, p.je1lr, p.jeelr, p.blr, p.dlr),
        CouplingKind::Molecule { edge } => {
            let e = molecule
                .edge_parameter_records()
                .get(edge)
                .copied()
                .unwrap_or_default();
            (e.jm, e.je1m, e.jeem, e.bm, e.dm)
        }
    };
    BondCoefficients { j, je1, jee, b, d }
}

pub fn pair_energy(
    c: &BondCoefficients,
    spin: &Vector,
    flux: &Vector,
    other_spin: &Vector,
    other_flux: &Vector,
    sign: f64,
) -> f64 {
    let m = spin + flux;
    let other_m = other_spin + other_flux;
    let alignment = m.dot(&other_m);
    -(c.j * spin.dot(other_spin)
        + c.je1 * (spin.dot(other_flux) + flux.dot(other_spin))
        + c.jee * flux.dot(other_flux)
        + c.b * alignment * alignment
        + c.d.dot(&(m.cross(&other_m) * sign)))
}

pub fn onsite_energy(field: &Vector, anisotropy: &Vector, je0: f64, spin: &Vector, flux: &Vector) -> f64 {
    let m = spin + flux;
    -(field.dot(&m) + anisotropy.dot(&vector::squared(&m)) + je0 * spin.dot(flux))
}

fn site_onsite_energy(lattice: &Lattice, site: usize, spin: &Vector, flux: &Vector) -> f64 {
    let p = lattice.parameters();
    let (anisotropy, je0) = match lattice.region_of(site) {
        Region::Left => (p.al, p.je0l),
        Region::Right => (p.ar, p.je0r),
        Region::Molecule => {
            let node = lattice.node_of(site);
            let n = lattice
                .molecule()
                .node_parameters(node)
                .copied()
                .unwrap_or_default();
            (n.am, n.je0m)
        }
        Region::Spacer => return 0.0,
    };
    onsite_energy(&p.b, &anisotropy, je0, spin, flux)
}

/// Every energy term involving `site`, as if it held `spin` and `flux`.
pub fn local_energy(lattice: &Lattice, site: usize, spin: &Vector, flux: &Vector) -> Energies {
    let mut energies = Energies::default();
    let region = lattice.region_of(site);
    if let Some(bucket) = energies.region_mut(region) {
        *bucket += site_onsite_energy(lattice, site, spin, flux);
    }
    let parameters = lattice.parameters();
    let molecule = lattice.molecule();
    for_each_coupling(lattice.geometry(), molecule, site, |c| {
        let (other_spin, other_flux) = lattice.state(c.neighbor);
        let coefficients = bond_coefficients(c.kind, parameters, molecule);
        *energies.coupling_mut(c.kind) +=
            pair_energy(&coefficients, spin, flux, &other_spin, &other_flux, c.sign);
    });
    energies
}

/// Recomputes magnetizations and energies from scratch. `t` is left at 0.
pub fn evaluate(lattice: &Lattice) -> Results {
    let mut r = Results::default();
    let mut energies = Energies::default();
    let parameters = lattice.parameters();
    let molecule = lattice.molecule();

    for &site in lattice.site_indices() {
        let (spin, flux) = lattice.state(site);
        let region = lattice.region_of(site);
        match region {
            Region::Left => {
                r.msl += spin;
                r.mfl += flux;
            }
            Region::Right => {
                r.msr += spin;
                r.mfr += flux;
            }
            Region::Molecule => {
                r.msm += spin;
                r.mfm += flux;
            }
            Region::Spacer => continue,
        }
        if let Some(bucket) = energies.region_mut(region) {
            *bucket += site_onsite_energy(lattice, site, &spin, &flux);
        }
        for_each_coupling(lattice.geometry(), molecule, site, |c| {
            if !c.is_primary() {
                return;
            }
            let (other_spin, other_flux) = lattice.state(c.neighbor);
            let coefficients = bond_coefficients(c.kind, parameters, molecule);
            *energies.coupling_mut(c.kind) +=
                pair_energy(&coefficients, &spin, &flux, &other_spin, &other_flux, c.sign);
        });
    }

    r.ul = energies.ul;
    r.ur = energies.ur;
    r.um = energies.um;
    r.uml = energies.uml;
    r.umr = energies.umr;
    r.ulr = energies.ulr;
    r.refresh_totals();
    r
}
