use super::cursor::{BoundsError, Collection, Sequence};
use super::geometry::{Geometry, Region};
use super::molecule::{EdgeParameters, MoleculeGraph, NodeParameters};
use super::parameters::{Parameters, Record, Results};
use crate::core::hamiltonian::{self, Energies};
use crate::core::utils::vector::{self, Vector};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error("Coordinate ({x}, {y}, {z}) lies outside the lattice")]
    CoordinateOutOfBounds { x: usize, y: usize, z: usize },
    #[error("Site {index} is a spacer and holds no spin or flux")]
    InertSite { index: usize },
    #[error("Molecule must keep {expected} nodes, got {actual}")]
    MoleculeSizeChanged { expected: usize, actual: usize },
}

/// Number of sites per region and of boundary couplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SiteCounts {
    pub n: usize,
    pub n_l: usize,
    pub n_r: usize,
    pub n_m: usize,
    pub n_ml: usize,
    pub n_mr: usize,
    pub n_lr: usize,
}

/// A proposed replacement of one site's spin and flux, together with the
/// energy change it would cause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteUpdate {
    pub index: usize,
    pub spin: Vector,
    pub flux: Vector,
    pub delta: Energies,
}

impl SiteUpdate {
    pub fn energy_change(&self) -> f64 {
        self.delta.total()
    }
}

/// The state of one valid site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteView {
    pub index: usize,
    pub position: [usize; 3],
    pub region: Region,
    pub spin: Vector,
    pub flux: Vector,
    pub local_m: Vector,
}

/// A three-dimensional spin lattice: two ferromagnetic leads bridged by a
/// column of molecule instances.
///
/// Sites are addressed by a flat index `x + width * (y + height * z)`. Spacer
/// sites exist in the index space but carry no state and are never sampled.
/// Cached [`Results`] are kept current after every mutation; single-site
/// updates adjust them incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    geometry: Geometry,
    regions: Vec<Region>,
    sites: Vec<usize>,
    spins: Vec<Vector>,
    fluxes: Vec<Vector>,
    molecule: MoleculeGraph,
    parameters: Parameters,
    results: Results,
    record: Record,
    counts: SiteCounts,
}

impl Lattice {
    /// Creates a lattice with every spin pointing along +y at its region's
    /// magnitude and every flux zero.
    ///
    /// `molecule` must have one node per molecule column of `geometry`;
    /// [`LatticeBuilder`](super::geometry::LatticeBuilder) guarantees this,
    /// and also bounds the site count.
    pub(crate) fn new(geometry: Geometry, molecule: MoleculeGraph, parameters: Parameters) -> Self {
        let regions: Vec<Region> = (0..geometry.site_count())
            .map(|a| {
                let [x, y, z] = geometry.coordinates(a);
                geometry.region(x, y, z)
            })
            .collect();
        let sites: Vec<usize> = (0..regions.len())
            .filter(|&a| regions[a] != Region::Spacer)
            .collect();
        let site_count = regions.len();

        let mut lattice = Self {
            geometry,
            regions,
            sites,
            spins: vec![vector::ZERO; site_count],
            fluxes: vec![vector::ZERO; site_count],
            molecule,
            parameters,
            results: Results::default(),
            record: Record::new(),
            counts: SiteCounts::default(),
        };
        lattice.counts = lattice.count_sites();
        lattice.align_spins();
        lattice.recompute_results();
        debug!(
            width = geometry.width,
            height = geometry.height,
            depth = geometry.depth,
            sites = lattice.counts.n,
            "Constructed lattice."
        );
        lattice
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn molecule(&self) -> &MoleculeGraph {
        &self.molecule
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn results(&self) -> Results {
        self.results
    }

    pub fn counts(&self) -> SiteCounts {
        self.counts
    }

    /// Flat indices of every non-spacer site, ascending.
    pub fn site_indices(&self) -> &[usize] {
        &self.sites
    }

    pub fn sites(&self) -> Collection<Sites<'_>> {
        Collection::new(Sites { lattice: self })
    }

    pub fn region_of(&self, index: usize) -> Region {
        self.regions.get(index).copied().unwrap_or(Region::Spacer)
    }

    pub fn index_of(&self, x: usize, y: usize, z: usize) -> Result<usize, LatticeError> {
        if !self.geometry.contains(x, y, z) {
            return Err(LatticeError::CoordinateOutOfBounds { x, y, z });
        }
        Ok(self.geometry.index(x, y, z))
    }

    pub(crate) fn node_of(&self, index: usize) -> usize {
        self.geometry.coordinates(index)[0] - self.geometry.mol_pos_l
    }

    pub(crate) fn state(&self, index: usize) -> (Vector, Vector) {
        (self.spins[index], self.fluxes[index])
    }

    /// Spin magnitude of a site. Spacer sites have none.
    pub fn spin_magnitude(&self, index: usize) -> f64 {
        match self.region_of(index) {
            Region::Left => self.parameters.sl,
            Region::Right => self.parameters.sr,
            Region::Molecule => self.node_parameters_at(index).sm,
            Region::Spacer => 0.0,
        }
    }

    /// Largest flux magnitude a site may take.
    pub fn flux_bound(&self, index: usize) -> f64 {
        match self.region_of(index) {
            Region::Left => self.parameters.fl,
            Region::Right => self.parameters.fr,
            Region::Molecule => self.node_parameters_at(index).fm,
            Region::Spacer => 0.0,
        }
    }

    fn node_parameters_at(&self, index: usize) -> NodeParameters {
        self.molecule
            .node_parameters(self.node_of(index))
            .copied()
            .unwrap_or_default()
    }

    fn checked_index(&self, index: usize) -> Result<usize, LatticeError> {
        if index >= self.regions.len() {
            return Err(BoundsError::new(index as isize, self.regions.len()).into());
        }
        Ok(index)
    }

    fn checked_site(&self, index: usize) -> Result<usize, LatticeError> {
        let index = self.checked_index(index)?;
        if self.regions[index] == Region::Spacer {
            return Err(LatticeError::InertSite { index });
        }
        Ok(index)
    }

    // ---- site access -------------------------------------------------------

    pub fn spin_by_index(&self, index: usize) -> Result<Vector, LatticeError> {
        Ok(self.spins[self.checked_index(index)?])
    }

    pub fn flux_by_index(&self, index: usize) -> Result<Vector, LatticeError> {
        Ok(self.fluxes[self.checked_index(index)?])
    }

    pub fn local_m_by_index(&self, index: usize) -> Result<Vector, LatticeError> {
        let index = self.checked_index(index)?;
        Ok(self.spins[index] + self.fluxes[index])
    }

    pub fn spin(&self, x: usize, y: usize, z: usize) -> Result<Vector, LatticeError> {
        self.spin_by_index(self.index_of(x, y, z)?)
    }

    pub fn flux(&self, x: usize, y: usize, z: usize) -> Result<Vector, LatticeError> {
        self.flux_by_index(self.index_of(x, y, z)?)
    }

    pub fn local_m(&self, x: usize, y: usize, z: usize) -> Result<Vector, LatticeError> {
        self.local_m_by_index(self.index_of(x, y, z)?)
    }

    pub fn set_spin_by_index(&mut self, index: usize, spin: Vector) -> Result<(), LatticeError> {
        let index = self.checked_site(index)?;
        self.set_local_m_by_index(index, spin, self.fluxes[index])
    }

    pub fn set_flux_by_index(&mut self, index: usize, flux: Vector) -> Result<(), LatticeError> {
        let index = self.checked_site(index)?;
        self.set_local_m_by_index(index, self.spins[index], flux)
    }

    /// Replaces both vectors of a site and updates the cached results.
    ///
    /// # Errors
    ///
    /// Fails for indices outside the lattice and for spacer sites.
    pub fn set_local_m_by_index(&mut self, index: usize, spin: Vector, flux: Vector) -> Result<(), LatticeError> {
        let index = self.checked_site(index)?;
        let update = self.evaluate_update(index, spin, flux);
        self.apply_update(&update);
        Ok(())
    }

    pub fn set_spin(&mut self, x: usize, y: usize, z: usize, spin: Vector) -> Result<(), LatticeError> {
        self.set_spin_by_index(self.index_of(x, y, z)?, spin)
    }

    pub fn set_flux(&mut self, x: usize, y: usize, z: usize, flux: Vector) -> Result<(), LatticeError> {
        self.set_flux_by_index(self.index_of(x, y, z)?, flux)
    }

    pub fn set_local_m(&mut self, x: usize, y: usize, z: usize, spin: Vector, flux: Vector) -> Result<(), LatticeError> {
        self.set_local_m_by_index(self.index_of(x, y, z)?, spin, flux)
    }

    // ---- incremental updates -----------------------------------------------

    /// Energy change of replacing a valid site's state. Does not mutate.
    pub(crate) fn evaluate_update(&self, index: usize, spin: Vector, flux: Vector) -> SiteUpdate {
        let (old_spin, old_flux) = self.state(index);
        let before = hamiltonian::local_energy(self, index, &old_spin, &old_flux);
        let after = hamiltonian::local_energy(self, index, &spin, &flux);
        SiteUpdate {
            index,
            spin,
            flux,
            delta: after - before,
        }
    }

    pub(crate) fn apply_update(&mut self, update: &SiteUpdate) {
        let a = update.index;
        let ds = update.spin - self.spins[a];
        let df = update.flux - self.fluxes[a];
        let r = &mut self.results;
        match self.regions[a] {
            Region::Left => {
                r.msl += ds;
                r.mfl += df;
            }
            Region::Right => {
                r.msr += ds;
                r.mfr += df;
            }
            Region::Molecule => {
                r.msm += ds;
                r.mfm += df;
            }
            Region::Spacer => return,
        }
        r.ul += update.delta.ul;
        r.ur += update.delta.ur;
        r.um += update.delta.um;
        r.uml += update.delta.uml;
        r.umr += update.delta.umr;
        r.ulr += update.delta.ulr;
        r.refresh_totals();
        self.spins[a] = update.spin;
        self.fluxes[a] = update.flux;
    }

    // ---- parameters ----------------------------------------------------------

    /// Replaces the global parameters.
    ///
    /// Lead spins are rescaled when `SL`/`SR` change and lead fluxes are
    /// scaled by the ratio of the new to the old `FL`/`FR` (zeroed when the
    /// old bound was 0).
    pub fn set_parameters(&mut self, parameters: Parameters) {
        let old = std::mem::replace(&mut self.parameters, parameters);
        for i in 0..self.sites.len() {
            let a = self.sites[i];
            match self.regions[a] {
                Region::Left => self.rescale(a, parameters.sl, (old.fl, parameters.fl)),
                Region::Right => self.rescale(a, parameters.sr, (old.fr, parameters.fr)),
                _ => {}
            }
        }
        self.recompute_results();
    }

    pub fn set_temperature(&mut self, kt: f64) {
        self.parameters.kt = kt;
    }

    /// Changes the external field without a full recomputation.
    ///
    /// The field enters only through `-B.m`, so each region's energy shifts
    /// by `-(B_new - B_old).M_region`.
    pub fn set_field(&mut self, b: Vector) {
        let delta = b - self.parameters.b;
        self.parameters.b = b;
        let r = &mut self.results;
        r.ul -= delta.dot(&r.ml);
        r.ur -= delta.dot(&r.mr);
        r.um -= delta.dot(&r.mm);
        r.refresh_totals();
    }

    // Spins always end at the new magnitude, even when it is unchanged.
    fn rescale(&mut self, a: usize, new_s: f64, (old_f, new_f): (f64, f64)) {
        self.spins[a] = vector::with_magnitude(&self.spins[a], new_s);
        if new_f != old_f {
            self.fluxes[a] = if old_f == 0.0 {
                vector::ZERO
            } else {
                self.fluxes[a] * (new_f / old_f)
            };
        }
    }

    // ---- molecule --------------------------------------------------------------

    /// A copy of the molecule instantiated along the molecule columns.
    pub fn mol_proto(&self) -> MoleculeGraph {
        self.molecule.clone()
    }

    /// Replaces the molecule. Spins and fluxes of molecule sites are rescaled
    /// per node like [`Self::set_parameters`] does for the leads.
    ///
    /// # Errors
    ///
    /// The replacement must have the same number of nodes.
    pub fn set_mol_proto(&mut self, molecule: MoleculeGraph) -> Result<(), LatticeError> {
        if molecule.node_count() != self.molecule.node_count() {
            return Err(LatticeError::MoleculeSizeChanged {
                expected: self.molecule.node_count(),
                actual: molecule.node_count(),
            });
        }
        self.replace_molecule(molecule);
        Ok(())
    }

    /// Sets every node and every edge of the molecule to the same parameters.
    pub fn set_mol_parameters(&mut self, node: &NodeParameters, edge: &EdgeParameters) {
        let mut molecule = self.mol_proto();
        molecule.set_all_parameters(node, edge);
        self.replace_molecule(molecule);
    }

    fn replace_molecule(&mut self, molecule: MoleculeGraph) {
        let old: Vec<NodeParameters> = self.molecule.nodes().items().map(|n| *n.parameters).collect();
        let new: Vec<NodeParameters> = molecule.nodes().items().map(|n| *n.parameters).collect();
        for i in 0..self.sites.len() {
            let a = self.sites[i];
            if self.regions[a] != Region::Molecule {
                continue;
            }
            let node = self.node_of(a);
            if let (Some(o), Some(n)) = (old.get(node), new.get(node)) {
                self.rescale(a, n.sm, (o.fm, n.fm));
            }
        }
        self.molecule = molecule;
        self.recompute_results();
    }

    // ---- lifecycle -------------------------------------------------------------

    /// Restores the initial state: spins along +y, zero flux, `t = 0`, empty record.
    pub fn reinitialize(&mut self) {
        self.align_spins();
        self.record.clear();
        self.results.t = 0;
        self.recompute_results();
    }

    /// Draws every spin uniformly on its sphere and every flux with a uniform
    /// fraction of its bound and a uniform direction. Resets `t` and the record.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in 0..self.sites.len() {
            let a = self.sites[i];
            let spin = vector::random_on_sphere(rng, self.spin_magnitude(a));
            let flux_magnitude = self.flux_bound(a) * rng.gen_range(0.0..1.0);
            let flux = vector::random_on_sphere(rng, flux_magnitude);
            self.spins[a] = spin;
            self.fluxes[a] = flux;
        }
        self.record.clear();
        self.results.t = 0;
        self.recompute_results();
    }

    fn align_spins(&mut self) {
        for i in 0..self.sites.len() {
            let a = self.sites[i];
            self.spins[a] = vector::J * self.spin_magnitude(a);
            self.fluxes[a] = vector::ZERO;
        }
    }

    fn recompute_results(&mut self) {
        let t = self.results.t;
        self.results = hamiltonian::evaluate(self);
        self.results.t = t;
    }

    pub fn advance_time(&mut self, steps: u64) {
        self.results.t += steps;
    }

    // ---- record ------------------------------------------------------------------

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn set_record(&mut self, record: Record) {
        self.record = record;
    }

    pub fn clear_record(&mut self) {
        self.record.clear();
    }

    /// Appends the current results to the record.
    pub fn record_results(&mut self) {
        self.record.push(self.results);
    }

    fn count_sites(&self) -> SiteCounts {
        let mut counts = SiteCounts {
            n: self.sites.len(),
            ..SiteCounts::default()
        };
        for &a in &self.sites {
            match self.regions[a] {
                Region::Left => counts.n_l += 1,
                Region::Right => counts.n_r += 1,
                Region::Molecule => counts.n_m += 1,
                Region::Spacer => {}
            }
            hamiltonian::for_each_coupling(&self.geometry, &self.molecule, a, |c| {
                if c.neighbor < a {
                    return;
                }
                match c.kind {
                    hamiltonian::CouplingKind::MoleculeLeft => counts.n_ml += 1,
                    hamiltonian::CouplingKind::MoleculeRight => counts.n_mr += 1,
                    hamiltonian::CouplingKind::LeftRight => counts.n_lr += 1,
                    _ => {}
                }
            });
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct Sites<'l> {
    lattice: &'l Lattice,
}

impl Sequence for Sites<'_> {
    type Item<'a>
        = SiteView
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.lattice.sites.len()
    }

    fn element(&self, index: usize) -> SiteView {
        let lattice = self.lattice;
        let a = lattice.sites[index];
        let (spin, flux) = lattice.state(a);
        SiteView {
            index: a,
            position: lattice.geometry.coordinates(a),
            region: lattice.regions[a],
            spin,
            flux,
            local_m: spin + flux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::LatticeBuilder;
    use crate::core::models::molecule::MoleculeType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const EPS: f64 = 1e-9;

    fn lattice() -> Lattice {
        LatticeBuilder::new(6, 3, 3)
            .mol_pos_l(2)
            .mol_pos_r(3)
            .top_l(0)
            .bottom_l(1)
            .front_r(1)
            .back_r(2)
            .molecule_type(MoleculeType::Linear)
            .build()
            .unwrap()
    }

    fn assert_results_close(a: &Results, b: &Results) {
        assert!((a.u - b.u).abs() < EPS, "U {} != {}", a.u, b.u);
        for (x, y) in [(a.ul, b.ul), (a.ur, b.ur), (a.um, b.um), (a.uml, b.uml), (a.umr, b.umr), (a.ulr, b.ulr)] {
            assert!((x - y).abs() < EPS, "{x} != {y}");
        }
        assert!((a.m - b.m).norm() < EPS);
        assert!((a.ms - b.ms).norm() < EPS);
        assert!((a.mf - b.mf).norm() < EPS);
    }

    fn fresh(lattice: &Lattice) -> Results {
        let mut r = hamiltonian::evaluate(lattice);
        r.t = lattice.results().t;
        r
    }

    mod construction {
        use super::*;

        #[test]
        fn counts_sites_per_region() {
            let l = lattice();
            let c = l.counts();
            assert_eq!(c.n_l, 2 * 2 * 3);
            assert_eq!(c.n_r, 2 * 3 * 2);
            // rows: y in {0, 1} and z in {1, 2}, 2 nodes each.
            assert_eq!(c.n_m, 8);
            assert_eq!(c.n, c.n_l + c.n_r + c.n_m);
            assert_eq!(c.n_ml, 4);
            assert_eq!(c.n_mr, 4);
            // y in [0, 1] and z in [1, 2].
            assert_eq!(c.n_lr, 4);
        }

        #[test]
        fn initial_spins_point_along_y() {
            let l = lattice();
            for site in l.sites().items() {
                assert_eq!(site.spin, vector::J);
                assert_eq!(site.flux, vector::ZERO);
            }
            assert_eq!(l.results().t, 0);
        }

        #[test]
        fn spacer_sites_read_as_zero_and_reject_writes() {
            let mut l = lattice();
            let spacer = l.index_of(0, 2, 0).unwrap();
            assert_eq!(l.region_of(spacer), Region::Spacer);
            assert_eq!(l.spin_by_index(spacer).unwrap(), vector::ZERO);
            assert_eq!(
                l.set_spin_by_index(spacer, vector::I),
                Err(LatticeError::InertSite { index: spacer })
            );
        }

        #[test]
        fn out_of_range_access_fails() {
            let mut l = lattice();
            assert!(matches!(l.spin_by_index(1000), Err(LatticeError::Bounds(_))));
            assert_eq!(
                l.spin(6, 0, 0),
                Err(LatticeError::CoordinateOutOfBounds { x: 6, y: 0, z: 0 })
            );
            assert!(l.set_flux(0, 0, 3, vector::I).is_err());
        }
    }

    mod updates {
        use super::*;

        #[test]
        fn setters_keep_results_consistent() {
            let mut l = lattice();
            let mut p = *l.parameters();
            p.b = Vector::new(0.2, 0.1, -0.4);
            p.fl = 0.3;
            p.fr = 0.6;
            p.je0l = 0.5;
            p.dml = Vector::new(0.0, 0.0, 0.7);
            p.jlr = -0.2;
            l.set_parameters(p);

            l.set_spin(1, 0, 1, Vector::new(1.0, 0.0, 0.0)).unwrap();
            l.set_flux(1, 0, 1, Vector::new(0.0, 0.3, 0.0)).unwrap();
            l.set_local_m(2, 0, 2, Vector::new(0.0, 0.0, -1.0), Vector::new(0.1, 0.0, 0.0))
                .unwrap();
            l.set_spin(4, 1, 2, Vector::new(0.0, -1.0, 0.0)).unwrap();
            assert_results_close(&l.results(), &fresh(&l));
        }

        #[test]
        fn field_fast_path_matches_recomputation() {
            let mut l = lattice();
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let mut p = *l.parameters();
            p.fl = 0.5;
            p.fr = 0.25;
            l.set_parameters(p);
            l.randomize(&mut rng);
            l.set_field(Vector::new(0.3, -0.2, 0.9));
            assert_results_close(&l.results(), &fresh(&l));
            assert_eq!(l.parameters().b, Vector::new(0.3, -0.2, 0.9));
        }

        #[test]
        fn temperature_does_not_touch_results() {
            let mut l = lattice();
            let before = l.results();
            l.set_temperature(2.0);
            assert_eq!(l.parameters().kt, 2.0);
            assert_eq!(l.results(), before);
        }

        #[test]
        fn parameters_rescale_lead_spins_and_fluxes() {
            let mut l = lattice();
            let mut p = *l.parameters();
            p.fl = 1.0;
            l.set_parameters(p);
            l.set_flux(0, 0, 0, Vector::new(0.0, 0.0, 0.5)).unwrap();

            p.sl = 2.0;
            p.fl = 2.0;
            l.set_parameters(p);
            assert_eq!(l.spin(0, 0, 0).unwrap(), Vector::new(0.0, 2.0, 0.0));
            assert_eq!(l.flux(0, 0, 0).unwrap(), Vector::new(0.0, 0.0, 1.0));

            p.fl = 0.0;
            l.set_parameters(p);
            assert_eq!(l.flux(0, 0, 0).unwrap(), vector::ZERO);
            assert_results_close(&l.results(), &fresh(&l));
        }

        #[test]
        fn unchanged_parameters_still_normalize_lead_spins() {
            let mut l = lattice();
            l.set_spin(0, 0, 0, Vector::new(0.0, 0.0, 5.0)).unwrap();
            l.set_spin(5, 2, 2, Vector::new(3.0, 4.0, 0.0)).unwrap();

            let p = *l.parameters();
            l.set_parameters(p);
            assert!((l.spin(0, 0, 0).unwrap() - vector::K).norm() < EPS);
            assert!((l.spin(5, 2, 2).unwrap() - Vector::new(0.6, 0.8, 0.0)).norm() < EPS);
            assert_results_close(&l.results(), &fresh(&l));
        }
    }

    mod molecule {
        use super::*;

        #[test]
        fn mol_proto_must_keep_its_size() {
            let mut l = lattice();
            assert_eq!(
                l.set_mol_proto(MoleculeType::Linear.build(3)),
                Err(LatticeError::MoleculeSizeChanged {
                    expected: 2,
                    actual: 3
                })
            );
        }

        #[test]
        fn molecule_parameters_rescale_molecule_spins() {
            let mut l = lattice();
            let node = NodeParameters {
                sm: 3.0,
                ..NodeParameters::default()
            };
            let edge = EdgeParameters {
                jm: 0.5,
                ..EdgeParameters::default()
            };
            l.set_mol_parameters(&node, &edge);
            assert_eq!(l.spin(2, 0, 1).unwrap(), Vector::new(0.0, 3.0, 0.0));
            assert_eq!(l.mol_proto().edge_parameters(0).unwrap().jm, 0.5);
            // 4 rows, one bond each, aligned spins of magnitude 3.
            assert!((l.results().um + 4.0 * 0.5 * 9.0).abs() < EPS);
            assert_results_close(&l.results(), &fresh(&l));
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn randomize_respects_magnitudes_and_resets_time() {
            let mut l = lattice();
            let mut p = *l.parameters();
            p.sr = 2.0;
            p.fr = 0.5;
            l.set_parameters(p);
            l.advance_time(40);
            l.record_results();
            l.randomize(&mut ChaCha8Rng::seed_from_u64(11));

            assert_eq!(l.results().t, 0);
            assert!(l.record().is_empty());
            for site in l.sites().items() {
                let expected = if site.region == Region::Right { 2.0 } else { 1.0 };
                assert!((site.spin.norm() - expected).abs() < EPS);
                assert!(site.flux.norm() <= l.flux_bound(site.index) + EPS);
            }
            assert_results_close(&l.results(), &fresh(&l));
        }

        #[test]
        fn randomize_is_reproducible_for_a_seed() {
            let mut a = lattice();
            let mut b = lattice();
            a.randomize(&mut ChaCha8Rng::seed_from_u64(5));
            b.randomize(&mut ChaCha8Rng::seed_from_u64(5));
            assert_eq!(a, b);
        }

        #[test]
        fn reinitialize_restores_the_initial_state() {
            let initial = lattice();
            let mut l = lattice();
            l.randomize(&mut ChaCha8Rng::seed_from_u64(9));
            l.advance_time(10);
            l.record_results();
            l.reinitialize();
            assert_eq!(l.record().len(), 0);
            assert_eq!(l.results().t, 0);
            assert_results_close(&l.results(), &initial.results());
        }

        #[test]
        fn record_captures_snapshots() {
            let mut l = lattice();
            l.advance_time(5);
            l.record_results();
            assert_eq!(l.record().last().map(|r| r.t), Some(5));
            l.set_record(Record::new());
            assert!(l.record().is_empty());
            l.record_results();
            l.clear_record();
            assert!(l.record().is_empty());
        }
    }
}
