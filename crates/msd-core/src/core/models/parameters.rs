use crate::core::utils::vector::{self, Vector};
use serde::{Deserialize, Serialize};

/// Global Hamiltonian coefficients of a lattice.
///
/// Suffixes name the region a coefficient applies to: `l`/`r` for the left
/// and right ferromagnetic leads, `ml`/`mr` for the couplings between the
/// molecule and each lead, and `lr` for the direct lead-to-lead coupling.
/// Molecule-internal coefficients live on the molecule graph instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Temperature, in units of the Boltzmann constant.
    #[serde(rename = "kT", alias = "temperature")]
    pub kt: f64,
    /// External magnetic field.
    #[serde(rename = "B", alias = "field")]
    pub b: Vector,

    #[serde(rename = "SL")]
    pub sl: f64,
    #[serde(rename = "SR")]
    pub sr: f64,
    #[serde(rename = "FL")]
    pub fl: f64,
    #[serde(rename = "FR")]
    pub fr: f64,

    #[serde(rename = "JL")]
    pub jl: f64,
    #[serde(rename = "JR")]
    pub jr: f64,
    #[serde(rename = "JmL")]
    pub jml: f64,
    #[serde(rename = "JmR")]
    pub jmr: f64,
    #[serde(rename = "JLR")]
    pub jlr: f64,

    #[serde(rename = "Je0L")]
    pub je0l: f64,
    #[serde(rename = "Je0R")]
    pub je0r: f64,

    #[serde(rename = "Je1L")]
    pub je1l: f64,
    #[serde(rename = "Je1R")]
    pub je1r: f64,
    #[serde(rename = "Je1mL")]
    pub je1ml: f64,
    #[serde(rename = "Je1mR")]
    pub je1mr: f64,
    #[serde(rename = "Je1LR")]
    pub je1lr: f64,

    #[serde(rename = "JeeL")]
    pub jeel: f64,
    #[serde(rename = "JeeR")]
    pub jeer: f64,
    #[serde(rename = "JeemL")]
    pub jeeml: f64,
    #[serde(rename = "JeemR")]
    pub jeemr: f64,
    #[serde(rename = "JeeLR")]
    pub jeelr: f64,

    #[serde(rename = "bL")]
    pub bl: f64,
    #[serde(rename = "bR")]
    pub br: f64,
    #[serde(rename = "bmL")]
    pub bml: f64,
    #[serde(rename = "bmR")]
    pub bmr: f64,
    #[serde(rename = "bLR")]
    pub blr: f64,

    #[serde(rename = "AL")]
    pub al: Vector,
    #[serde(rename = "AR")]
    pub ar: Vector,

    #[serde(rename = "DL")]
    pub dl: Vector,
    #[serde(rename = "DR")]
    pub dr: Vector,
    #[serde(rename = "DmL")]
    pub dml: Vector,
    #[serde(rename = "DmR")]
    pub dmr: Vector,
    #[serde(rename = "DLR")]
    pub dlr: Vector,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            kt: 0.25,
            b: vector::ZERO,
            sl: 1.0,
            sr: 1.0,
            fl: 0.0,
            fr: 0.0,
            jl: 1.0,
            jr: 1.0,
            jml: 1.0,
            jmr: -1.0,
            jlr: 0.0,
            je0l: 0.0,
            je0r: 0.0,
            je1l: 0.0,
            je1r: 0.0,
            je1ml: 0.0,
            je1mr: 0.0,
            je1lr: 0.0,
            jeel: 0.0,
            jeer: 0.0,
            jeeml: 0.0,
            jeemr: 0.0,
            jeelr: 0.0,
            bl: 0.0,
            br: 0.0,
            bml: 0.0,
            bmr: 0.0,
            blr: 0.0,
            al: vector::ZERO,
            ar: vector::ZERO,
            dl: vector::ZERO,
            dr: vector::ZERO,
            dml: vector::ZERO,
            dmr: vector::ZERO,
            dlr: vector::ZERO,
        }
    }
}

/// Aggregate observables of a lattice at one point in time.
///
/// `M*` are total local moments (spin + flux), `MS*` spin-only and `MF*`
/// flux-only sums. `U*` are energies: per region, per coupling between regions
/// (`UmL`, `UmR`, `ULR`) and the total `U`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Results {
    pub t: u64,

    #[serde(rename = "M")]
    pub m: Vector,
    #[serde(rename = "ML")]
    pub ml: Vector,
    #[serde(rename = "MR")]
    pub mr: Vector,
    #[serde(rename = "Mm")]
    pub mm: Vector,

    #[serde(rename = "MS")]
    pub ms: Vector,
    #[serde(rename = "MSL")]
    pub msl: Vector,
    #[serde(rename = "MSR")]
    pub msr: Vector,
    #[serde(rename = "MSm")]
    pub msm: Vector,

    #[serde(rename = "MF")]
    pub mf: Vector,
    #[serde(rename = "MFL")]
    pub mfl: Vector,
    #[serde(rename = "MFR")]
    pub mfr: Vector,
    #[serde(rename = "MFm")]
    pub mfm: Vector,

    #[serde(rename = "U")]
    pub u: f64,
    #[serde(rename = "UL")]
    pub ul: f64,
    #[serde(rename = "UR")]
    pub ur: f64,
    #[serde(rename = "Um")]
    pub um: f64,
    #[serde(rename = "UmL")]
    pub uml: f64,
    #[serde(rename = "UmR")]
    pub umr: f64,
    #[serde(rename = "ULR")]
    pub ulr: f64,
}

impl Results {
    /// Rebuilds the aggregate fields from the per-region ones.
    pub(crate) fn refresh_totals(&mut self) {
        self.ml = self.msl + self.mfl;
        self.mr = self.msr + self.mfr;
        self.mm = self.msm + self.mfm;
        self.ms = self.msl + self.msr + self.msm;
        self.mf = self.mfl + self.mfr + self.mfm;
        self.m = self.ms + self.mf;
        self.u = self.ul + self.ur + self.um + self.uml + self.umr + self.ulr;
    }
}

/// Ordered history of [`Results`] captured while sampling.
///
/// Averages weight each sample by the simulated time it covers (trapezoidal
/// rule over `t`), so unevenly spaced checkpoints are handled correctly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<Results>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, results: Results) {
        self.0.push(results);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn samples(&self) -> &[Results] {
        &self.0
    }

    pub fn last(&self) -> Option<&Results> {
        self.0.last()
    }

    pub fn mean_magnetization(&self) -> Vector {
        self.time_average(|r| r.m, vector::ZERO)
    }

    pub fn mean_energy(&self) -> f64 {
        self.time_average(|r| r.u, 0.0)
    }

    /// Energy fluctuation per site, `(<U^2> - <U>^2) / (n kT^2)`.
    pub fn specific_heat(&self, sites: usize, kt: f64) -> f64 {
        if self.0.len() < 2 || sites == 0 || kt == 0.0 {
            return 0.0;
        }
        let mean = self.mean_energy();
        let mean_sq = self.time_average(|r| r.u * r.u, 0.0);
        (mean_sq - mean * mean) / (sites as f64 * kt * kt)
    }

    /// Magnetization fluctuation per site, `(<|M|^2> - |<M>|^2) / (n kT)`.
    pub fn magnetic_susceptibility(&self, sites: usize, kt: f64) -> f64 {
        if self.0.len() < 2 || sites == 0 || kt == 0.0 {
            return 0.0;
        }
        let mean = self.mean_magnetization();
        let mean_sq = self.time_average(|r| r.m.norm_squared(), 0.0);
        (mean_sq - mean.norm_squared()) / (sites as f64 * kt)
    }

    fn time_average<T, F>(&self, value: F, empty: T) -> T
    where
        T: Copy + std::ops::Add<Output = T> + std::ops::Mul<f64, Output = T>,
        F: Fn(&Results) -> T,
    {
        let samples = &self.0;
        let Some(last) = samples.last() else {
            return empty;
        };
        // Steps where time does not advance carry no weight.
        let step = |pair: &[Results]| pair[1].t.saturating_sub(pair[0].t);
        let span = samples.windows(2).map(step).fold(0u64, u64::saturating_add);
        if span == 0 {
            return value(last);
        }
        let total = samples.windows(2).fold(empty, |acc, pair| {
            let dt = step(pair) as f64;
            acc + (value(&pair[0]) + value(&pair[1])) * (0.5 * dt)
        });
        total * (1.0 / span as f64)
    }
}

impl From<Vec<Results>> for Record {
    fn from(samples: Vec<Results>) -> Self {
        Self(samples)
    }
}
