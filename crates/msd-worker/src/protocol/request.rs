use crate::error::{Result, WorkerError};
use crate::protocol::snapshot::Selector;
use msd::core::models::geometry::LatticeBuilder;
use msd::core::models::lattice::Lattice;
use msd::core::models::molecule::{EdgeParameters, MoleculeGraph, MoleculeType, NodeParameters};
use msd::core::models::parameters::Parameters;
use msd::core::utils::vector::{self, Vector};
use msd::engine::FlippingAlgorithm;
use msd::workflows::simulate::RunPlan;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Command keywords, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Set,
    Run,
    Get,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXIT" => Ok(Command::Exit),
            "SET" => Ok(Command::Set),
            "RUN" => Ok(Command::Run),
            "GET" => Ok(Command::Get),
            "RESET" => Ok(Command::Reset),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Exit => "EXIT",
            Command::Set => "SET",
            Command::Run => "RUN",
            Command::Get => "GET",
            Command::Reset => "RESET",
        }
    }

    /// Whether the keyword is followed by a body line.
    pub fn has_body(self) -> bool {
        self != Command::Exit
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parsed command with its body.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Exit,
    Set(ParameterUpdate),
    Run(RunRequest),
    Get(Selector),
    Reset(ResetRequest),
}

impl Request {
    /// Parses the body line that follows `command`.
    pub fn parse(command: Command, body: &str) -> Result<Self> {
        Ok(match command {
            Command::Exit => Request::Exit,
            Command::Set => Request::Set(parse_body("SET", body)?),
            Command::Run => Request::Run(parse_body("RUN", body)?),
            Command::Get => Request::Get(Selector::parse(body)?),
            Command::Reset => Request::Reset(parse_optional_body("RESET", body)?),
        })
    }
}

pub fn parse_body<T: DeserializeOwned>(command: &'static str, line: &str) -> Result<T> {
    trace!(command, body = line, "Parsing request body.");
    serde_json::from_str(line).map_err(|source| WorkerError::Request { command, source })
}

// A blank line stands for an empty object.
fn parse_optional_body<T: DeserializeOwned>(command: &'static str, line: &str) -> Result<T> {
    if line.trim().is_empty() {
        parse_body(command, "{}")
    } else {
        parse_body(command, line)
    }
}

macro_rules! overlay {
    (
        $(#[$meta:meta])*
        $name:ident => $target:ty {
            $($field:ident: $ty:ty = $key:literal $(| $alias:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
        pub struct $name {
            $(
                #[serde(rename = $key $(, alias = $alias)?)]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }

            /// Writes every present field into `target`, leaving the rest untouched.
            pub fn apply(&self, target: &mut $target) {
                $(
                    if let Some(value) = self.$field {
                        target.$field = value;
                    }
                )*
            }
        }
    };
}

overlay! {
    /// Lattice-level coefficients present in a request.
    LatticeUpdate => Parameters {
        kt: f64 = "kT" | "temperature",
        b: Vector = "B" | "field",
        sl: f64 = "SL",
        sr: f64 = "SR",
        fl: f64 = "FL",
        fr: f64 = "FR",
        jl: f64 = "JL",
        jr: f64 = "JR",
        jml: f64 = "JmL",
        jmr: f64 = "JmR",
        jlr: f64 = "JLR",
        je0l: f64 = "Je0L",
        je0r: f64 = "Je0R",
        je1l: f64 = "Je1L",
        je1r: f64 = "Je1R",
        je1ml: f64 = "Je1mL",
        je1mr: f64 = "Je1mR",
        je1lr: f64 = "Je1LR",
        jeel: f64 = "JeeL",
        jeer: f64 = "JeeR",
        jeeml: f64 = "JeemL",
        jeemr: f64 = "JeemR",
        jeelr: f64 = "JeeLR",
        bl: f64 = "bL",
        br: f64 = "bR",
        bml: f64 = "bmL",
        bmr: f64 = "bmR",
        blr: f64 = "bLR",
        al: Vector = "AL",
        ar: Vector = "AR",
        dl: Vector = "DL",
        dr: Vector = "DR",
        dml: Vector = "DmL",
        dmr: Vector = "DmR",
        dlr: Vector = "DLR",
    }
}

overlay! {
    /// Molecule node coefficients present in a request, applied to every node.
    NodeUpdate => NodeParameters {
        sm: f64 = "Sm",
        fm: f64 = "Fm",
        je0m: f64 = "Je0m",
        am: Vector = "Am",
    }
}

overlay! {
    /// Molecule edge coefficients present in a request, applied to every edge.
    EdgeUpdate => EdgeParameters {
        jm: f64 = "Jm",
        je1m: f64 = "Je1m",
        jeem: f64 = "Jeem",
        bm: f64 = "bm",
        dm: Vector = "Dm",
    }
}

impl LatticeUpdate {
    fn is_thermal_only(&self) -> bool {
        LatticeUpdate {
            kt: None,
            b: None,
            ..self.clone()
        }
        .is_empty()
    }
}

/// Body of `SET`: a flat map of coefficient keys. Keys that name no
/// coefficient are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParameterUpdate {
    #[serde(flatten)]
    pub lattice: LatticeUpdate,
    #[serde(flatten)]
    pub node: NodeUpdate,
    #[serde(flatten)]
    pub edge: EdgeUpdate,
}

impl ParameterUpdate {
    pub fn is_empty(&self) -> bool {
        self.lattice.is_empty() && self.node.is_empty() && self.edge.is_empty()
    }

    /// Applies the update to `lattice`.
    ///
    /// A body naming only temperature and field takes the lattice's fast path.
    /// Otherwise lattice-level keys are overlaid on the current parameters and
    /// node/edge keys on every node/edge record of the molecule, each written
    /// back once. Existing differences between nodes or edges survive for the
    /// keys that are not given.
    pub fn apply(&self, lattice: &mut Lattice) -> Result<()> {
        if self.node.is_empty() && self.edge.is_empty() && self.lattice.is_thermal_only() {
            if let Some(kt) = self.lattice.kt {
                lattice.set_temperature(kt);
            }
            if let Some(b) = self.lattice.b {
                lattice.set_field(b);
            }
            return Ok(());
        }

        if !self.lattice.is_empty() {
            let mut parameters = *lattice.parameters();
            self.lattice.apply(&mut parameters);
            lattice.set_parameters(parameters);
        }

        if !self.node.is_empty() || !self.edge.is_empty() {
            let mut molecule = lattice.mol_proto();
            for node in 0..molecule.node_count() {
                let mut parameters = *molecule.node_parameters(node)?;
                self.node.apply(&mut parameters);
                molecule.set_node_parameters(node, parameters)?;
            }
            for edge in 0..molecule.edge_count() {
                let mut parameters = *molecule.edge_parameters(edge)?;
                self.edge.apply(&mut parameters);
                molecule.set_edge_parameters(edge, parameters)?;
            }
            lattice.set_mol_proto(molecule)?;
        }
        Ok(())
    }
}

fn zero_vector() -> Vector {
    vector::ZERO
}

/// Body of `RUN`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RunRequest {
    #[serde(rename = "simCount")]
    pub sim_count: u64,
    #[serde(default)]
    pub freq: i64,
    #[serde(rename = "dkT", default)]
    pub dkt: f64,
    #[serde(rename = "dB", default = "zero_vector")]
    pub db: Vector,
}

impl RunRequest {
    pub fn plan(&self) -> RunPlan {
        RunPlan::new(self.sim_count)
            .with_freq(self.freq)
            .with_ramp(self.dkt, self.db)
    }
}

fn default_true() -> bool {
    true
}

/// Body of `RESET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResetRequest {
    pub seed: Option<u64>,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default = "default_true")]
    pub reseed: bool,
}

impl ResetRequest {
    /// A fresh seed is drawn only when none was given and reseeding was not declined.
    pub fn effective_reseed(&self) -> bool {
        self.seed.is_none() && self.reseed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EdgeSpec {
    pub src: usize,
    pub dest: usize,
    #[serde(default)]
    pub parameters: EdgeParameters,
}

/// An explicit molecule graph given in the startup request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeSpec {
    #[serde(default)]
    pub nodes: Vec<NodeParameters>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    pub left_lead: Option<usize>,
    pub right_lead: Option<usize>,
}

impl MoleculeSpec {
    pub fn build(&self) -> Result<MoleculeGraph> {
        let mut graph = MoleculeGraph::new();
        for parameters in &self.nodes {
            graph.create_node(*parameters);
        }
        for edge in &self.edges {
            graph.connect_nodes(edge.src, edge.dest, edge.parameters)?;
        }
        graph.set_leads(self.left_lead.unwrap_or(0), self.right_lead.unwrap_or(0));
        Ok(graph)
    }
}

/// The configuration line that starts a worker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupRequest {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub mol_type: Option<MoleculeType>,
    pub mol_pos_l: Option<usize>,
    pub mol_pos_r: Option<usize>,
    pub mol_pos: Option<usize>,
    pub mol_len: Option<usize>,
    pub top_l: Option<usize>,
    pub bottom_l: Option<usize>,
    pub height_l: Option<usize>,
    pub front_r: Option<usize>,
    pub back_r: Option<usize>,
    pub depth_r: Option<usize>,
    pub molecule: Option<MoleculeSpec>,
    pub seed: Option<u64>,
    #[serde(default)]
    pub randomize: bool,
    pub flipping_algorithm: Option<FlippingAlgorithm>,
    #[serde(flatten)]
    pub parameters: ParameterUpdate,
}

impl StartupRequest {
    pub fn builder(&self) -> Result<LatticeBuilder> {
        let mut builder = LatticeBuilder::new(self.width, self.height, self.depth);
        let placement: [(Option<usize>, fn(LatticeBuilder, usize) -> LatticeBuilder); 10] = [
            (self.mol_pos_l, LatticeBuilder::mol_pos_l),
            (self.mol_pos_r, LatticeBuilder::mol_pos_r),
            (self.mol_pos, LatticeBuilder::mol_pos),
            (self.mol_len, LatticeBuilder::mol_len),
            (self.top_l, LatticeBuilder::top_l),
            (self.bottom_l, LatticeBuilder::bottom_l),
            (self.height_l, LatticeBuilder::height_l),
            (self.front_r, LatticeBuilder::front_r),
            (self.back_r, LatticeBuilder::back_r),
            (self.depth_r, LatticeBuilder::depth_r),
        ];
        for (value, set) in placement {
            if let Some(value) = value {
                builder = set(builder, value);
            }
        }
        if let Some(molecule_type) = self.mol_type {
            builder = builder.molecule_type(molecule_type);
        }
        if let Some(spec) = &self.molecule {
            builder = builder.molecule(spec.build()?);
        }
        Ok(builder)
    }

    /// Builds the lattice and applies the initial coefficient overrides.
    pub fn build_lattice(&self) -> Result<Lattice> {
        let mut lattice = self.builder()?.build()?;
        if !self.parameters.is_empty() {
            self.parameters.apply(&mut lattice)?;
        }
        Ok(lattice)
    }
}
