use crate::error::{Result, WorkerError};
use msd::core::models::lattice::Lattice;
use msd::core::models::molecule::{EdgeParameters, NodeParameters};
use msd::core::models::parameters::{Parameters, Results};
use msd::core::utils::vector::Vector;
use phf::{Map, phf_map};
use serde::Serialize;

/// A group of fields that `GET` can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Results,
    Parameters,
    Seed,
    Lattice,
    Molecule,
}

static GROUP_NAMES: Map<&'static str, Group> = phf_map! {
    "results" => Group::Results,
    "parameters" => Group::Parameters,
    "seed" => Group::Seed,
    "lattice" => Group::Lattice,
    "msd" => Group::Lattice,
    "molecule" => Group::Molecule,
    "mol" => Group::Molecule,
};

impl Group {
    pub const ALL: [Group; 5] = [
        Group::Results,
        Group::Parameters,
        Group::Seed,
        Group::Lattice,
        Group::Molecule,
    ];

    pub fn lookup(name: &str) -> Option<Group> {
        GROUP_NAMES.get(name.trim().to_lowercase().as_str()).copied()
    }
}

/// The groups requested by a `GET` body.
///
/// A blank line or an empty array selects every group. Names that match no
/// group are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(Vec<Group>);

impl Selector {
    pub fn all() -> Self {
        Self(Group::ALL.to_vec())
    }

    pub fn parse(line: &str) -> Result<Self> {
        if line.trim().is_empty() {
            return Ok(Self::all());
        }
        let names: Vec<String> = serde_json::from_str(line)
            .map_err(|source| WorkerError::Request { command: "GET", source })?;
        if names.is_empty() {
            return Ok(Self::all());
        }
        let mut groups = Vec::new();
        for group in names.iter().filter_map(|name| Group::lookup(name)) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        Ok(Self(groups))
    }

    pub fn groups(&self) -> &[Group] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSnapshot {
    pub index: usize,
    pub position: [usize; 3],
    pub spin: Vector,
    pub flux: Vector,
    #[serde(rename = "localM")]
    pub local_m: Vector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub index: usize,
    pub parameters: NodeParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSnapshot {
    pub index: usize,
    pub parameters: EdgeParameters,
    pub source: usize,
    pub destination: usize,
    pub direction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub left_lead: usize,
    pub right_lead: usize,
}

/// The state emitted by `GET` and at every `RUN` checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Results>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lattice: Option<Vec<SiteSnapshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecule: Option<MoleculeSnapshot>,
}

impl Snapshot {
    pub fn capture(lattice: &Lattice, seed: u64, groups: &[Group]) -> Self {
        let mut snapshot = Snapshot::default();
        for group in groups {
            match group {
                Group::Results => snapshot.results = Some(lattice.results()),
                Group::Parameters => snapshot.parameters = Some(*lattice.parameters()),
                Group::Seed => snapshot.seed = Some(seed),
                Group::Lattice => snapshot.lattice = Some(sites(lattice)),
                Group::Molecule => snapshot.molecule = Some(molecule(lattice)),
            }
        }
        snapshot
    }
}

fn sites(lattice: &Lattice) -> Vec<SiteSnapshot> {
    lattice
        .sites()
        .items()
        .map(|site| SiteSnapshot {
            index: site.index,
            position: site.position,
            spin: site.spin,
            flux: site.flux,
            local_m: site.local_m,
        })
        .collect()
}

fn molecule(lattice: &Lattice) -> MoleculeSnapshot {
    let graph = lattice.molecule();
    MoleculeSnapshot {
        nodes: graph
            .nodes()
            .items()
            .map(|node| NodeSnapshot {
                index: node.index,
                parameters: *node.parameters,
            })
            .collect(),
        edges: graph
            .edges_unique()
            .items()
            .map(|edge| EdgeSnapshot {
                index: edge.index,
                parameters: *edge.parameters,
                source: edge.source,
                destination: edge.destination,
                direction: edge.direction,
            })
            .collect(),
        left_lead: graph.left_lead(),
        right_lead: graph.right_lead(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use msd::core::models::geometry::LatticeBuilder;
    use msd::core::models::molecule::MoleculeType;

    fn lattice() -> Lattice {
        LatticeBuilder::new(5, 2, 2)
            .mol_len(3)
            .molecule_type(MoleculeType::Circular)
            .build()
            .unwrap()
    }

    mod selectors {
        use super::*;

        #[test]
        fn blank_and_empty_selectors_select_everything() {
            assert_eq!(Selector::parse("").unwrap(), Selector::all());
            assert_eq!(Selector::parse("[]").unwrap(), Selector::all());
        }

        #[test]
        fn aliases_and_unknown_names() {
            let selector = Selector::parse(r#"["MSD", "mol", "colour", "seed", "msd"]"#).unwrap();
            assert_eq!(
                selector.groups(),
                &[Group::Lattice, Group::Molecule, Group::Seed]
            );
            assert!(Selector::parse(r#"["colour"]"#).unwrap().groups().is_empty());
        }

        #[test]
        fn non_array_selectors_are_malformed() {
            assert!(matches!(
                Selector::parse("results"),
                Err(WorkerError::Request { command: "GET", .. })
            ));
        }
    }

    mod capture {
        use super::*;

        #[test]
        fn only_requested_groups_are_serialized() {
            let l = lattice();
            let snapshot = Snapshot::capture(&l, 17, &[Group::Seed, Group::Results]);
            let json = serde_json::to_value(&snapshot).unwrap();
            let object = json.as_object().unwrap();
            assert_eq!(object.len(), 2);
            assert_eq!(json["seed"], 17);
            assert_eq!(json["results"]["t"], 0);
            assert!(json["results"]["U"].is_number());
        }

        #[test]
        fn lattice_group_lists_every_valid_site_in_index_order() {
            let l = lattice();
            let snapshot = Snapshot::capture(&l, 0, &[Group::Lattice]);
            let sites = snapshot.lattice.unwrap();
            assert_eq!(sites.len(), l.counts().n);
            assert!(sites.windows(2).all(|w| w[0].index < w[1].index));
            let json = serde_json::to_value(&sites[0]).unwrap();
            assert_eq!(json["spin"], serde_json::json!([0.0, 1.0, 0.0]));
            assert!(json.get("localM").is_some());
        }

        #[test]
        fn molecule_group_uses_unique_edges() {
            let l = lattice();
            let molecule = Snapshot::capture(&l, 0, &[Group::Molecule]).molecule.unwrap();
            assert_eq!(molecule.nodes.len(), 3);
            assert_eq!(molecule.edges.len(), 3);
            let identities: Vec<usize> = molecule.edges.iter().map(|e| e.index).collect();
            assert_eq!(identities, vec![0, 2, 1]);
            let json = serde_json::to_value(&molecule).unwrap();
            assert_eq!(json["rightLead"], 1);
            assert_eq!(json["edges"][1]["source"], 0);
            assert_eq!(json["edges"][1]["destination"], 2);
            assert_eq!(json["edges"][1]["direction"], -1.0);
            assert_eq!(json["nodes"][0]["parameters"]["Sm"], 1.0);
        }

        #[test]
        fn full_snapshot_uses_physics_key_names() {
            let l = lattice();
            let json = serde_json::to_value(Snapshot::capture(&l, 3, &Group::ALL)).unwrap();
            assert_eq!(json["parameters"]["kT"], 0.25);
            assert_eq!(json["parameters"]["JmR"], -1.0);
            assert!(json["results"]["MSL"].is_array());
        }
    }
}
