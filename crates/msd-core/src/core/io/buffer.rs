use crate::core::models::molecule::{EdgeParameters, MoleculeGraph, NodeParameters};
use crate::core::utils::vector::Vector;
use thiserror::Error;
use tracing::debug;

/// Magic bytes that open every serialized molecule.
pub const HEADER: [u8; 8] = *b"MSDMOL\x01\x00";

const COUNT_SIZE: usize = 8;
const NODE_BLOCK_SIZE: usize = 6 * 8;
const EDGE_BLOCK_SIZE: usize = 7 * 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Buffer holds {actual} bytes but {expected} are required")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Buffer does not start with the molecule header")]
    BadHeader,
    #[error("Cannot deserialize into a molecule that already has nodes or edges")]
    NotEmpty,
    #[error("Buffer ends after {offset} bytes while reading {section}")]
    Truncated {
        offset: usize,
        section: &'static str,
    },
}

/// Buffer layout, all integers and reals little endian:
///
/// ```text
/// HEADER | u64 nodes | nodes × [Sm Fm Je0m Am.x Am.y Am.z]
///        | u64 edges | edges × [Jm Je1m Jeem bm Dm.x Dm.y Dm.z]
///        | u64 left lead | u64 right lead
/// ```
///
/// Only parameter values are stored. Edge endpoints are not part of the
/// layout, so a deserialized graph has its edge identities and their
/// parameters but no traversal entries.
impl MoleculeGraph {
    pub fn serialization_size(&self) -> usize {
        HEADER.len()
            + COUNT_SIZE
            + self.node_count() * NODE_BLOCK_SIZE
            + COUNT_SIZE
            + self.edge_count() * EDGE_BLOCK_SIZE
            + 2 * COUNT_SIZE
    }

    /// Writes the graph into `buffer`, which must be exactly [`Self::serialization_size`] bytes.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<(), SerializationError> {
        let expected = self.serialization_size();
        if buffer.len() != expected {
            return Err(SerializationError::SizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }

        let mut writer = Writer { buffer, offset: 0 };
        writer.put_bytes(&HEADER);
        writer.put_count(self.node_count());
        for node in self.nodes().items() {
            let p = node.parameters;
            writer.put_reals(&[p.sm, p.fm, p.je0m]);
            writer.put_vector(&p.am);
        }
        writer.put_count(self.edge_count());
        for p in self.edge_parameter_records() {
            writer.put_reals(&[p.jm, p.je1m, p.jeem, p.bm]);
            writer.put_vector(&p.dm);
        }
        writer.put_count(self.left_lead());
        writer.put_count(self.right_lead());
        debug!(bytes = expected, "Serialized molecule.");
        Ok(())
    }

    /// Populates an empty graph from a buffer produced by [`Self::serialize`].
    pub fn deserialize(&mut self, buffer: &[u8]) -> Result<(), SerializationError> {
        if !self.is_empty() {
            return Err(SerializationError::NotEmpty);
        }

        let mut reader = Reader { buffer, offset: 0 };
        if reader.take(HEADER.len(), "header")? != HEADER {
            return Err(SerializationError::BadHeader);
        }

        let node_count = reader.count("node count")?;
        let edges_offset =
            (HEADER.len() + COUNT_SIZE).saturating_add(node_count.saturating_mul(NODE_BLOCK_SIZE));
        if edges_offset.saturating_add(COUNT_SIZE) > buffer.len() {
            return Err(SerializationError::Truncated {
                offset: buffer.len(),
                section: "nodes",
            });
        }
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let [sm, fm, je0m] = reader.reals("nodes")?;
            let am = reader.vector("nodes")?;
            nodes.push(NodeParameters { sm, fm, je0m, am });
        }

        let edge_count = reader.count("edge count")?;
        let expected = (edges_offset + 3 * COUNT_SIZE)
            .saturating_add(edge_count.saturating_mul(EDGE_BLOCK_SIZE));
        if buffer.len() != expected {
            return Err(SerializationError::SizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            let [jm, je1m, jeem, bm] = reader.reals("edges")?;
            let dm = reader.vector("edges")?;
            edges.push(EdgeParameters {
                jm,
                je1m,
                jeem,
                bm,
                dm,
            });
        }
        let left = reader.count("leads")?;
        let right = reader.count("leads")?;

        for parameters in nodes {
            self.create_node(parameters);
        }
        for parameters in edges {
            self.push_detached_edge(parameters);
        }
        self.set_leads(left, right);
        debug!(
            nodes = node_count,
            edges = edge_count,
            "Deserialized molecule without edge topology."
        );
        Ok(())
    }
}

struct Writer<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl Writer<'_> {
    fn put_bytes(&mut self, bytes: &[u8]) {
        self.buffer[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
    }

    fn put_count(&mut self, value: usize) {
        self.put_bytes(&(value as u64).to_le_bytes());
    }

    fn put_reals(&mut self, values: &[f64]) {
        for value in values {
            self.put_bytes(&value.to_le_bytes());
        }
    }

    fn put_vector(&mut self, v: &Vector) {
        self.put_reals(&[v.x, v.y, v.z]);
    }
}

struct Reader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], SerializationError> {
        let end = self.offset + len;
        let bytes = self
            .buffer
            .get(self.offset..end)
            .ok_or(SerializationError::Truncated {
                offset: self.offset,
                section,
            })?;
        self.offset = end;
        Ok(bytes)
    }

    fn word(&mut self, section: &'static str) -> Result<[u8; 8], SerializationError> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.take(8, section)?);
        Ok(word)
    }

    fn count(&mut self, section: &'static str) -> Result<usize, SerializationError> {
        Ok(u64::from_le_bytes(self.word(section)?) as usize)
    }

    fn reals<const N: usize>(&mut self, section: &'static str) -> Result<[f64; N], SerializationError> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = f64::from_le_bytes(self.word(section)?);
        }
        Ok(values)
    }

    fn vector(&mut self, section: &'static str) -> Result<Vector, SerializationError> {
        let [x, y, z] = self.reals(section)?;
        Ok(Vector::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::MoleculeType;

    fn sample_molecule() -> MoleculeGraph {
        let mut graph = MoleculeType::Circular.build(4);
        graph
            .set_node_parameters(
                1,
                NodeParameters {
                    sm: 2.5,
                    fm: 0.125,
                    je0m: -0.75,
                    am: Vector::new(0.1, -0.2, 0.3),
                },
            )
            .unwrap();
        graph
            .set_edge_parameters(
                2,
                EdgeParameters {
                    jm: 1.5,
                    je1m: 0.25,
                    jeem: -2.0,
                    bm: 0.01,
                    dm: Vector::new(0.0, 0.0, 1.0),
                },
            )
            .unwrap();
        graph.set_leads(1, 3);
        graph
    }

    fn serialized(graph: &MoleculeGraph) -> Vec<u8> {
        let mut buffer = vec![0u8; graph.serialization_size()];
        graph.serialize(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn serialization_size_accounts_for_every_block() {
        let graph = sample_molecule();
        assert_eq!(graph.serialization_size(), 8 + 8 + 4 * 48 + 8 + 4 * 56 + 16);
    }

    #[test]
    fn round_trip_preserves_nodes_parameters_and_leads() {
        let original = sample_molecule();
        let mut restored = MoleculeGraph::new();
        restored.deserialize(&serialized(&original)).unwrap();

        assert_eq!(restored.node_count(), original.node_count());
        for (a, b) in restored.nodes().items().zip(original.nodes().items()) {
            assert_eq!(a.parameters, b.parameters);
        }
        assert_eq!(restored.edge_count(), original.edge_count());
        for edge in 0..original.edge_count() {
            assert_eq!(
                restored.edge_parameters(edge).unwrap(),
                original.edge_parameters(edge).unwrap()
            );
        }
        assert_eq!((restored.left_lead(), restored.right_lead()), (1, 3));
    }

    // Edge endpoints are not stored, so connectivity is lost on the way back.
    #[test]
    fn round_trip_does_not_preserve_edge_topology() {
        let original = sample_molecule();
        let mut restored = MoleculeGraph::new();
        restored.deserialize(&serialized(&original)).unwrap();

        assert_eq!(original.edges().len(), 8);
        assert_eq!(restored.edges().len(), 0);
        assert_eq!(restored.edges_unique().len(), 0);
        assert_eq!(original.edge_index(0, 1), Some(0));
        assert_eq!(restored.edge_index(0, 1), None);
        assert_ne!(restored, original);
    }

    #[test]
    fn serialize_requires_an_exactly_sized_buffer() {
        let graph = sample_molecule();
        let mut short = vec![0u8; graph.serialization_size() - 1];
        assert_eq!(
            graph.serialize(&mut short),
            Err(SerializationError::SizeMismatch {
                expected: graph.serialization_size(),
                actual: graph.serialization_size() - 1,
            })
        );
    }

    #[test]
    fn deserialize_rejects_non_empty_graphs_and_bad_input() {
        let buffer = serialized(&sample_molecule());

        let mut occupied = MoleculeGraph::with_nodes(1, NodeParameters::default());
        assert_eq!(occupied.deserialize(&buffer), Err(SerializationError::NotEmpty));

        let mut corrupted = buffer.clone();
        corrupted[0] = b'X';
        assert_eq!(
            MoleculeGraph::new().deserialize(&corrupted),
            Err(SerializationError::BadHeader)
        );

        let mut extended = buffer.clone();
        extended.push(0);
        assert!(matches!(
            MoleculeGraph::new().deserialize(&extended),
            Err(SerializationError::SizeMismatch { .. })
        ));

        assert!(matches!(
            MoleculeGraph::new().deserialize(&buffer[..20]),
            Err(SerializationError::Truncated { .. })
        ));
    }

    #[test]
    fn failed_deserialization_leaves_the_graph_empty() {
        let buffer = serialized(&sample_molecule());
        let mut graph = MoleculeGraph::new();
        assert!(graph.deserialize(&buffer[..buffer.len() - 8]).is_err());
        assert!(graph.is_empty());
    }
}
