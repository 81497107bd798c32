//! Schema-driven pseudo-random JSON value generation.
//!
//! The generator mirrors the schema as a tree of nodes held in an arena and
//! produces one [`serde_json::Value`] per call. Generation is deterministic:
//! the same seed and schema always produce the same sequence of values.

mod node;

pub use node::{GenNode, GeneratorTree, NodeId};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::error::Result;
use crate::schema::Schema;

/// Options for the pseudo-random generators.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// The seed used by the pseudo-random engine.
    pub seed: u64,
    /// Whether to pretty-print generated records.
    pub pretty: bool,
    /// Whether to append a terminator after each record.
    pub whitespace: bool,
    /// The terminator byte to append.
    pub whitespace_char: u8,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            pretty: false,
            whitespace: true,
            whitespace_char: b'\n',
        }
    }
}

impl GeneratorOptions {
    /// Options with a seed drawn from OS randomness.
    pub fn from_entropy() -> Self {
        Self {
            seed: rand::random(),
            ..Self::default()
        }
    }
}

/// Generates JSON document roots from a schema with a seeded random engine.
pub struct DocumentGenerator {
    tree: GeneratorTree,
    rng: StdRng,
}

impl DocumentGenerator {
    /// Build a generator for `schema`, seeded with `seed`.
    pub fn from_schema(schema: &Schema, seed: u64) -> Result<Self> {
        let tree = GeneratorTree::from_schema(schema)?;
        Ok(Self::new(tree, seed))
    }

    /// Build a generator from an existing node tree.
    pub fn new(tree: GeneratorTree, seed: u64) -> Self {
        Self {
            tree,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate the next document root.
    pub fn generate(&mut self) -> Value {
        self.tree.generate(&mut self.rng)
    }
}
