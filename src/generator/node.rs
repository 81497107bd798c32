//! Generator nodes and the arena that holds them.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::{Field, FieldType, Schema, DEFAULT_MAX_LENGTH};

/// Index of a node inside a [`GeneratorTree`] arena.
pub type NodeId = usize;

/// One value generator in the tree. Child nodes are referenced by arena
/// index, so nested objects and arrays form no ownership cycles.
#[derive(Debug, Clone)]
pub enum GenNode {
    Null,
    Bool,
    Int { min: i64, max: i64 },
    Uint { min: u64, max: u64 },
    Str { min_len: usize, max_len: usize },
    Date,
    Array { item: NodeId, min_len: usize, max_len: usize },
    FixedArray { item: NodeId, len: usize },
    Object { members: Vec<(String, NodeId)> },
}

/// Arena of generator nodes mirroring a schema.
///
/// The tree itself is stateless; the random engine is supplied per call so
/// that producer threads can share one validated tree with diverging seeds.
#[derive(Debug, Clone)]
pub struct GeneratorTree {
    nodes: Vec<GenNode>,
    root: NodeId,
}

impl GeneratorTree {
    /// Build the node arena for `schema`. The root is an object holding the
    /// schema's top-level fields in declaration order.
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        schema.validate()?;
        let mut nodes = Vec::new();
        let root = push_object(&mut nodes, &schema.fields);
        Ok(Self { nodes, root })
    }

    /// Generate one value from the root node.
    pub fn generate(&self, rng: &mut StdRng) -> Value {
        generate_node(&self.nodes, self.root, rng)
    }
}

fn push_object(nodes: &mut Vec<GenNode>, fields: &[Field]) -> NodeId {
    let members = fields
        .iter()
        .map(|field| (field.name.clone(), push_node(nodes, &field.field_type)))
        .collect();
    nodes.push(GenNode::Object { members });
    nodes.len() - 1
}

fn push_node(nodes: &mut Vec<GenNode>, field_type: &FieldType) -> NodeId {
    if let Some((min, max)) = field_type.signed_bounds() {
        nodes.push(GenNode::Int { min, max });
        return nodes.len() - 1;
    }
    if let Some((min, max)) = field_type.unsigned_bounds() {
        nodes.push(GenNode::Uint { min, max });
        return nodes.len() - 1;
    }
    let node = match field_type {
        FieldType::Null => GenNode::Null,
        FieldType::Bool => GenNode::Bool,
        FieldType::String {
            min_length,
            max_length,
        } => GenNode::Str {
            min_len: min_length.unwrap_or(0),
            max_len: max_length.unwrap_or(DEFAULT_MAX_LENGTH),
        },
        FieldType::Date => GenNode::Date,
        FieldType::Array {
            items,
            min_length,
            max_length,
        } => GenNode::Array {
            item: push_node(nodes, items),
            min_len: min_length.unwrap_or(0),
            max_len: max_length.unwrap_or(DEFAULT_MAX_LENGTH),
        },
        FieldType::FixedArray { items, length } => GenNode::FixedArray {
            item: push_node(nodes, items),
            len: *length,
        },
        FieldType::Object { fields } => return push_object(nodes, fields),
        // Integer widths are handled through the bounds helpers above.
        _ => unreachable!("integer types resolve through bounds"),
    };
    nodes.push(node);
    nodes.len() - 1
}

fn generate_node(nodes: &[GenNode], id: NodeId, rng: &mut StdRng) -> Value {
    match &nodes[id] {
        GenNode::Null => Value::Null,
        GenNode::Bool => Value::Bool(rng.gen()),
        GenNode::Int { min, max } => Value::from(rng.gen_range(*min..=*max)),
        GenNode::Uint { min, max } => Value::from(rng.gen_range(*min..=*max)),
        GenNode::Str { min_len, max_len } => {
            let len = rng.gen_range(*min_len..=*max_len);
            let s: String = (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
            Value::String(s)
        }
        GenNode::Date => Value::String(generate_date(rng)),
        GenNode::Array {
            item,
            min_len,
            max_len,
        } => {
            let len = rng.gen_range(*min_len..=*max_len);
            Value::Array((0..len).map(|_| generate_node(nodes, *item, rng)).collect())
        }
        GenNode::FixedArray { item, len } => {
            Value::Array((0..*len).map(|_| generate_node(nodes, *item, rng)).collect())
        }
        GenNode::Object { members } => {
            let mut object = Map::new();
            for (name, child) in members {
                object.insert(name.clone(), generate_node(nodes, *child, rng));
            }
            Value::Object(object)
        }
    }
}

/// ISO-8601-like date and time with a whole-hour timezone offset.
///
/// Days stop at 28 so any month is valid without calendar arithmetic.
fn generate_date(rng: &mut StdRng) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{:+03}:00",
        rng.gen_range(2000..=2020),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
        rng.gen_range(0..=23),
        rng.gen_range(0..=59),
        rng.gen_range(0..=59),
        rng.gen_range(-12i32..=12),
    )
}
