//! MTBDD nodes and the node-identity table.
//!
//! # Design (intrusive hash table)
//!
//! The manager keeps a single `Vec<Node>` addressed by [`NodeRef`] plus a
//! bucket array for hash-based lookup.  Collision chains are stored
//! intrusively via the `Node.next` field, so nodes themselves form the
//! linked lists — no separate entry wrapper:
//!
//! ```text
//! buckets: [u32; 2^bits]
//!   [0] ─────► Node@5 ──► Node@12 ──► ∅
//!   [1] ─────► ∅
//!   [2] ─────► Node@3 ──► ∅
//!   ...
//! ```
//!
//! Unlike a plain BDD, a node is one of three variants: the Boolean
//! constants, a *terminal* carrying a `(state, may-stop)` payload, or an
//! internal decision node.  All three kinds are canonicalized through the
//! same table, so structural equality is pointer (index) equality.
//!
//! The table grows by rehashing once chains get long; node indices are
//! stable across growth, only the bucket heads move.

use crate::types::{Leaf, NodeRef, Terminal, Var};
use crate::utils::{pairing2, pairing3, MyHash};

/// The payload of an MTBDD node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeKind {
    /// One of the two Boolean constants.
    Const(bool),
    /// A multi-terminal leaf carrying a `(state, may-stop)` payload.
    Terminal(Terminal),
    /// A decision node; both children already exist and have strictly
    /// larger variables (or are leaves).
    Internal { var: Var, low: NodeRef, high: NodeRef },
}

impl MyHash for NodeKind {
    fn hash(&self) -> u64 {
        match *self {
            NodeKind::Const(b) => b as u64,
            NodeKind::Terminal(t) => pairing2(2, t.raw() as u64),
            NodeKind::Internal { var, low, high } => {
                pairing3(var.id() as u64, low.index() as u64, high.index() as u64)
            }
        }
    }
}

/// A node slot: the payload plus the intrusive collision chain link and the
/// precomputed hash of the payload.
#[derive(Debug, Copy, Clone)]
pub struct Node {
    pub kind: NodeKind,
    next: u32,
    hash: u64,
}

/// Sentinel for "end of chain" / "empty bucket".
const NO_NEXT: u32 = u32::MAX;

/// Canonicalizing node storage with intrusive collision chains.
pub struct NodeTable {
    nodes: Vec<Node>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl NodeTable {
    /// Create a table with `2^bits` buckets, pre-seeded with the two
    /// constants at indices 0 and 1.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bucket bits should be in the range 0..=31");
        let size = 1usize << bits;
        let mut table = Self {
            nodes: Vec::with_capacity(1024),
            buckets: vec![NO_NEXT; size],
            bitmask: (size - 1) as u64,
        };
        let f = table.put(NodeKind::Const(false));
        let t = table.put(NodeKind::Const(true));
        assert_eq!(f, NodeRef::FALSE);
        assert_eq!(t, NodeRef::TRUE);
        table
    }

    /// Number of live nodes (constants included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeRef) -> &Node {
        &self.nodes[index.index() as usize]
    }

    pub fn kind(&self, index: NodeRef) -> NodeKind {
        self.nodes[index.index() as usize].kind
    }

    /// The leaf view of a node, or `None` for internal nodes.
    pub fn leaf(&self, index: NodeRef) -> Option<Leaf> {
        match self.kind(index) {
            NodeKind::Const(false) => Some(Leaf::False),
            NodeKind::Const(true) => Some(Leaf::True),
            NodeKind::Terminal(t) => Some(Leaf::Terminal(t)),
            NodeKind::Internal { .. } => None,
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash & self.bitmask) as usize
    }

    /// Find-or-insert: returns the canonical reference for `kind`.
    pub fn put(&mut self, kind: NodeKind) -> NodeRef {
        let hash = kind.hash();
        let bucket = self.bucket_of(hash);
        let mut index = self.buckets[bucket];

        while index != NO_NEXT {
            let node = &self.nodes[index as usize];
            if node.hash == hash && node.kind == kind {
                return NodeRef::new(index);
            }
            index = node.next;
        }

        // Create a new node at the head of the chain.
        let index = self.nodes.len();
        assert!(index < NO_NEXT as usize, "Node table is full");
        self.nodes.push(Node {
            kind,
            next: self.buckets[bucket],
            hash,
        });
        self.buckets[bucket] = index as u32;

        if self.nodes.len() > 2 * self.buckets.len() {
            self.grow();
        }
        NodeRef::new(index as u32)
    }

    /// Double the bucket array and rebuild all chains.  Node indices are
    /// untouched.
    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        self.bitmask = (size - 1) as u64;
        self.buckets.clear();
        self.buckets.resize(size, NO_NEXT);
        for i in 0..self.nodes.len() {
            let bucket = self.bucket_of(self.nodes[i].hash);
            self.nodes[i].next = self.buckets[bucket];
            self.buckets[bucket] = i as u32;
        }
    }
}
