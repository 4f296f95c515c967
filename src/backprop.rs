//! The game arena and its backpropagation solver.
//!
//! A [`BackpropGraph`] is a two-player game graph built incrementally.
//! Each vertex has an *owner* (`true` = the controller, who wins on
//! acceptance; `false` = the environment), and determination propagates
//! backwards through a reverse-adjacency list as soon as it is forced:
//!
//! - a vertex owned by player `P` becomes `P`-winning the moment one of its
//!   successors is `P`-winning (the edge is recorded as its *choice*);
//! - it becomes `!P`-winning once *all* of its successors are `!P`-winning
//!   and the vertex is *frozen* (no further edges may be added);
//! - a frozen vertex with no successors loses for its owner.
//!
//! By convention vertex 0 stands for the initial state; with `stop_asap`
//! the solver reports as soon as vertex 0 is determined so that on-the-fly
//! exploration can stop early.
//!
//! The graph is pure data: no callbacks, just vertices, counters and the
//! reverse edges.  Freezing a frozen vertex or re-determining a determined
//! vertex is a programmer error and panics.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;
use log::debug;

/// A vertex of the arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct VertexId(u32);

impl VertexId {
    /// Sentinel for "no choice recorded".
    pub const NONE: VertexId = VertexId(u32::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Copy, Clone)]
struct BackpropVertex {
    /// Owning player: `true` is the controller.
    owner: bool,
    /// No more outgoing edges may be added.
    frozen: bool,
    determined: bool,
    winner: bool,
    /// Winning successor, when the owner wins here.
    choice: VertexId,
    /// Outgoing edges whose target is not yet determined.
    counter: u32,
}

/// An incrementally-built two-player reachability game.
pub struct BackpropGraph {
    vertices: Vec<BackpropVertex>,
    /// reverse[d] lists the sources of edges into `d`.
    reverse: Vec<Vec<VertexId>>,
    stop_asap: bool,
    names: HashMap<u32, String>,
}

impl BackpropGraph {
    /// `stop_asap` makes every mutation report `true` as soon as vertex 0
    /// is determined.
    pub fn new(stop_asap: bool) -> Self {
        BackpropGraph {
            vertices: Vec::new(),
            reverse: Vec::new(),
            stop_asap,
            names: HashMap::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Add a fresh undetermined vertex for the given owner.
    pub fn new_vertex(&mut self, owner: bool) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(BackpropVertex {
            owner,
            frozen: false,
            determined: false,
            winner: false,
            choice: VertexId::NONE,
            counter: 0,
        });
        self.reverse.push(Vec::new());
        id
    }

    pub fn owner(&self, v: VertexId) -> bool {
        self.vertices[v.index()].owner
    }

    pub fn is_frozen(&self, v: VertexId) -> bool {
        self.vertices[v.index()].frozen
    }

    pub fn is_determined(&self, v: VertexId) -> bool {
        self.vertices[v.index()].determined
    }

    /// The winner of a determined vertex.
    ///
    /// # Panics
    ///
    /// Panics if the vertex is not determined yet.
    pub fn winner(&self, v: VertexId) -> bool {
        let vx = &self.vertices[v.index()];
        assert!(vx.determined, "winner: {} is not determined", v);
        vx.winner
    }

    /// The winning successor recorded for a determined vertex whose owner
    /// wins, or [`VertexId::NONE`].
    pub fn choice(&self, v: VertexId) -> VertexId {
        self.vertices[v.index()].choice
    }

    pub fn set_name(&mut self, v: VertexId, name: impl Into<String>) {
        self.names.insert(v.0, name.into());
    }

    /// Add the edge `src -> dst`.  Returns `true` iff this caused vertex 0
    /// to become determined (with `stop_asap`).
    ///
    /// # Panics
    ///
    /// Panics if `src` is frozen.
    pub fn new_edge(&mut self, src: VertexId, dst: VertexId) -> bool {
        let sv = self.vertices[src.index()];
        assert!(!sv.frozen, "new_edge: cannot add a successor to frozen {}", src);
        if sv.determined {
            // The edge cannot influence anything anymore.
            return false;
        }
        let dv = self.vertices[dst.index()];
        if !dv.determined {
            // Declare the edge for backward propagation.
            self.reverse[dst.index()].push(src);
            self.vertices[src.index()].counter += 1;
        } else if sv.owner == dv.winner {
            return self.set_winner(src, sv.owner, dst);
        }
        // Edges into positions won by the opponent are irrelevant: either
        // the counter saves us, or freezing will conclude.
        false
    }

    /// Declare that `v` has all its successors.  Returns `true` iff this
    /// caused vertex 0 to become determined (with `stop_asap`).
    ///
    /// # Panics
    ///
    /// Panics if `v` is already frozen.
    pub fn freeze(&mut self, v: VertexId) -> bool {
        let vx = &mut self.vertices[v.index()];
        assert!(!vx.frozen, "freeze: {} is already frozen", v);
        vx.frozen = true;
        if !vx.determined && vx.counter == 0 {
            let owner = vx.owner;
            return self.set_winner(v, !owner, VertexId::NONE);
        }
        false
    }

    /// Determine `v` for `winner` and propagate backwards.  Returns `true`
    /// iff vertex 0 became determined (always, even without `stop_asap`,
    /// so callers can poll).
    ///
    /// # Panics
    ///
    /// Panics if `v` is already determined.
    pub fn set_winner(&mut self, v: VertexId, winner: bool, choice: VertexId) -> bool {
        {
            let vx = &mut self.vertices[v.index()];
            assert!(!vx.determined, "set_winner: {} is already determined", v);
            vx.determined = true;
            vx.winner = winner;
            vx.choice = choice;
        }
        debug!("set_winner({}, {}) propagating", v, winner);

        let mut todo = VecDeque::new();
        todo.push_back(v);
        let mut result = v.index() == 0;
        while let Some(s) = todo.pop_front() {
            let winner = self.vertices[s.index()].winner;
            let preds = std::mem::take(&mut self.reverse[s.index()]);
            for &p in &preds {
                let pv = &mut self.vertices[p.index()];
                if pv.determined {
                    continue;
                }
                let exist_choice = pv.owner == winner;
                let forced = if exist_choice {
                    true
                } else {
                    pv.counter -= 1;
                    pv.counter == 0 && pv.frozen
                };
                if forced {
                    pv.determined = true;
                    pv.winner = winner;
                    if exist_choice {
                        pv.choice = s;
                    }
                    if p.index() == 0 {
                        result = true;
                        if self.stop_asap {
                            self.reverse[s.index()] = preds;
                            return true;
                        }
                    }
                    todo.push_back(p);
                }
            }
            self.reverse[s.index()] = preds;
        }
        result
    }

    /// Render the arena in DOT format: diamonds for controller vertices,
    /// boxes for environment ones, green/red fill for determined winners,
    /// bold edges for recorded choices.
    pub fn to_dot(&self) -> String {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph arena {{").unwrap();
        writeln!(dot, "  rankdir=TB;").unwrap();
        for (i, vx) in self.vertices.iter().enumerate() {
            let shape = if vx.owner { "diamond" } else { "box" };
            let mut style = String::from("filled");
            if !vx.owner {
                style.push_str(",rounded");
            }
            if !vx.frozen {
                style.push_str(",dashed");
            }
            let fill = if !vx.determined {
                "white"
            } else if vx.winner {
                "\"#33A02C\""
            } else {
                "\"#E31A1C\""
            };
            write!(
                dot,
                "  {} [shape={}, style=\"{}\", fillcolor={}, label=\"",
                i, shape, style, fill
            )
            .unwrap();
            match self.names.get(&(i as u32)) {
                Some(name) => write!(dot, "{}", name.replace('"', "\\\"")).unwrap(),
                None => write!(dot, "{}", i).unwrap(),
            }
            writeln!(dot, "\"];").unwrap();
        }
        for (dst, preds) in self.reverse.iter().enumerate() {
            for p in preds {
                let pv = &self.vertices[p.index()];
                let chosen = pv.determined && pv.winner == pv.owner && pv.choice == VertexId(dst as u32);
                if chosen {
                    writeln!(dot, "  {} -> {} [penwidth=2];", p.index(), dst).unwrap();
                } else {
                    writeln!(dot, "  {} -> {};", p.index(), dst).unwrap();
                }
            }
        }
        dot.push_str("}\n");
        dot
    }
}
