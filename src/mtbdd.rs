//! The MTBDD manager.
//!
//! A reduced, ordered decision diagram over Boolean variables, extended with
//! *terminal* leaves that carry `(state, may-stop)` payloads.  All operations
//! go through the [`Mtbdd`] manager, which owns the node-identity table and
//! guarantees structural sharing: equal diagrams have equal [`NodeRef`]s.
//!
//! Three families of operations are provided:
//!
//! - **Pure-BDD operations** (`apply_ite`, `apply_and`, ...) for diagrams
//!   whose only leaves are the constants.  These use a manager-owned cache
//!   so their entries are long lived.
//! - **Multi-terminal melds** ([`Mtbdd::apply2`], [`Mtbdd::apply1`]) whose
//!   behaviour on leaves is supplied by a caller context implementing
//!   [`Apply2Op`] / [`Apply1Op`].  The context is threaded explicitly; the
//!   caller also supplies the operation cache, so composite operations can
//!   bring a dedicated, pre-sized cache and drop it when done.
//! - **Game-quantified operations** (`quantify_bool`, `restrict_winning`,
//!   ...) that interpret variables marked *controllable* existentially and
//!   the rest universally.  [`Mtbdd::quantify_prepare`] precomputes the
//!   per-variable flags; it must be re-run whenever the variable set grows
//!   (node identities stay valid, only the flags are invalidated).

use bitvec::bitvec;
use bitvec::vec::BitVec;
use hashbrown::HashSet;

use crate::cache::Cache;
use crate::node::{NodeKind, NodeTable};
use crate::types::{Leaf, Lit, NodeRef, Terminal, Var};

/// Cache for binary multi-terminal operations, keyed by `(op, left, right)`.
pub type Cache2 = Cache<(u32, NodeRef, NodeRef), NodeRef>;
/// Cache for unary multi-terminal operations, keyed by `(op, node)`.
pub type Cache1 = Cache<(u32, NodeRef), NodeRef>;
/// Cache for Boolean game evaluation.
pub type BoolCache = Cache<(u32, NodeRef), bool>;
/// Cache for three-valued game evaluation (`None` = undetermined).
pub type TrivalCache = Cache<(u32, NodeRef), Option<bool>>;
/// Cache for the fused rewrite-and-evaluate operation.
pub type SynthCache = Cache<(u32, NodeRef), (NodeRef, bool)>;

/// Leaf combiner for [`Mtbdd::apply2`].
///
/// `combine` is invoked once both cofactor operands are leaves; `shortcut`
/// may short-circuit on purely Boolean grounds (e.g. and-with-zero) before
/// any recursion happens.
pub trait Apply2Op {
    /// Purely Boolean short-circuit, checked before recursing.
    fn shortcut(&self, _left: NodeRef, _right: NodeRef) -> Option<NodeRef> {
        None
    }

    /// Combine two leaves into a result node.
    fn combine(&mut self, bdd: &mut Mtbdd, left: Leaf, right: Leaf) -> NodeRef;
}

/// Leaf rewriter for [`Mtbdd::apply1`].
pub trait Apply1Op {
    /// Map a leaf to its replacement node.
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef;
}

/// Leaf valuation for [`Mtbdd::quantify_bool`].
pub trait LeafValue {
    fn value(&mut self, leaf: Leaf) -> bool;
}

/// Leaf valuation for [`Mtbdd::quantify_trival`]; `None` means undetermined.
pub trait LeafValue3 {
    fn value(&mut self, leaf: Leaf) -> Option<bool>;
}

/// Leaf rewriter-with-valuation for [`Mtbdd::restrict_winning`]: each leaf
/// maps to a replacement node plus its game value.
pub trait SynthesisOp {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> (NodeRef, bool);
}

/// Strategy projector for [`Mtbdd::restrict_with_choice`].
pub trait ChoiceOp {
    /// The child (low or high of `node`) the strategy commits to at a
    /// controllable decision node, or `None` if no choice was recorded.
    fn choose(&mut self, bdd: &Mtbdd, node: NodeRef) -> Option<NodeRef>;

    /// Map a leaf to its replacement node.
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef;
}

/// The default leaf valuation: constants evaluate to themselves, terminals
/// to their may-stop bit.
pub struct AcceptingValue;

impl LeafValue for AcceptingValue {
    fn value(&mut self, leaf: Leaf) -> bool {
        leaf.is_accepting()
    }
}

/// The MTBDD manager.
pub struct Mtbdd {
    table: NodeTable,
    ite_cache: Cache<(NodeRef, NodeRef, NodeRef), NodeRef>,
    /// Per-variable controllability flags, set by `quantify_prepare`.
    controllable: BitVec,
    /// Variable count captured by the last `quantify_prepare` call.
    prepared_vars: usize,
}

impl Default for Mtbdd {
    fn default() -> Self {
        Mtbdd::new(16)
    }
}

impl std::fmt::Debug for Mtbdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mtbdd")
            .field("num_nodes", &self.num_nodes())
            .field("prepared_vars", &self.prepared_vars)
            .finish()
    }
}

impl Mtbdd {
    pub fn new(bucket_bits: usize) -> Self {
        Self {
            table: NodeTable::new(bucket_bits),
            ite_cache: Cache::new(16),
            controllable: BitVec::new(),
            prepared_vars: 0,
        }
    }

    /// Number of live nodes, constants included.
    pub fn num_nodes(&self) -> usize {
        self.table.len()
    }

    pub fn kind(&self, node: NodeRef) -> NodeKind {
        self.table.kind(node)
    }

    /// The leaf view of a node, or `None` for internal nodes.
    pub fn leaf(&self, node: NodeRef) -> Option<Leaf> {
        self.table.leaf(node)
    }

    pub fn is_leaf(&self, node: NodeRef) -> bool {
        self.table.leaf(node).is_some()
    }

    pub fn is_terminal(&self, node: NodeRef) -> bool {
        matches!(self.kind(node), NodeKind::Terminal(_))
    }

    /// The terminal payload of a node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a terminal.
    pub fn terminal_value(&self, node: NodeRef) -> Terminal {
        match self.kind(node) {
            NodeKind::Terminal(t) => t,
            other => panic!("terminal_value: {} is not a terminal but {:?}", node, other),
        }
    }

    /// The decision variable of an internal node.
    ///
    /// # Panics
    ///
    /// Panics if the node is a leaf.
    pub fn var_of(&self, node: NodeRef) -> Var {
        match self.kind(node) {
            NodeKind::Internal { var, .. } => var,
            other => panic!("var_of: {} is a leaf {:?}", node, other),
        }
    }

    pub fn low(&self, node: NodeRef) -> NodeRef {
        match self.kind(node) {
            NodeKind::Internal { low, .. } => low,
            other => panic!("low: {} is a leaf {:?}", node, other),
        }
    }

    pub fn high(&self, node: NodeRef) -> NodeRef {
        match self.kind(node) {
            NodeKind::Internal { high, .. } => high,
            other => panic!("high: {} is a leaf {:?}", node, other),
        }
    }

    pub fn constant(&self, value: bool) -> NodeRef {
        if value {
            NodeRef::TRUE
        } else {
            NodeRef::FALSE
        }
    }

    /// The canonical terminal node for the given payload.
    pub fn terminal(&mut self, t: Terminal) -> NodeRef {
        self.table.put(NodeKind::Terminal(t))
    }

    /// The BDD of a single positive variable.
    pub fn mk_var(&mut self, var: Var) -> NodeRef {
        self.mk_node(var, NodeRef::FALSE, NodeRef::TRUE)
    }

    /// The BDD of a single negative variable.
    pub fn mk_nvar(&mut self, var: Var) -> NodeRef {
        self.mk_node(var, NodeRef::TRUE, NodeRef::FALSE)
    }

    /// Canonical decision-node constructor: removes `low == high`
    /// redundancies and shares equal nodes.
    pub fn mk_node(&mut self, var: Var, low: NodeRef, high: NodeRef) -> NodeRef {
        if low == high {
            return low;
        }
        debug_assert!(
            self.is_leaf(low) || self.var_of(low) > var,
            "mk_node: low child {} violates the variable order",
            low
        );
        debug_assert!(
            self.is_leaf(high) || self.var_of(high) > var,
            "mk_node: high child {} violates the variable order",
            high
        );
        self.table.put(NodeKind::Internal { var, low, high })
    }

    /// The topmost (smallest) decision variable among the given nodes.
    /// Returns `None` if all are leaves.
    fn top_var(&self, nodes: &[NodeRef]) -> Option<Var> {
        nodes
            .iter()
            .filter_map(|&n| match self.kind(n) {
                NodeKind::Internal { var, .. } => Some(var),
                _ => None,
            })
            .min()
    }

    /// Both cofactors of `node` with respect to `var`.  `var` must not be
    /// below the node's top variable.
    pub fn cofactors(&self, node: NodeRef, var: Var) -> (NodeRef, NodeRef) {
        match self.kind(node) {
            NodeKind::Internal { var: v, low, high } => {
                debug_assert!(v >= var, "cofactors: {} is above {}", v, var);
                if v == var {
                    (low, high)
                } else {
                    (node, node)
                }
            }
            _ => (node, node),
        }
    }

    /// Evaluate a diagram under a full assignment, returning the leaf
    /// reached.
    pub fn eval(&self, node: NodeRef, assign: &impl Fn(Var) -> bool) -> NodeRef {
        let mut n = node;
        loop {
            match self.kind(n) {
                NodeKind::Internal { var, low, high } => {
                    n = if assign(var) { high } else { low };
                }
                _ => return n,
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
//                      pure-BDD operations                           //
////////////////////////////////////////////////////////////////////////

impl Mtbdd {
    /// Apply the ITE operation to pure-BDD arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Panics
    ///
    /// Debug-panics if an argument's root is a multi-terminal leaf: ITE is
    /// reserved for purely Boolean diagrams (atomic propositions and
    /// propositional fingerprints).
    pub fn apply_ite(&mut self, f: NodeRef, g: NodeRef, h: NodeRef) -> NodeRef {
        debug_assert!(!self.is_terminal(f), "ITE is a pure-BDD operation");
        debug_assert!(!self.is_terminal(g), "ITE is a pure-BDD operation");
        debug_assert!(!self.is_terminal(h), "ITE is a pure-BDD operation");

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        if f.is_true() {
            return g;
        }
        if f.is_false() {
            return h;
        }
        if g == h {
            return g;
        }
        if g.is_true() && h.is_false() {
            return f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        let g = if g == f { NodeRef::TRUE } else { g };
        let h = if h == f { NodeRef::FALSE } else { h };

        if let Some(&res) = self.ite_cache.get(&(f, g, h)) {
            return res;
        }

        let m = self
            .top_var(&[f, g, h])
            .expect("ite: at least one argument must be internal");
        let (f0, f1) = self.cofactors(f, m);
        let (g0, g1) = self.cofactors(g, m);
        let (h0, h1) = self.cofactors(h, m);

        let low = self.apply_ite(f0, g0, h0);
        let high = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, low, high);

        self.ite_cache.insert((f, g, h), res);
        res
    }

    pub fn apply_not(&mut self, f: NodeRef) -> NodeRef {
        self.apply_ite(f, NodeRef::FALSE, NodeRef::TRUE)
    }

    pub fn apply_and(&mut self, f: NodeRef, g: NodeRef) -> NodeRef {
        self.apply_ite(f, g, NodeRef::FALSE)
    }

    pub fn apply_or(&mut self, f: NodeRef, g: NodeRef) -> NodeRef {
        self.apply_ite(f, NodeRef::TRUE, g)
    }

    pub fn apply_imp(&mut self, f: NodeRef, g: NodeRef) -> NodeRef {
        self.apply_ite(f, g, NodeRef::TRUE)
    }

    pub fn apply_xor(&mut self, f: NodeRef, g: NodeRef) -> NodeRef {
        let ng = self.apply_not(g);
        self.apply_ite(f, ng, g)
    }

    pub fn apply_eq(&mut self, f: NodeRef, g: NodeRef) -> NodeRef {
        let ng = self.apply_not(g);
        self.apply_ite(f, g, ng)
    }
}

////////////////////////////////////////////////////////////////////////
//                   multi-terminal apply operations                  //
////////////////////////////////////////////////////////////////////////

impl Mtbdd {
    /// Cofactor-recursion meld of two MTBDDs.
    ///
    /// The leaf behaviour lives in `op`; results are memoized in the
    /// caller-supplied `cache` under `(key, left, right)`.  Distinct
    /// operations sharing one cache must use distinct keys.
    pub fn apply2<O: Apply2Op>(
        &mut self,
        left: NodeRef,
        right: NodeRef,
        op: &mut O,
        cache: &mut Cache2,
        key: u32,
    ) -> NodeRef {
        if let Some(res) = op.shortcut(left, right) {
            return res;
        }
        if let (Some(l), Some(r)) = (self.leaf(left), self.leaf(right)) {
            return op.combine(self, l, r);
        }

        let k = (key, left, right);
        if let Some(&res) = cache.get(&k) {
            return res;
        }

        let m = self
            .top_var(&[left, right])
            .expect("apply2: at least one operand must be internal");
        let (l0, l1) = self.cofactors(left, m);
        let (r0, r1) = self.cofactors(right, m);

        let low = self.apply2(l0, r0, op, cache, key);
        let high = self.apply2(l1, r1, op, cache, key);
        let res = self.mk_node(m, low, high);

        cache.insert(k, res);
        res
    }

    /// Cofactor-recursion rewrite of a single MTBDD: every leaf is replaced
    /// by `op.map_leaf`, internal structure is preserved (then re-reduced).
    pub fn apply1<O: Apply1Op>(
        &mut self,
        node: NodeRef,
        op: &mut O,
        cache: &mut Cache1,
        key: u32,
    ) -> NodeRef {
        if let Some(leaf) = self.leaf(node) {
            return op.map_leaf(self, leaf);
        }

        let k = (key, node);
        if let Some(&res) = cache.get(&k) {
            return res;
        }

        let NodeKind::Internal { var, low, high } = self.kind(node) else {
            unreachable!()
        };
        let low = self.apply1(low, op, cache, key);
        let high = self.apply1(high, op, cache, key);
        let res = self.mk_node(var, low, high);

        cache.insert(k, res);
        res
    }
}

////////////////////////////////////////////////////////////////////////
//                     game-quantified operations                     //
////////////////////////////////////////////////////////////////////////

impl Mtbdd {
    /// Precompute the per-variable controllability flags used by the
    /// quantified operations below.
    ///
    /// Must be called again whenever the variable set has grown since the
    /// last call (compare [`Mtbdd::prepared_vars`] against the dictionary
    /// size).  Growing the variable set does not invalidate nodes or
    /// operation caches, only this precomputation.
    pub fn quantify_prepare(&mut self, outputs: &[Var], num_vars: usize) {
        self.controllable = bitvec![0; num_vars + 1];
        for &v in outputs {
            let i = v.id() as usize;
            assert!(i <= num_vars, "quantify_prepare: {} is not a registered variable", v);
            self.controllable.set(i, true);
        }
        self.prepared_vars = num_vars;
    }

    /// The variable count captured by the last [`Mtbdd::quantify_prepare`].
    pub fn prepared_vars(&self) -> usize {
        self.prepared_vars
    }

    /// Whether the existential player controls this variable.
    pub fn is_controllable(&self, var: Var) -> bool {
        let i = var.id() as usize;
        i < self.controllable.len() && self.controllable[i]
    }

    /// `(owner, low, high)` of an internal node, where `owner` is true iff
    /// the node's variable is controllable.
    pub fn quantified_children(&self, node: NodeRef) -> (bool, NodeRef, NodeRef) {
        match self.kind(node) {
            NodeKind::Internal { var, low, high } => (self.is_controllable(var), low, high),
            other => panic!("quantified_children: {} is a leaf {:?}", node, other),
        }
    }

    /// Game value of a diagram: OR over controllable variables, AND over
    /// uncontrollable ones, `vals` at the leaves.
    pub fn quantify_bool<V: LeafValue>(
        &self,
        node: NodeRef,
        vals: &mut V,
        cache: &mut BoolCache,
        key: u32,
    ) -> bool {
        if let Some(leaf) = self.leaf(node) {
            return vals.value(leaf);
        }
        let k = (key, node);
        if let Some(&res) = cache.get(&k) {
            return res;
        }
        let NodeKind::Internal { var, low, high } = self.kind(node) else {
            unreachable!()
        };
        let lv = self.quantify_bool(low, vals, cache, key);
        let res = if self.is_controllable(var) {
            lv || self.quantify_bool(high, vals, cache, key)
        } else {
            lv && self.quantify_bool(high, vals, cache, key)
        };
        cache.insert(k, res);
        res
    }

    /// Three-valued variant of [`Mtbdd::quantify_bool`]: `None` marks
    /// undetermined leaves, and determination propagates only when forced.
    pub fn quantify_trival<V: LeafValue3>(
        &self,
        node: NodeRef,
        vals: &mut V,
        cache: &mut TrivalCache,
        key: u32,
    ) -> Option<bool> {
        if let Some(leaf) = self.leaf(node) {
            return vals.value(leaf);
        }
        let k = (key, node);
        if let Some(&res) = cache.get(&k) {
            return res;
        }
        let NodeKind::Internal { var, low, high } = self.kind(node) else {
            unreachable!()
        };
        let lv = self.quantify_trival(low, vals, cache, key);
        let res = if self.is_controllable(var) {
            // The controller needs one winning branch.
            if lv == Some(true) {
                Some(true)
            } else {
                match (lv, self.quantify_trival(high, vals, cache, key)) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            }
        } else {
            // The environment needs one losing branch.
            if lv == Some(false) {
                Some(false)
            } else {
                match (lv, self.quantify_trival(high, vals, cache, key)) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            }
        };
        cache.insert(k, res);
        res
    }

    /// Fused leaf rewrite and game evaluation: leaves are replaced according
    /// to `op` while the game value of the diagram is computed bottom-up.
    /// Returns the rewritten diagram and the value of its root.
    pub fn restrict_winning<O: SynthesisOp>(
        &mut self,
        node: NodeRef,
        op: &mut O,
        cache: &mut SynthCache,
        key: u32,
    ) -> (NodeRef, bool) {
        if let Some(leaf) = self.leaf(node) {
            return op.map_leaf(self, leaf);
        }
        let k = (key, node);
        if let Some(&res) = cache.get(&k) {
            return res;
        }
        let NodeKind::Internal { var, low, high } = self.kind(node) else {
            unreachable!()
        };
        let (low, lv) = self.restrict_winning(low, op, cache, key);
        let (high, hv) = self.restrict_winning(high, op, cache, key);
        let value = if self.is_controllable(var) {
            lv || hv
        } else {
            lv && hv
        };
        let res = (self.mk_node(var, low, high), value);
        cache.insert(k, res);
        res
    }

    /// Project a solved strategy into a diagram: at a controllable node the
    /// branch not chosen by `op` is replaced by `0`, leaves are rewritten by
    /// `op.map_leaf`.
    pub fn restrict_with_choice<O: ChoiceOp>(
        &mut self,
        node: NodeRef,
        op: &mut O,
        cache: &mut Cache1,
        key: u32,
    ) -> NodeRef {
        if let Some(leaf) = self.leaf(node) {
            return op.map_leaf(self, leaf);
        }
        let k = (key, node);
        if let Some(&res) = cache.get(&k) {
            return res;
        }
        let NodeKind::Internal { var, low, high } = self.kind(node) else {
            unreachable!()
        };
        let res = if self.is_controllable(var) {
            match op.choose(self, node) {
                Some(chosen) if chosen == low => {
                    let low = self.restrict_with_choice(low, op, cache, key);
                    self.mk_node(var, low, NodeRef::FALSE)
                }
                Some(chosen) => {
                    debug_assert_eq!(chosen, high, "choice must be a child of the node");
                    let high = self.restrict_with_choice(high, op, cache, key);
                    self.mk_node(var, NodeRef::FALSE, high)
                }
                None => {
                    let low = self.restrict_with_choice(low, op, cache, key);
                    let high = self.restrict_with_choice(high, op, cache, key);
                    self.mk_node(var, low, high)
                }
            }
        } else {
            let low = self.restrict_with_choice(low, op, cache, key);
            let high = self.restrict_with_choice(high, op, cache, key);
            self.mk_node(var, low, high)
        };
        cache.insert(k, res);
        res
    }
}

////////////////////////////////////////////////////////////////////////
//                        traversal utilities                         //
////////////////////////////////////////////////////////////////////////

impl Mtbdd {
    /// Iterator over the `(cube, leaf)` pairs of a diagram.  Branches ending
    /// in the constant `0` are skipped; iteration is depth-first with the
    /// low branch explored first, so the order is deterministic.
    pub fn paths(&self, node: NodeRef) -> Paths<'_> {
        Paths::new(self, node)
    }

    /// The distinct leaves reachable from `node`, in discovery order.
    pub fn leaves(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            match self.kind(n) {
                NodeKind::Internal { low, high, .. } => {
                    stack.push(high);
                    stack.push(low);
                }
                _ => result.push(n),
            }
        }
        result
    }

    /// Whether some leaf reachable from `roots` satisfies the predicate.
    pub fn find_leaf(&self, roots: &[NodeRef], pred: impl Fn(Leaf) -> bool) -> bool {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeRef> = roots.to_vec();
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            match self.kind(n) {
                NodeKind::Internal { low, high, .. } => {
                    stack.push(high);
                    stack.push(low);
                }
                _ => {
                    if pred(self.leaf(n).unwrap()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// All nodes reachable from `roots` (leaves included).
    pub fn descendants(&self, roots: impl IntoIterator<Item = NodeRef>) -> Vec<NodeRef> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack: Vec<NodeRef> = roots.into_iter().collect();
        stack.reverse();
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            result.push(n);
            if let NodeKind::Internal { low, high, .. } = self.kind(n) {
                stack.push(high);
                stack.push(low);
            }
        }
        result
    }
}

/// Iterator state for exploring a single node.
#[derive(Debug, Clone, Copy)]
enum Branch {
    /// About to explore the low (else) branch
    Low,
    /// About to explore the high (then) branch
    High,
}

/// Frame on the exploration stack.
#[derive(Debug)]
struct StackFrame {
    node: NodeRef,
    /// Which branch to explore next (None if both explored)
    next_branch: Option<Branch>,
}

/// An iterator over the accepted cubes of an MTBDD.
///
/// Created by [`Mtbdd::paths()`].  Each item is a `(cube, leaf)` pair where
/// the cube is the conjunction of literals selecting the branch and the leaf
/// is a constant `1` or a terminal.  The current path is maintained in a
/// single vector that grows and shrinks during traversal, so only yielded
/// cubes are allocated.
pub struct Paths<'a> {
    bdd: &'a Mtbdd,
    stack: Vec<StackFrame>,
    current_path: Vec<Lit>,
}

impl<'a> Paths<'a> {
    fn new(bdd: &'a Mtbdd, node: NodeRef) -> Self {
        Paths {
            bdd,
            stack: vec![StackFrame {
                node,
                next_branch: Some(Branch::Low),
            }],
            current_path: Vec::new(),
        }
    }
}

impl Iterator for Paths<'_> {
    type Item = (Vec<Lit>, NodeRef);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node = frame.node;
            let next_branch = frame.next_branch;

            if self.bdd.is_leaf(node) {
                let result = if node.is_false() {
                    None // dead end
                } else {
                    Some((self.current_path.clone(), node))
                };
                self.stack.pop();
                if !self.stack.is_empty() {
                    self.current_path.pop();
                }
                match result {
                    Some(r) => return Some(r),
                    None => continue,
                }
            }

            let var = self.bdd.var_of(node);
            match next_branch {
                Some(Branch::Low) => {
                    frame.next_branch = Some(Branch::High);
                    let low = self.bdd.low(node);
                    self.current_path.push(Lit::neg(var));
                    self.stack.push(StackFrame {
                        node: low,
                        next_branch: Some(Branch::Low),
                    });
                }
                Some(Branch::High) => {
                    frame.next_branch = None;
                    let high = self.bdd.high(node);
                    self.current_path.push(Lit::pos(var));
                    self.stack.push(StackFrame {
                        node: high,
                        next_branch: Some(Branch::Low),
                    });
                }
                None => {
                    self.stack.pop();
                    if !self.stack.is_empty() {
                        self.current_path.pop();
                    }
                }
            }
        }
    }
}
