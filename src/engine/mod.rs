//! The BDD engine: hash-consed node storage plus memoized Boolean operators.
//!
//! An [`Engine`] is the explicit, caller-owned replacement for the original library's process-global
//! node cache. Every [`crate::set::IpSet`] and [`crate::map::IpMap`] value holds a shared handle to
//! one; nodes and operator cache entries live for the engine's whole lifetime and are never
//! invalidated.

use fxhash::FxBuildHasher;
use std::collections::HashMap;

mod _impl_operators;
mod _impl_serialize;

pub use _impl_serialize::save_to;
pub(crate) use _impl_serialize::load_from;

/// A variable index. Variable 0 is the IPv4/IPv6 family discriminator; variables `1..=32` and
/// `1..=128` encode address bits for IPv4 and IPv6 respectively (shared low indices).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Variable(pub(crate) u8);

impl Variable {
    pub fn new(index: u8) -> Variable {
        Variable(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Identifies one node (terminal or nonterminal) produced by an [`Engine`].
///
/// The least significant bit is a tag: terminal identifiers are odd and carry their value in the
/// remaining bits (`(value << 1) | 1`); nonterminal identifiers are even and index into the
/// engine's node vector (`index << 1`). This is an internal representation detail; node
/// identifiers from different engines must never be mixed (see [`Engine::nonterminal`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn terminal(value: u32) -> NodeId {
        NodeId((u64::from(value) << 1) | 1)
    }

    fn nonterminal(index: usize) -> NodeId {
        NodeId((index as u64) << 1)
    }

    pub fn is_terminal(self) -> bool {
        self.0 & 1 == 1
    }

    /// Returns the terminal value, or `None` if this identifier names a nonterminal.
    pub fn terminal_value(self) -> Option<u32> {
        if self.is_terminal() {
            Some((self.0 >> 1) as u32)
        } else {
            None
        }
    }

    fn node_index(self) -> usize {
        debug_assert!(!self.is_terminal());
        (self.0 >> 1) as usize
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct Node {
    variable: Variable,
    low: NodeId,
    high: NodeId,
}

/// An explicit, single-threaded BDD engine: hash-consed node storage plus memoized AND/OR/ITE.
///
/// `Engine` carries no interior mutability of its own, so mutating methods take `&mut self`; it is
/// meant to be shared as `Rc<RefCell<Engine>>` (see the crate-level docs), and `Rc` being `!Send`
/// is what keeps one engine confined to one thread. The original C library relied on an implicit
/// process-global cache with no synchronization; this crate replaces that with an explicit value
/// whose sharing discipline is visible in the type signatures that use it.
pub struct Engine {
    nodes: Vec<Node>,
    unique_table: HashMap<(Variable, NodeId, NodeId), NodeId, FxBuildHasher>,
    and_cache: HashMap<(NodeId, NodeId), NodeId, FxBuildHasher>,
    or_cache: HashMap<(NodeId, NodeId), NodeId, FxBuildHasher>,
    ite_cache: HashMap<(NodeId, NodeId, NodeId), NodeId, FxBuildHasher>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine::with_capacity(0)
    }

    /// Preallocates the hash-consing and operator-cache tables for roughly `capacity` distinct
    /// nonterminal nodes. Purely a performance hint; behaviorally identical to [`Engine::new`].
    pub fn with_capacity(capacity: usize) -> Engine {
        Engine {
            nodes: Vec::with_capacity(capacity),
            unique_table: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            and_cache: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            or_cache: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            ite_cache: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
        }
    }

    /// The canonical identifier for a terminal carrying `value`. Pure, allocation-free: two calls
    /// with the same value always return the same identifier (invariant 4, §3 of the design).
    pub fn terminal(&self, value: u32) -> NodeId {
        NodeId::terminal(value)
    }

    /// The canonical identifier for the nonterminal `(variable, low, high)`.
    ///
    /// If `low == high` the node is redundant and `low` is returned directly (reducedness, §3
    /// invariant 1) without touching the hash-consing table. Otherwise performs a lookup-or-insert
    /// keyed by the triple, so repeated calls with the same triple always return the same
    /// identifier (invariant 2).
    pub fn nonterminal(&mut self, variable: Variable, low: NodeId, high: NodeId) -> NodeId {
        if low == high {
            return low;
        }
        if let Some(existing) = self.unique_table.get(&(variable, low, high)) {
            log::trace!("node cache hit for {:?}/{:?}/{:?}", variable, low, high);
            return *existing;
        }
        let index = self.nodes.len();
        self.nodes.push(Node { variable, low, high });
        let id = NodeId::nonterminal(index);
        self.unique_table.insert((variable, low, high), id);
        log::trace!("node cache miss, allocated {:?} for {:?}/{:?}/{:?}", id, variable, low, high);
        id
    }

    fn node(&self, id: NodeId) -> Node {
        debug_assert!(!id.is_terminal(), "attempted to inspect a terminal as a nonterminal node");
        self.nodes[id.node_index()]
    }

    pub fn is_terminal(&self, id: NodeId) -> bool {
        id.is_terminal()
    }

    pub fn variable(&self, id: NodeId) -> Option<Variable> {
        if id.is_terminal() {
            None
        } else {
            Some(self.node(id).variable)
        }
    }

    fn low(&self, id: NodeId) -> NodeId {
        self.node(id).low
    }

    fn high(&self, id: NodeId) -> NodeId {
        self.node(id).high
    }

    /// The `low` child of a nonterminal. Panics (in debug builds) if `id` is a terminal.
    pub fn node_low(&self, id: NodeId) -> NodeId {
        self.low(id)
    }

    /// The `high` child of a nonterminal. Panics (in debug builds) if `id` is a terminal.
    pub fn node_high(&self, id: NodeId) -> NodeId {
        self.high(id)
    }

    /// Evaluates `id` under the given oracle, which supplies a Boolean value for each variable
    /// encountered while descending the diagram. Returns the reached terminal's value.
    pub fn evaluate(&self, mut id: NodeId, oracle: impl Fn(Variable) -> bool) -> u32 {
        while !id.is_terminal() {
            let node = self.node(id);
            id = if oracle(node.variable) { node.high } else { node.low };
        }
        id.terminal_value().unwrap()
    }

    /// Counts distinct reachable nonterminals from `id`. This is the normative size metric for a
    /// set or map; see [`Engine::memory_size`] for a derived, approximate byte count.
    pub fn reachable_count(&self, id: NodeId) -> usize {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![id];
        let mut count = 0;
        while let Some(current) = stack.pop() {
            if current.is_terminal() || !seen.insert(current) {
                continue;
            }
            count += 1;
            let node = self.node(current);
            stack.push(node.low);
            stack.push(node.high);
        }
        count
    }

    /// An implementation hint, not a normative metric (see design notes): approximates the bytes
    /// used by the reachable portion of `id` as `reachable_count(id) * size_of::<Node>()`.
    pub fn memory_size(&self, id: NodeId) -> usize {
        self.reachable_count(id) * std::mem::size_of::<Node>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn reducedness_elides_nodes_with_equal_children() {
        let mut engine = Engine::new();
        let x = engine.terminal(1);
        assert_eq!(engine.nonterminal(Variable::new(0), x, x), x);

        let f = engine.terminal(0);
        let child = engine.nonterminal(Variable::new(1), f, x);
        assert_eq!(engine.nonterminal(Variable::new(0), child, child), child);
    }

    #[test]
    fn hash_consing_returns_the_same_identifier_for_the_same_triple() {
        let mut engine = Engine::new();
        let f = engine.terminal(0);
        let t = engine.terminal(1);
        let a = engine.nonterminal(Variable::new(3), f, t);
        let b = engine.nonterminal(Variable::new(3), f, t);
        assert_eq!(a, b);
        assert_eq!(engine.reachable_count(a), 1);
    }

    #[test]
    fn terminal_canonicity_matches_value_equality() {
        let engine = Engine::new();
        assert_eq!(engine.terminal(5), engine.terminal(5));
        assert_ne!(engine.terminal(5), engine.terminal(6));
    }

    #[test]
    fn randomized_nonterminal_calls_always_hash_cons_to_one_node_per_distinct_triple() {
        let mut engine = Engine::new();
        let mut rng = rand::thread_rng();
        let f = engine.terminal(0);
        let t = engine.terminal(1);

        // Build the same small set of distinct triples through many random call orders; the
        // number of distinct nodes allocated must never exceed the number of distinct triples
        // actually requested (invariant 2, §3).
        let mut seen_ids = std::collections::HashSet::new();
        for _ in 0..500 {
            let variable = Variable::new(rng.gen_range(0, 8));
            let id = engine.nonterminal(variable, f, t);
            seen_ids.insert(id);
        }
        assert_eq!(seen_ids.len(), 8);
    }

    #[test]
    fn evaluate_follows_high_iff_oracle_is_true() {
        let mut engine = Engine::new();
        let f = engine.terminal(0);
        let t = engine.terminal(1);
        let root = engine.nonterminal(Variable::new(2), f, t);
        assert_eq!(engine.evaluate(root, |_| true), 1);
        assert_eq!(engine.evaluate(root, |_| false), 0);
    }

    #[test]
    fn ordering_invariant_holds_on_every_constructed_chain() {
        let mut engine = Engine::new();
        let mut result = engine.terminal(1);
        let f = engine.terminal(0);
        for v in (0..16).rev() {
            result = engine.nonterminal(Variable::new(v), f, result);
        }

        let mut id = result;
        let mut last_variable: Option<Variable> = None;
        while let Some(variable) = engine.variable(id) {
            if let Some(last) = last_variable {
                assert!(last.index() < variable.index());
            }
            last_variable = Some(variable);
            id = engine.node_high(id);
        }
    }
}
