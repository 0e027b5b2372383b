//! Memoized binary (AND/OR) and ternary (ITE) Boolean operators.
//!
//! The binary operators are implemented with the same iterative, task-stack-driven recursion the
//! teacher library uses (see `bdd_u16::_impl_bdd_apply`), generalized so the node store and
//! operator caches are persistent fields of [`Engine`] rather than structures rebuilt on every
//! call. Because every node the engine has ever produced remains valid for its whole lifetime, a
//! cached `(op, x, y) -> z` entry never needs to be invalidated.

use crate::engine::{Engine, NodeId, Variable};
use std::cmp::min;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    fn terminal(self, a: u32, b: u32) -> u32 {
        match self {
            BoolOp::And => {
                if a != 0 && b != 0 {
                    1
                } else {
                    0
                }
            }
            BoolOp::Or => {
                if a != 0 || b != 0 {
                    1
                } else {
                    0
                }
            }
        }
    }
}

impl Engine {
    /// Logical AND of two Boolean-valued BDDs (terminals in `{0, 1}`).
    pub fn and(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.apply(BoolOp::And, left, right)
    }

    /// Logical OR of two Boolean-valued BDDs (terminals in `{0, 1}`).
    pub fn or(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.apply(BoolOp::Or, left, right)
    }

    fn cache_key(left: NodeId, right: NodeId) -> (NodeId, NodeId) {
        // AND/OR are commutative; normalize the pair so both orders share one cache entry.
        if left <= right {
            (left, right)
        } else {
            (right, left)
        }
    }

    fn cache_get(&self, op: BoolOp, key: (NodeId, NodeId)) -> Option<NodeId> {
        let found = match op {
            BoolOp::And => self.and_cache.get(&key).copied(),
            BoolOp::Or => self.or_cache.get(&key).copied(),
        };
        if let Some(result) = found {
            log::trace!("existing result for {:?}({:?}, {:?}) = {:?}", op, key.0, key.1, result);
        }
        found
    }

    fn cache_put(&mut self, op: BoolOp, key: (NodeId, NodeId), result: NodeId) {
        log::trace!("new result for {:?}({:?}, {:?}) = {:?}", op, key.0, key.1, result);
        match op {
            BoolOp::And => self.and_cache.insert(key, result),
            BoolOp::Or => self.or_cache.insert(key, result),
        };
    }

    fn apply(&mut self, op: BoolOp, left: NodeId, right: NodeId) -> NodeId {
        log::trace!("applying {:?}({:?}, {:?})", op, left, right);
        if let (Some(a), Some(b)) = (left.terminal_value(), right.terminal_value()) {
            return self.terminal(op.terminal(a, b));
        }

        let mut task_stack: Vec<(NodeId, NodeId)> = vec![(left, right)];

        while let Some(&(l, r)) = task_stack.last() {
            let key = Self::cache_key(l, r);
            if self.cache_get(op, key).is_some() {
                task_stack.pop();
                continue;
            }

            let l_var = self.variable(l);
            let r_var = self.variable(r);
            let condition_var = match (l_var, r_var) {
                (Some(a), Some(b)) => min(a, b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => unreachable!("both terminal case already resolved above"),
            };

            let (l_low, l_high) = self.split(l, l_var, condition_var);
            let (r_low, r_high) = self.split(r, r_var, condition_var);

            let low_result = self.resolve_child(op, l_low, r_low);
            let high_result = self.resolve_child(op, l_high, r_high);

            match (low_result, high_result) {
                (Some(low), Some(high)) => {
                    let node = self.nonterminal(condition_var, low, high);
                    self.cache_put(op, key, node);
                    task_stack.pop();
                }
                _ => {
                    if low_result.is_none() {
                        task_stack.push((l_low, r_low));
                    }
                    if high_result.is_none() {
                        task_stack.push((l_high, r_high));
                    }
                }
            }
        }

        self.cache_get(op, Self::cache_key(left, right)).unwrap()
    }

    /// If `id`'s variable equals `condition_var`, returns its children; otherwise `id` does not
    /// depend on `condition_var` and is returned unchanged on both branches.
    fn split(&self, id: NodeId, var: Option<Variable>, condition_var: Variable) -> (NodeId, NodeId) {
        if var == Some(condition_var) {
            (self.low(id), self.high(id))
        } else {
            (id, id)
        }
    }

    fn resolve_child(&mut self, op: BoolOp, l: NodeId, r: NodeId) -> Option<NodeId> {
        if let (Some(a), Some(b)) = (l.terminal_value(), r.terminal_value()) {
            return Some(self.terminal(op.terminal(a, b)));
        }
        self.cache_get(op, Self::cache_key(l, r))
    }

    /// If-then-else: `f` must be Boolean-valued. Returns `g` where `f` is true, `h` where false.
    /// The primitive used by [`crate::map::IpMap::set`] to update a region of an integer-valued
    /// map.
    pub fn ite(&mut self, f: NodeId, g: NodeId, h: NodeId) -> NodeId {
        log::trace!("applying ITE({:?}, {:?}, {:?})", f, g, h);
        if let Some(fv) = f.terminal_value() {
            return if fv != 0 { g } else { h };
        }
        if g == h {
            return g;
        }
        if g == self.terminal(1) && h == self.terminal(0) {
            return f;
        }
        let key = (f, g, h);
        if let Some(existing) = self.ite_cache.get(&key) {
            log::trace!("existing result for ITE({:?}, {:?}, {:?}) = {:?}", f, g, h, existing);
            return *existing;
        }

        let f_var = self.variable(f);
        let g_var = self.variable(g);
        let h_var = self.variable(h);
        let condition_var = [f_var, g_var, h_var]
            .iter()
            .flatten()
            .copied()
            .min()
            .expect("at least one operand is nonterminal");

        let (f_low, f_high) = self.split(f, f_var, condition_var);
        let (g_low, g_high) = self.split(g, g_var, condition_var);
        let (h_low, h_high) = self.split(h, h_var, condition_var);

        let low = self.ite(f_low, g_low, h_low);
        let high = self.ite(f_high, g_high, h_high);
        let result = self.nonterminal(condition_var, low, high);
        log::trace!("new result for ITE({:?}, {:?}, {:?}) = {:?}", f, g, h, result);
        self.ite_cache.insert(key, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Builds a random small Boolean BDD over variables `0..var_count` by OR-ing together a
    /// handful of random minterms, along with the Rust-level truth table it represents (so tests
    /// can check evaluation against ground truth, not just against the engine itself).
    fn random_bdd(engine: &mut Engine, rng: &mut impl Rng, var_count: u8, minterms: usize) -> NodeId {
        let mut root = engine.terminal(0);
        let f = engine.terminal(0);
        let t = engine.terminal(1);
        for _ in 0..minterms {
            let mut minterm = t;
            for v in (0..var_count).rev() {
                let variable = Variable::new(v);
                minterm = if rng.gen_bool(0.5) {
                    engine.nonterminal(variable, f, minterm)
                } else {
                    engine.nonterminal(variable, minterm, f)
                };
            }
            root = engine.or(root, minterm);
        }
        root
    }

    fn oracle_from_bits(bits: &[bool]) -> impl Fn(Variable) -> bool + '_ {
        move |v: Variable| bits[v.index() as usize]
    }

    #[test]
    fn and_and_or_are_commutative() {
        let mut engine = Engine::new();
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let a = random_bdd(&mut engine, &mut rng, 4, 3);
            let b = random_bdd(&mut engine, &mut rng, 4, 3);
            assert_eq!(engine.and(a, b), engine.and(b, a));
            assert_eq!(engine.or(a, b), engine.or(b, a));
        }
    }

    #[test]
    fn apply_results_match_a_brute_force_truth_table() {
        let mut engine = Engine::new();
        let mut rng = rand::thread_rng();
        const VARS: u8 = 4;

        for _ in 0..20 {
            let a = random_bdd(&mut engine, &mut rng, VARS, 3);
            let b = random_bdd(&mut engine, &mut rng, VARS, 3);
            let and_result = engine.and(a, b);
            let or_result = engine.or(a, b);

            for assignment in 0u32..(1 << VARS) {
                let bits: Vec<bool> = (0..VARS).map(|i| (assignment >> i) & 1 == 1).collect();
                let a_val = engine.evaluate(a, oracle_from_bits(&bits));
                let b_val = engine.evaluate(b, oracle_from_bits(&bits));
                assert_eq!(engine.evaluate(and_result, oracle_from_bits(&bits)), (a_val != 0 && b_val != 0) as u32);
                assert_eq!(engine.evaluate(or_result, oracle_from_bits(&bits)), (a_val != 0 || b_val != 0) as u32);
            }
        }
    }

    #[test]
    fn ite_trivial_cases() {
        let mut engine = Engine::new();
        let f = engine.terminal(0);
        let t = engine.terminal(1);
        let g = engine.nonterminal(Variable::new(0), f, t);
        let h = engine.nonterminal(Variable::new(1), t, f);

        assert_eq!(engine.ite(t, g, h), g);
        assert_eq!(engine.ite(f, g, h), h);
        assert_eq!(engine.ite(g, h, h), h);
        assert_eq!(engine.ite(g, t, f), g);
    }

    #[test]
    fn ite_selects_g_or_h_per_condition() {
        let mut engine = Engine::new();
        let mut rng = rand::thread_rng();
        const VARS: u8 = 4;

        let condition = random_bdd(&mut engine, &mut rng, VARS, 2);
        let g = random_bdd(&mut engine, &mut rng, VARS, 2);
        let h = random_bdd(&mut engine, &mut rng, VARS, 2);
        let result = engine.ite(condition, g, h);

        for assignment in 0u32..(1 << VARS) {
            let bits: Vec<bool> = (0..VARS).map(|i| (assignment >> i) & 1 == 1).collect();
            let cond_val = engine.evaluate(condition, oracle_from_bits(&bits));
            let expected = if cond_val != 0 {
                engine.evaluate(g, oracle_from_bits(&bits))
            } else {
                engine.evaluate(h, oracle_from_bits(&bits))
            };
            assert_eq!(engine.evaluate(result, oracle_from_bits(&bits)), expected);
        }
    }
}
