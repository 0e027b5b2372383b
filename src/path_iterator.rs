//! Stateful walk over root-to-leaf paths of a BDD.
//!
//! Grounded directly on `original_source/src/libipset/bdd/bdd-iterator.c`: descend `low` always
//! assigning `False`, until a terminal is reached; to advance, pop nodes already assigned `True`
//! (resetting them to `Either`), then flip the first node found assigned `False` to `True` and
//! descend its `high` child the same way.

use crate::assignment::{Assignment, VariableState};
use crate::engine::{Engine, NodeId};

/// Yields every root-to-terminal path of a BDD as an `(assignment, terminal_value)` pair.
/// Variables not encountered along a path remain `Either` in the yielded assignment.
pub struct PathIterator {
    stack: Vec<NodeId>,
    assignment: Assignment,
    finished: bool,
}

impl PathIterator {
    pub fn new(engine: &Engine, root: NodeId) -> PathIterator {
        let mut iter = PathIterator { stack: Vec::new(), assignment: Assignment::new(), finished: false };
        iter.descend_low(engine, root);
        iter
    }

    fn descend_low(&mut self, engine: &Engine, mut node: NodeId) {
        while let Some(variable) = engine.variable(node) {
            self.stack.push(node);
            self.assignment.set(variable, VariableState::False);
            node = engine.node_low(node);
        }
        self.stack.push(node);
    }

    /// The current path's assignment and terminal value.
    pub fn current(&self, engine: &Engine) -> (Assignment, u32) {
        let terminal = *self.stack.last().expect("iterator always holds at least the terminal");
        (self.assignment.clone(), terminal.terminal_value().expect("last stack entry is a terminal"))
    }

    /// Moves to the next path. Returns `false` once every path has been visited.
    pub fn advance(&mut self, engine: &Engine) -> bool {
        log::trace!("advancing BDD path iterator");
        if self.finished {
            return false;
        }
        // Pop the terminal we are currently sitting on.
        self.stack.pop();
        loop {
            let node = match self.stack.pop() {
                Some(node) => node,
                None => {
                    log::trace!("BDD path iterator is finished");
                    self.finished = true;
                    return false;
                }
            };
            let variable = engine.variable(node).expect("nonterminals only are pushed onto the stack");
            match self.assignment.get(variable) {
                VariableState::False => {
                    self.assignment.set(variable, VariableState::True);
                    self.stack.push(node);
                    self.descend_low(engine, engine.node_high(node));
                    return true;
                }
                VariableState::True => {
                    self.assignment.set(variable, VariableState::Either);
                }
                VariableState::Either => unreachable!("path variables are always False or True while on stack"),
            }
        }
    }
}
