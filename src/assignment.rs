//! Tri-valued variable assignments and their expansion into concrete bit vectors.
//!
//! Grounded on `original_source/src/libipset/bdd/expanded.c`: an assignment pins some variables to
//! `False`/`True` and leaves the rest `Either`; expansion enumerates the Boolean choices for the
//! `Either` variables as a little-endian counter, where the *last* `Either` variable (by index) is
//! the least significant bit.

use crate::engine::Variable;

/// The value of one variable in a tri-valued assignment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VariableState {
    False,
    True,
    Either,
}

/// A partial, tri-valued mapping from variable index to `{False, True, Either}`.
///
/// Variables beyond the stored prefix are implicitly `Either`. Two assignments are equal iff they
/// agree on every non-`Either` variable; trailing `Either`s do not affect equality, so callers
/// should prefer [`Assignment::get`] and [`Assignment::len`] over comparing the backing storage
/// directly.
#[derive(Clone, Debug)]
pub struct Assignment {
    values: Vec<VariableState>,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment { values: Vec::new() }
    }

    pub fn get(&self, variable: Variable) -> VariableState {
        self.values.get(variable.index() as usize).copied().unwrap_or(VariableState::Either)
    }

    pub fn set(&mut self, variable: Variable, state: VariableState) {
        let index = variable.index() as usize;
        if index >= self.values.len() {
            self.values.resize(index + 1, VariableState::Either);
        }
        self.values[index] = state;
    }

    /// Forces every variable with index `>= variable` to `Either`.
    pub fn cut(&mut self, variable: Variable) {
        let index = variable.index() as usize;
        if index < self.values.len() {
            self.values.truncate(index);
        }
    }

    /// One past the highest variable index this assignment has ever stored a non-`Either` value
    /// for (may overcount if a value was later reset to `Either` in place; that case only costs a
    /// redundant trailing `Either` entry, which does not affect equality or expansion).
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Default for Assignment {
    fn default() -> Self {
        Assignment::new()
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        let len = self.values.len().max(other.values.len());
        (0..len).all(|i| {
            let a = self.values.get(i).copied().unwrap_or(VariableState::Either);
            let b = other.values.get(i).copied().unwrap_or(VariableState::Either);
            a == b
        })
    }
}

/// Enumerates every total Boolean assignment consistent with a base [`Assignment`], by choosing
/// values for its `Either` variables in lexicographic order (all `False` first, then counting up
/// with the last `Either` variable as the least significant bit).
pub struct Expansion {
    base: Vec<VariableState>,
    eithers: Vec<usize>,
    done: bool,
}

impl Expansion {
    /// Builds an expander over variables `0..limit`. Variables at or beyond `limit` in `base` are
    /// ignored; any variable below `limit` not explicitly set in `base` is treated as `Either`.
    pub fn new(base: &Assignment, limit: usize) -> Expansion {
        let mut values = vec![VariableState::Either; limit];
        for i in 0..limit.min(base.values.len()) {
            values[i] = base.values[i];
        }
        let eithers: Vec<usize> =
            values.iter().enumerate().filter(|(_, s)| **s == VariableState::Either).map(|(i, _)| i).collect();
        for &i in &eithers {
            values[i] = VariableState::False;
        }
        Expansion { base: values, eithers, done: false }
    }

    /// The current expanded assignment, as a bit vector indexed by variable.
    pub fn current(&self) -> &[VariableState] {
        &self.base
    }

    pub fn bit(&self, variable: usize) -> bool {
        self.base[variable] == VariableState::True
    }

    /// Advances to the next expansion. Returns `false` once every combination has been produced.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        for &i in self.eithers.iter().rev() {
            match self.base[i] {
                VariableState::False => {
                    self.base[i] = VariableState::True;
                    return true;
                }
                VariableState::True => {
                    self.base[i] = VariableState::False;
                }
                VariableState::Either => unreachable!("eithers are normalized to False/True above"),
            }
        }
        self.done = true;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_equality_ignores_trailing_either() {
        let mut a = Assignment::new();
        a.set(Variable::new(0), VariableState::True);
        let mut b = a.clone();
        b.set(Variable::new(3), VariableState::Either);
        assert_eq!(a, b);
    }

    #[test]
    fn cut_clears_high_variables() {
        let mut a = Assignment::new();
        a.set(Variable::new(0), VariableState::True);
        a.set(Variable::new(1), VariableState::False);
        a.cut(Variable::new(1));
        assert_eq!(a.get(Variable::new(1)), VariableState::Either);
        assert_eq!(a.get(Variable::new(0)), VariableState::True);
    }

    #[test]
    fn expansion_enumerates_all_combinations_in_order() {
        let base = Assignment::new();
        let mut expander = Expansion::new(&base, 2);
        let mut seen = vec![(expander.bit(0), expander.bit(1))];
        while expander.advance() {
            seen.push((expander.bit(0), expander.bit(1)));
        }
        assert_eq!(seen, vec![(false, false), (false, true), (true, false), (true, true)]);
    }
}
