//! Propositions, letters, and the symbolic guard algebra.
//!
//! The alphabet owns the BDD variable universe for one construction episode:
//! `nofBits` boolean propositions `v0..v{n-1}` and one cube per concrete
//! letter. Guards everywhere else in the crate are plain [`Bdd`] handles
//! combined through this module; there is no ambient formula state.

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet, BddVariableSetBuilder};
use itertools::Itertools;

use crate::chain::ChainError;

/// One proposition occurrence inside a factored clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub var: BddVariable,
    pub positive: bool,
}

#[derive(Clone)]
pub struct Alphabet {
    vars: BddVariableSet,
    props: Vec<BddVariable>,
    letters: Vec<Bdd>,
}

impl Alphabet {
    /// Declare `nof_bits` propositions and build the cube table for all
    /// `nof_letters` letters, letter `i` being the conjunction of `vj` or
    /// `!vj` according to bit `j` of `i`.
    pub fn new(nof_bits: u16, nof_letters: usize) -> Result<Self, ChainError> {
        if (nof_bits as u32) < usize::BITS && nof_letters > 1usize << nof_bits {
            return Err(ChainError::Invariant(format!(
                "{nof_letters} letters do not fit into {nof_bits} bits"
            )));
        }

        let mut builder = BddVariableSetBuilder::new();
        let props: Vec<BddVariable> = (0..nof_bits)
            .map(|i| builder.make_variable(&format!("v{i}")))
            .collect();
        let vars = builder.build();

        let letters = (0..nof_letters)
            .map(|i| {
                props.iter().enumerate().fold(vars.mk_true(), |cube, (j, &v)| {
                    cube.and(&vars.mk_literal(v, i >> j & 1 == 1))
                })
            })
            .collect();

        Ok(Self { vars, props, letters })
    }

    pub fn nof_letters(&self) -> usize {
        self.letters.len()
    }

    pub fn nof_props(&self) -> usize {
        self.props.len()
    }

    pub fn letter(&self, i: usize) -> &Bdd {
        &self.letters[i]
    }

    pub fn mk_true(&self) -> Bdd {
        self.vars.mk_true()
    }

    pub fn mk_false(&self) -> Bdd {
        self.vars.mk_false()
    }

    /// Decode a chain label into a guard: the disjunction of the cubes of
    /// every letter whose bit is set. The all-zero label decodes to `false`.
    /// Label characters and length are validated by the protocol reader.
    pub fn decode_label(&self, label: &str) -> Bdd {
        debug_assert_eq!(label.len(), self.letters.len());
        label
            .bytes()
            .enumerate()
            .filter(|&(_, c)| c == b'1')
            .fold(self.mk_false(), |guard, (k, _)| guard.or(&self.letters[k]))
    }

    /// Factor a guard into a covering disjunction of literal conjunctions.
    ///
    /// Repeatedly peels one clause off the guard: a proposition is essential
    /// for the current remainder exactly when existentially quantifying it
    /// away changes the formula; an essential proposition is emitted with the
    /// polarity whose cofactor the remainder lives in, and the remainder is
    /// restricted to that cofactor. The clause (possibly empty, meaning
    /// `true`) is then subtracted from the guard. The disjunction of the
    /// returned clauses is formula-equal to the input.
    pub fn factor_clauses(&self, guard: &Bdd) -> Vec<Vec<Literal>> {
        let mut clauses = Vec::new();
        let mut guard = guard.clone();
        while !guard.is_false() {
            let mut rest = guard.clone();
            let mut clause = Vec::new();
            for &v in &self.props {
                let with_v = rest.and(&self.vars.mk_var(v));
                if with_v.var_exists(v) != rest {
                    if with_v.is_false() {
                        clause.push(Literal { var: v, positive: false });
                        rest = rest.and(&self.vars.mk_literal(v, false));
                    } else {
                        clause.push(Literal { var: v, positive: true });
                        rest = with_v;
                    }
                }
            }
            guard = guard.and_not(&rest);
            clauses.push(clause);
        }
        clauses
    }

    /// Render one factored clause, `true` for the empty clause.
    pub fn clause_label(&self, clause: &[Literal]) -> String {
        if clause.is_empty() {
            return "true".to_string();
        }
        clause
            .iter()
            .map(|lit| {
                let name = self.vars.name_of(lit.var);
                if lit.positive {
                    name
                } else {
                    format!("!{name}")
                }
            })
            .join(" && ")
    }

    /// Render a whole guard as a disjunction of factored clauses.
    pub fn guard_label(&self, guard: &Bdd) -> String {
        if guard.is_false() {
            return "false".to_string();
        }
        self.factor_clauses(guard)
            .iter()
            .map(|clause| self.clause_label(clause))
            .join(" | ")
    }

    /// The cube denoted by a factored clause.
    pub fn clause_cube(&self, clause: &[Literal]) -> Bdd {
        clause.iter().fold(self.mk_true(), |cube, lit| {
            cube.and(&self.vars.mk_literal(lit.var, lit.positive))
        })
    }
}
