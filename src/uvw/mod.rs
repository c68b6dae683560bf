//! Universal co-Büchi word automaton (UVW).
//!
//! A word is accepted iff every run over it visits rejecting states only
//! finitely often. Transitions carry symbolic guards; a state may have
//! several outgoing transitions enabled on the same letter, in which case
//! the run forks and *all* branches must accept. A letter matching no guard
//! imposes no further obligation on that branch.
//!
//! State 0 is the top state: rejecting, with an unconditional self-loop. Any
//! word with a run reaching it is rejected. It is created once and survives
//! every reduction pass.

use std::fmt;
use std::sync::Arc;

use biodivine_lib_bdd::Bdd;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::alphabet::Alphabet;
use crate::chain::ChainRecord;
use crate::nodes::{NodeArena, NodeId, NodeSet};

mod minimize;
pub use minimize::Simulation;

#[cfg(test)]
mod tests;

pub type StateId = NodeId<UvwState>;
pub(crate) type Edges = SmallVec<[(StateId, Bdd); 2]>;

/// One automaton state. Outgoing guards are kept non-false and targets
/// pairwise distinct; [`Uvw::add_edge`] maintains both.
#[derive(Clone)]
pub struct UvwState {
    pub(crate) rejecting: bool,
    pub(crate) out: Edges,
}

#[derive(Clone)]
pub struct Uvw {
    pub(crate) alphabet: Arc<Alphabet>,
    pub(crate) states: NodeArena<UvwState>,
    pub(crate) initial: NodeSet<UvwState>,
}

impl Uvw {
    pub fn new(alphabet: Arc<Alphabet>) -> Self {
        let mut states = NodeArena::default();
        let top = states.push(UvwState { rejecting: true, out: SmallVec::new() });
        let top_loop = alphabet.mk_true();
        states[top].out.push((top, top_loop));
        Self {
            alphabet,
            states,
            initial: NodeSet::new(),
        }
    }

    pub fn top(&self) -> StateId {
        NodeId::new(0)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        self.states.ids()
    }

    pub fn is_rejecting(&self, s: StateId) -> bool {
        self.states[s].rejecting
    }

    pub fn is_initial(&self, s: StateId) -> bool {
        self.initial.contains(s)
    }

    pub fn initial_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.initial.iter()
    }

    pub fn out(&self, s: StateId) -> &[(StateId, Bdd)] {
        &self.states[s].out
    }

    pub fn add_state(&mut self, rejecting: bool) -> StateId {
        self.states.push(UvwState { rejecting, out: SmallVec::new() })
    }

    /// Add a guarded transition. A false guard is dropped; a duplicate
    /// target has its guard widened by disjunction.
    pub fn add_edge(&mut self, from: StateId, to: StateId, guard: Bdd) {
        Self::push_edge(&mut self.states[from].out, to, guard);
    }

    pub(crate) fn push_edge(edges: &mut Edges, to: StateId, guard: Bdd) {
        if guard.is_false() {
            return;
        }
        if let Some((_, g)) = edges.iter_mut().find(|(t, _)| *t == to) {
            *g = g.or(&guard);
        } else {
            edges.push((to, guard));
        }
    }

    pub fn set_initial(&mut self, s: StateId) {
        self.initial.insert(s);
    }

    /// Unfold one chain record into a fresh linear sub-automaton, built from
    /// the tail toward the head: the terminal state carries only its
    /// self-loop, every earlier position carries an advance edge to its
    /// successor and a self-loop, and the head joins the initial set.
    pub fn add_chain(&mut self, chain: &ChainRecord) {
        let labels = &chain.labels;
        debug_assert!(!labels.is_empty());
        let alphabet = self.alphabet.clone();

        let terminal = self.add_state(true);
        self.add_edge(terminal, terminal, alphabet.decode_label(&labels[labels.len() - 1]));

        let mut last = terminal;
        for j in (0..chain.positions() - 1).rev() {
            let next = self.add_state(false);
            self.add_edge(next, last, alphabet.decode_label(&labels[j * 2 + 1]));
            self.add_edge(next, next, alphabet.decode_label(&labels[j * 2]));
            last = next;
        }
        self.initial.insert(last);
    }

    /// Display/dot name of a state: the top state is `all`, every other
    /// state `T<index>`.
    pub(crate) fn state_name(&self, s: StateId) -> String {
        if s == self.top() {
            "all".to_string()
        } else {
            format!("T{}", s.index())
        }
    }

    /// Drop all states outside `live`, renumber, and rewrite every target
    /// and the initial set. A surviving edge into a dropped state is an
    /// invariant violation.
    pub(crate) fn compact(&mut self, live: &NodeSet<UvwState>) {
        debug_assert!(live.contains(self.top()));
        if live.len() == self.states.len() {
            return;
        }
        let remap = self.states.compact(live);
        for state in self.states.iter_mut() {
            for (target, _) in state.out.iter_mut() {
                *target = remap
                    .get(*target)
                    .expect("dangling state reference after compaction");
            }
        }
        let old_initial = std::mem::take(&mut self.initial);
        for s in old_initial.iter() {
            if let Some(new) = remap.get(s) {
                self.initial.insert(new);
            }
        }
    }
}

impl fmt::Display for Uvw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "States:")?;
        for (id, state) in self.states.iter_with_ids() {
            let mut marks: Vec<&str> = Vec::new();
            if self.is_initial(id) {
                marks.push("init");
            }
            if state.rejecting {
                marks.push("rej");
            }
            writeln!(f, " {} [{}]", self.state_name(id), marks.iter().format(","))?;
            for (target, guard) in &state.out {
                writeln!(
                    f,
                    "   =[{}]=> {}",
                    self.alphabet.guard_label(guard),
                    self.state_name(*target)
                )?;
            }
        }
        writeln!(
            f,
            "Initial: {}",
            self.initial.iter().map(|s| self.state_name(s)).format(" ")
        )?;
        writeln!(
            f,
            "Rejecting: {}",
            self.states
                .iter_with_ids()
                .filter(|(_, st)| st.rejecting)
                .map(|(id, _)| self.state_name(id))
                .format(" ")
        )?;
        Ok(())
    }
}
