//! Language-preserving reduction passes.
//!
//! Every pass keeps the accepted language of the automaton intact. The
//! underlying workhorse is a direct-simulation preorder: `p ≤ q` whenever
//! every rejecting behavior reachable from `p` is also exhibited from `q`,
//! witnessed edge-by-edge. All reductions (equivalence quotient, subsumed
//! edges, subsumed initial states, dominated states, the exhaustive deletion
//! search) are phrased through that relation, so swapping in a weaker
//! relation variant only changes how much is reduced, never correctness.

use itertools::Itertools;
use tracing::{debug, trace};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::nodes::{NodeId, NodeSet};

use super::{Edges, StateId, Uvw, UvwState};

/// Direct-simulation preorder over the states of one automaton.
pub struct Simulation {
    n: usize,
    rel: Vec<bool>,
}

impl Simulation {
    /// `true` iff `q` simulates `p`.
    pub fn le(&self, p: StateId, q: StateId) -> bool {
        self.rel[p.index() * self.n + q.index()]
    }

    pub fn equivalent(&self, p: StateId, q: StateId) -> bool {
        self.le(p, q) && self.le(q, p)
    }
}

impl Uvw {
    /// Greatest fixpoint of the direct-simulation conditions, starting from
    /// the all-pairs relation: `p ≤ q` survives while `rejecting(p)` implies
    /// `rejecting(q)` and every edge `(t_p, g_p)` of `p` is matched by some
    /// edge `(t_q, g_q)` of `q` with `g_p ⇒ g_q` and `t_p ≤ t_q`.
    pub fn simulation(&self) -> Simulation {
        let n = self.states.len();
        let mut rel = vec![true; n * n];
        for (p, sp) in self.states.iter_with_ids() {
            for (q, sq) in self.states.iter_with_ids() {
                if sp.rejecting && !sq.rejecting {
                    rel[p.index() * n + q.index()] = false;
                }
            }
        }

        // guard implications do not change during the fixpoint
        let mut implies: AHashMap<(usize, usize, usize, usize), bool> = AHashMap::new();

        loop {
            let mut changed = false;
            for p in self.states.ids() {
                for q in self.states.ids() {
                    if p == q || !rel[p.index() * n + q.index()] {
                        continue;
                    }
                    let matched = self.states[p].out.iter().enumerate().all(|(i, (tp, gp))| {
                        self.states[q].out.iter().enumerate().any(|(j, (tq, gq))| {
                            rel[tp.index() * n + tq.index()]
                                && *implies
                                    .entry((p.index(), i, q.index(), j))
                                    .or_insert_with(|| gp.and_not(gq).is_false())
                        })
                    });
                    if !matched {
                        rel[p.index() * n + q.index()] = false;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        Simulation { n, rel }
    }

    /// A non-top state without outgoing transitions imposes no obligation,
    /// so it and every edge leading into it are dropped, to fixpoint.
    pub fn remove_dead_ends(&mut self) {
        let top = self.top();
        let mut live: NodeSet<UvwState> = self.states.ids().collect();
        loop {
            let dead = live
                .iter()
                .filter(|&s| s != top && self.states[s].out.is_empty())
                .collect_vec();
            if dead.is_empty() {
                break;
            }
            for d in dead {
                live.remove(d);
            }
            for s in live.iter().collect_vec() {
                self.states[s].out.retain(|(t, _)| live.contains(*t));
            }
        }
        self.compact(&live);
    }

    /// Drop transitions subsumed by a sibling transition into a simulating
    /// target, and initial states subsumed by another initial state.
    pub fn simulation_minimize(&mut self) {
        let sim = self.simulation();

        for s in self.states.ids().collect_vec() {
            let edges = &self.states[s].out;
            let m = edges.len();
            if m < 2 {
                continue;
            }
            let mut keep = vec![true; m];
            for i in 0..m {
                for j in 0..m {
                    if i == j || !keep[j] || !keep[i] {
                        continue;
                    }
                    let (ti, gi) = &edges[i];
                    let (tj, gj) = &edges[j];
                    if sim.le(*ti, *tj) && gi.and_not(gj).is_false() {
                        keep[i] = false;
                    }
                }
            }
            if keep.iter().all(|k| *k) {
                continue;
            }
            let mut idx = 0;
            self.states[s].out.retain(|_| {
                idx += 1;
                keep[idx - 1]
            });
        }

        // higher-indexed initial states go first so that of a mutually
        // simulating pair the lower-indexed one survives
        for p in self.initial.iter().collect_vec().into_iter().rev() {
            let subsumed = self
                .initial
                .iter()
                .any(|q| q != p && sim.le(p, q));
            if subsumed {
                self.initial.remove(p);
            }
        }
    }

    /// Union-find mutually simulating states into their lowest-index
    /// representative; rejecting flags are OR-ed, edge lists unioned, and
    /// every target and the initial set rewritten.
    pub fn merge_equivalent(&mut self) {
        let sim = self.simulation();
        let n = self.states.len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let mut any = false;
        for p in 0..n {
            for q in p + 1..n {
                if sim.equivalent(NodeId::new(p), NodeId::new(q)) {
                    let (rp, rq) = (find(&mut parent, p), find(&mut parent, q));
                    if rp != rq {
                        parent[rp.max(rq)] = rp.min(rq);
                        any = true;
                    }
                }
            }
        }
        if !any {
            return;
        }

        let reps: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();

        for i in 0..n {
            let r = reps[i];
            if r != i && self.states[NodeId::new(i)].rejecting {
                self.states[NodeId::new(r)].rejecting = true;
            }
        }

        let mut merged: Vec<Edges> = vec![SmallVec::new(); n];
        for i in 0..n {
            for (t, g) in self.states[NodeId::new(i)].out.clone() {
                Self::push_edge(&mut merged[reps[i]], NodeId::new(reps[t.index()]), g);
            }
        }
        for i in 0..n {
            if reps[i] == i {
                self.states[NodeId::new(i)].out = std::mem::take(&mut merged[i]);
            }
        }

        // a state merged into top contributes nothing: from top every word
        // is already rejected through the unconditional self-loop
        let top = self.top();
        let top_loop = self.alphabet.mk_true();
        self.states[top].out.clear();
        self.states[top].out.push((top, top_loop));

        let old_initial = std::mem::take(&mut self.initial);
        for s in old_initial.iter() {
            self.initial.insert(NodeId::new(reps[s.index()]));
        }

        let live: NodeSet<UvwState> = (0..n).filter(|&i| reps[i] == i).map(NodeId::new).collect();
        self.compact(&live);
    }

    /// Drop a reachable state `p` shadowed by a distinct simulating state
    /// `q`: `q` must be reachable without passing through `p`, every edge
    /// into `p` must run parallel to an edge into `q` with an implied guard,
    /// and `q` must be initial if `p` is. Every run through `p` then
    /// reroutes through `q`, so the edges into `p` are redundant and `p`
    /// dies with them.
    pub fn remove_dominated(&mut self) {
        let top = self.top();
        loop {
            let sim = self.simulation();
            let reachable = self.reachable(None);
            let mut victim = None;
            'search: for p in self.states.ids() {
                if p == top || !reachable.contains(p) {
                    continue;
                }
                for q in self.states.ids() {
                    if q == p || !sim.le(p, q) {
                        continue;
                    }
                    if self.is_initial(p) && !self.is_initial(q) {
                        continue;
                    }
                    if !self.reachable(Some(p)).contains(q) {
                        continue;
                    }
                    if !self.incoming_covered(p, q) {
                        continue;
                    }
                    victim = Some(p);
                    break 'search;
                }
            }
            let Some(p) = victim else { break };
            trace!(victim = p.index(), "dominated state dropped");
            for s in self.states.ids().collect_vec() {
                if s != p {
                    self.states[s].out.retain(|(t, _)| *t != p);
                }
            }
            self.initial.remove(p);
            let live: NodeSet<UvwState> = self.states.ids().filter(|&s| s != p).collect();
            self.compact(&live);
        }
    }

    fn incoming_covered(&self, p: StateId, q: StateId) -> bool {
        for s in self.states.ids() {
            if s == p {
                continue;
            }
            for (t, g) in self.out(s) {
                if *t != p {
                    continue;
                }
                let Some((_, gq)) = self.out(s).iter().find(|(t2, _)| *t2 == q) else {
                    return false;
                };
                if !g.and_not(gq).is_false() {
                    return false;
                }
            }
        }
        true
    }

    /// Standard reachability from the initial set; the top state is kept
    /// regardless so the reject-everything sink stays addressable.
    pub fn remove_unreachable(&mut self) {
        let mut live = self.reachable(None);
        live.insert(self.top());
        self.compact(&live);
    }

    /// A state with no path back to itself cannot be visited infinitely
    /// often, so its rejecting flag is meaningless and is cleared.
    pub fn demote_transient(&mut self) {
        for s in self.states.ids().collect_vec() {
            if self.states[s].rejecting && !self.on_cycle(s) {
                self.states[s].rejecting = false;
            }
        }
    }

    fn on_cycle(&self, s: StateId) -> bool {
        let mut seen = NodeSet::new();
        let mut stack: Vec<StateId> = self.out(s).iter().map(|(t, _)| *t).collect();
        while let Some(t) = stack.pop() {
            if t == s {
                return true;
            }
            if seen.insert(t) {
                stack.extend(self.out(t).iter().map(|(u, _)| *u));
            }
        }
        false
    }

    fn reachable(&self, avoiding: Option<StateId>) -> NodeSet<UvwState> {
        let mut seen = NodeSet::new();
        let mut stack: Vec<StateId> = self
            .initial
            .iter()
            .filter(|s| Some(*s) != avoiding)
            .collect();
        for s in &stack {
            seen.insert(*s);
        }
        while let Some(s) = stack.pop() {
            for (t, _) in self.out(s) {
                if Some(*t) != avoiding && seen.insert(*t) {
                    stack.push(*t);
                }
            }
        }
        seen
    }

    /// Sufficient check for language equality: over the disjoint union of
    /// both automata, every initial state of one must be simulated by an
    /// initial state of the other, in both directions.
    pub fn language_equivalent(&self, other: &Uvw) -> bool {
        let (union, offset) = Uvw::disjoint_union(self, other);
        let sim = union.simulation();
        let mine = self.initial.iter().collect_vec();
        let theirs = other
            .initial
            .iter()
            .map(|j| NodeId::new(j.index() + offset))
            .collect_vec();
        mine.iter()
            .all(|&i| theirs.iter().any(|&j| sim.le(i, j)))
            && theirs.iter().all(|&j| mine.iter().any(|&i| sim.le(j, i)))
    }

    fn disjoint_union(a: &Uvw, b: &Uvw) -> (Uvw, usize) {
        let offset = a.state_count();
        let mut union = a.clone();
        union.initial = NodeSet::new();
        for state in b.states.iter() {
            let mut copy = state.clone();
            for (t, _) in copy.out.iter_mut() {
                *t = NodeId::new(t.index() + offset);
            }
            union.states.push(copy);
        }
        (union, offset)
    }

    /// Exhaustive deletion search: hypothetically delete each state in turn
    /// (inbound edges and initial membership redirected to top) and keep the
    /// deletion only if the language is provably unchanged. Restarts after
    /// every committed deletion until a full sweep commits nothing.
    pub fn brute_force_removal(&mut self) {
        let top = self.top();
        loop {
            let mut committed = false;
            for p in self.states.ids().collect_vec() {
                if p == top {
                    continue;
                }
                let mut candidate = self.clone();
                candidate.redirect_into_top(p);
                if self.language_equivalent(&candidate) {
                    trace!(deleted = p.index(), "brute-force deletion committed");
                    *self = candidate;
                    committed = true;
                    break;
                }
            }
            if !committed {
                break;
            }
        }
    }

    fn redirect_into_top(&mut self, p: StateId) {
        let top = self.top();
        for s in self.states.ids().collect_vec() {
            if s == p {
                continue;
            }
            let edges = std::mem::take(&mut self.states[s].out);
            for (t, g) in edges {
                Self::push_edge(&mut self.states[s].out, if t == p { top } else { t }, g);
            }
        }
        if self.initial.remove(p) {
            self.initial.insert(top);
        }
        let live: NodeSet<UvwState> = self.states.ids().filter(|&s| s != p).collect();
        self.compact(&live);
    }

    /// The per-chain reduction sequence. Passes past the first are skipped
    /// once only the top state remains.
    pub fn minimize(&mut self) {
        self.remove_dead_ends();
        trace!(states = self.state_count(), "after dead-end removal");
        if self.state_count() > 1 {
            self.simulation_minimize();
            trace!(states = self.state_count(), "after simulation reduction");
        }
        if self.state_count() > 1 {
            self.merge_equivalent();
            trace!(states = self.state_count(), "after equivalence merge");
        }
        if self.state_count() > 1 {
            self.remove_dead_ends();
            self.remove_dominated();
            trace!(states = self.state_count(), "after dominated removal");
        }
        if self.state_count() > 1 {
            self.remove_unreachable();
        }
        if self.state_count() > 1 {
            self.demote_transient();
        }
        debug!(states = self.state_count(), "incremental reduction done");
    }

    /// The final, quadratic pass, run once after all chains are folded.
    pub fn minimize_exhaustive(&mut self) {
        let before = self.state_count();
        self.brute_force_removal();
        debug!(before, states = self.state_count(), "exhaustive reduction done");
    }
}
