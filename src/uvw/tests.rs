use std::sync::Arc;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alphabet::Alphabet;
use crate::chain::ChainRecord;

use super::Uvw;

fn bit_alphabet() -> Arc<Alphabet> {
    Arc::new(Alphabet::new(1, 2).unwrap())
}

#[test]
fn chain_unfolds_backward() {
    let mut uvw = Uvw::new(bit_alphabet());
    uvw.add_chain(&ChainRecord {
        labels: vec!["10".into(), "01".into(), "01".into()],
    });

    insta::assert_snapshot!(uvw, @r###"
    States:
     all [rej]
       =[true]=> all
     T1 [rej]
       =[v0]=> T1
     T2 [init]
       =[v0]=> T1
       =[!v0]=> T2
    Initial: T2
    Rejecting: all T1
    "###);
}

#[test]
fn one_position_chain_has_no_advance_edge() {
    let mut uvw = Uvw::new(bit_alphabet());
    uvw.add_chain(&ChainRecord {
        labels: vec!["10".into(), "01".into()],
    });

    assert_eq!(uvw.state_count(), 2);
    let terminal = uvw.states().nth(1).unwrap();
    assert!(uvw.is_initial(terminal));
    assert!(uvw.is_rejecting(terminal));
    assert_eq!(uvw.out(terminal).len(), 1);
}

#[test]
fn false_guards_never_materialize() {
    let alphabet = bit_alphabet();
    let uvw = crate::uvw!(alphabet;
        q0 => { q1: [], q0: [0, 1] }
        q1(rejecting) => { q1: [1] }
        ===
        init = [q0]
    );

    let q0 = uvw.states().nth(1).unwrap();
    assert_eq!(uvw.out(q0).len(), 1);
}

#[test]
fn dead_end_removal_cascades() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        q0 => { q1: [0] }
        q1 => { q2: [1] }
        q2 => { }
        ===
        init = [q0]
    );

    uvw.remove_dead_ends();
    assert_eq!(uvw.state_count(), 1);
    assert_eq!(uvw.initial_states().count(), 0);
}

#[test]
fn mutually_simulating_states_merge() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        p(rejecting) => { p: [1] }
        q(rejecting) => { q: [1] }
        ===
        init = [p, q]
    );

    uvw.merge_equivalent();
    assert_eq!(uvw.state_count(), 2);
    assert_eq!(uvw.initial_states().count(), 1);
}

#[test]
fn subsumed_sibling_edges_are_pruned() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        s => { p: [0], q: [0, 1] }
        p(rejecting) => { p: [0] }
        q(rejecting) => { q: [0, 1] }
        ===
        init = [s]
    );

    // the edge to p only ever fires together with the edge to q, and q
    // simulates p, so the p edge carries no extra obligation
    let before = uvw.clone();
    uvw.simulation_minimize();

    let s = uvw.states().nth(1).unwrap();
    assert_eq!(uvw.out(s).len(), 1);
    assert!(before.language_equivalent(&uvw));
}

#[test]
fn subsumed_initial_states_are_pruned() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        p(rejecting) => { p: [1] }
        q(rejecting) => { q: [0, 1] }
        ===
        init = [p, q]
    );

    uvw.simulation_minimize();

    assert_eq!(uvw.initial_states().count(), 1);
    let q = uvw.states().nth(2).unwrap();
    assert!(uvw.is_initial(q));
}

#[test]
fn dominated_states_are_dropped() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        s => { p: [0], q: [0, 1] }
        p(rejecting) => { p: [0] }
        q(rejecting) => { q: [0, 1] }
        ===
        init = [s]
    );

    let before = uvw.clone();
    uvw.remove_dominated();

    assert_eq!(uvw.state_count(), 3);
    assert!(before.language_equivalent(&uvw));
}

#[test]
fn unreachable_states_are_dropped_but_top_stays() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        s => { s: [0] }
        orphan(rejecting) => { orphan: [1] }
        ===
        init = [s]
    );

    uvw.remove_unreachable();
    assert_eq!(uvw.state_count(), 2);
}

#[test]
fn transient_states_lose_their_rejecting_flag() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        a(rejecting) => { b: [0] }
        b(rejecting) => { b: [1] }
        ===
        init = [a]
    );

    uvw.demote_transient();

    let a = uvw.states().nth(1).unwrap();
    let b = uvw.states().nth(2).unwrap();
    assert!(!uvw.is_rejecting(a));
    assert!(uvw.is_rejecting(b));
    assert!(uvw.is_rejecting(uvw.top()));
}

#[test]
fn brute_force_removes_states_equivalent_to_top() {
    let alphabet = bit_alphabet();
    let mut uvw = crate::uvw!(alphabet;
        i => { r: [0] }
        r(rejecting) => { r: [0, 1] }
        ===
        init = [i]
    );

    let before = uvw.clone();
    uvw.brute_force_removal();

    // r loops unconditionally and rejects, exactly like top
    assert_eq!(uvw.state_count(), 2);
    assert!(before.language_equivalent(&uvw));
}

#[test]
fn language_equivalence_is_detected_and_refuted() {
    let alphabet = bit_alphabet();
    let a = crate::uvw!(alphabet;
        p(rejecting) => { p: [1] }
        ===
        init = [p]
    );
    let b = crate::uvw!(alphabet;
        p(rejecting) => { p: [1] }
        ===
        init = [p]
    );
    let c = crate::uvw!(alphabet;
        p(rejecting) => { p: [0] }
        ===
        init = [p]
    );

    assert!(a.language_equivalent(&b));
    assert!(!a.language_equivalent(&c));
}

// -- randomized soundness ---------------------------------------------------

fn random_uvw(rng: &mut StdRng, alphabet: &Arc<Alphabet>) -> Uvw {
    let mut uvw = Uvw::new(alphabet.clone());
    let n = rng.gen_range(2..=5);
    let fresh: Vec<_> = (0..n).map(|_| uvw.add_state(rng.gen_bool(0.4))).collect();
    let all: Vec<_> = std::iter::once(uvw.top()).chain(fresh.iter().copied()).collect();

    for &s in &fresh {
        for _ in 0..rng.gen_range(0..=2) {
            let target = all[rng.gen_range(0..all.len())];
            let mut guard = alphabet.mk_false();
            for l in 0..alphabet.nof_letters() {
                if rng.gen_bool(0.5) {
                    guard = guard.or(alphabet.letter(l));
                }
            }
            uvw.add_edge(s, target, guard);
        }
    }
    for &s in &fresh {
        if rng.gen_bool(0.4) {
            uvw.set_initial(s);
        }
    }
    if uvw.initial_states().next().is_none() {
        uvw.set_initial(fresh[0]);
    }
    uvw
}

fn words(letters: usize, max_len: usize) -> Vec<Vec<usize>> {
    let mut all = vec![vec![]];
    let mut layer = vec![vec![]];
    for _ in 0..max_len {
        let mut next = Vec::new();
        for word in &layer {
            for l in 0..letters {
                let mut longer = word.clone();
                longer.push(l);
                next.push(longer);
            }
        }
        all.extend(next.iter().cloned());
        layer = next;
    }
    all
}

/// `succ[state][letter]` as explicit index lists, so the word checks below
/// are pure graph walks.
fn successors(uvw: &Uvw) -> Vec<Vec<Vec<usize>>> {
    let letters = uvw.alphabet().nof_letters();
    uvw.states()
        .map(|s| {
            (0..letters)
                .map(|l| {
                    uvw.out(s)
                        .iter()
                        .filter(|(_, g)| !uvw.alphabet().letter(l).and(g).is_false())
                        .map(|(t, _)| t.index())
                        .collect()
                })
                .collect()
        })
        .collect()
}

/// Does some run over `prefix · cycle^ω` visit a rejecting state infinitely
/// often? The word is rejected by the UVW exactly when this holds.
fn rejects(uvw: &Uvw, succ: &[Vec<Vec<usize>>], prefix: &[usize], cycle: &[usize]) -> bool {
    let n = uvw.state_count();
    let rejecting: Vec<bool> = uvw.states().map(|s| uvw.is_rejecting(s)).collect();

    let mut cur = vec![false; n];
    for s in uvw.initial_states() {
        cur[s.index()] = true;
    }
    for &l in prefix {
        let mut next = vec![false; n];
        for s in 0..n {
            if cur[s] {
                for &t in &succ[s][l] {
                    next[t] = true;
                }
            }
        }
        cur = next;
    }

    // product with the cycle positions
    let k = cycle.len();
    let idx = |s: usize, i: usize| s * k + i;
    let mut reach = vec![false; n * k];
    let mut stack: Vec<(usize, usize)> = (0..n).filter(|&s| cur[s]).map(|s| (s, 0)).collect();
    for &(s, i) in &stack {
        reach[idx(s, i)] = true;
    }
    while let Some((s, i)) = stack.pop() {
        for &t in &succ[s][cycle[i]] {
            let j = (i + 1) % k;
            if !reach[idx(t, j)] {
                reach[idx(t, j)] = true;
                stack.push((t, j));
            }
        }
    }

    // a reachable rejecting product node lying on a product cycle
    for s in (0..n).filter(|&s| rejecting[s]) {
        for i in 0..k {
            if !reach[idx(s, i)] {
                continue;
            }
            let mut seen = vec![false; n * k];
            let mut stack: Vec<(usize, usize)> = succ[s][cycle[i]]
                .iter()
                .map(|&t| (t, (i + 1) % k))
                .collect();
            while let Some((t, j)) = stack.pop() {
                if (t, j) == (s, i) {
                    return true;
                }
                if !seen[idx(t, j)] {
                    seen[idx(t, j)] = true;
                    stack.extend(succ[t][cycle[j]].iter().map(|&u| (u, (j + 1) % k)));
                }
            }
        }
    }
    false
}

fn assert_same_language(a: &Uvw, b: &Uvw, context: &str) {
    let sa = successors(a);
    let sb = successors(b);
    let letters = a.alphabet().nof_letters();
    for prefix in words(letters, 2) {
        for cycle in words(letters, 2).into_iter().filter(|c| !c.is_empty()) {
            assert_eq!(
                rejects(a, &sa, &prefix, &cycle),
                rejects(b, &sb, &prefix, &cycle),
                "{context}: language differs on {prefix:?}·{cycle:?}^ω\nbefore:\n{a}\nafter:\n{b}"
            );
        }
    }
}

#[test]
fn every_pass_preserves_the_language() {
    let alphabet = Arc::new(Alphabet::new(2, 4).unwrap());
    let mut rng = StdRng::seed_from_u64(0xc0ffee);
    let passes: [(&str, fn(&mut Uvw)); 7] = [
        ("remove_dead_ends", |u| u.remove_dead_ends()),
        ("simulation_minimize", |u| u.simulation_minimize()),
        ("merge_equivalent", |u| u.merge_equivalent()),
        ("remove_dominated", |u| u.remove_dominated()),
        ("remove_unreachable", |u| u.remove_unreachable()),
        ("demote_transient", |u| u.demote_transient()),
        ("brute_force_removal", |u| u.brute_force_removal()),
    ];

    for round in 0..10 {
        let original = random_uvw(&mut rng, &alphabet);
        for (name, pass) in &passes {
            let mut reduced = original.clone();
            pass(&mut reduced);
            assert!(
                reduced.state_count() <= original.state_count(),
                "{name} grew the automaton in round {round}"
            );
            assert_same_language(&original, &reduced, &format!("{name}, round {round}"));
        }

        let mut reduced = original.clone();
        reduced.minimize();
        assert_same_language(&original, &reduced, &format!("minimize, round {round}"));
    }
}

#[test]
fn removal_passes_are_idempotent() {
    let alphabet = Arc::new(Alphabet::new(2, 4).unwrap());
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let mut a = random_uvw(&mut rng, &alphabet);
        a.remove_unreachable();
        let once = a.to_string();
        a.remove_unreachable();
        assert_eq!(once, a.to_string());

        let mut b = random_uvw(&mut rng, &alphabet);
        b.remove_dead_ends();
        let once = b.to_string();
        b.remove_dead_ends();
        assert_eq!(once, b.to_string());
    }
}

#[test]
fn simulation_is_reflexive_and_respects_rejecting_flags() {
    let alphabet = bit_alphabet();
    let uvw = crate::uvw!(alphabet;
        p => { p: [1] }
        q(rejecting) => { q: [1] }
        ===
        init = [p]
    );

    let sim = uvw.simulation();
    for s in uvw.states().collect_vec() {
        assert!(sim.le(s, s));
        // everything is simulated by the top state
        assert!(sim.le(s, uvw.top()));
    }
    let p = uvw.states().nth(1).unwrap();
    let q = uvw.states().nth(2).unwrap();
    // a rejecting state is never simulated by a non-rejecting one
    assert!(!sim.le(q, p));
    assert!(sim.le(p, q));
}
