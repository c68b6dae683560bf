pub mod dot;

/// Build a UVW fixture from a state/edge listing. Guards are given as
/// letter-index lists; `(rejecting)` marks a rejecting state; `all` names
/// the top state. Mainly for tests.
///
/// ```ignore
/// let uvw = chain2uvw::uvw!(alphabet;
///     q0 => { q1: [0, 2], q0: [1] }
///     q1(rejecting) => { q1: [1] }
///     ===
///     init = [q0]
/// );
/// ```
#[macro_export]
macro_rules! uvw {
    (@rej) => { false };
    (@rej $r:ident) => { true };
    ($alphabet:expr;
        $( $name:ident $(($rej:ident))? => { $( $dst:ident : [ $($letter:literal),* $(,)? ] ),* $(,)? } )*
        ===
        init = [ $( $init:ident ),* $(,)? ]
    ) => {{
        let alphabet = ::std::sync::Arc::clone(&$alphabet);
        let mut uvw = $crate::uvw::Uvw::new(::std::sync::Arc::clone(&alphabet));
        #[allow(unused_variables)]
        let all = uvw.top();
        $(
            #[allow(non_snake_case, unused_variables)]
            let $name = uvw.add_state($crate::uvw!(@rej $($rej)?));
        )*
        $(
            $(
                let letters: &[usize] = &[$($letter),*];
                let guard = letters
                    .iter()
                    .fold(alphabet.mk_false(), |acc, &l| acc.or(alphabet.letter(l)));
                uvw.add_edge($name, $dst, guard);
            )*
        )*
        $( uvw.set_initial($init); )*
        uvw
    }};
}
