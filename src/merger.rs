//! Batch driver: fold a whole learner stream into one minimized automaton.

use std::io::BufRead;
use std::sync::Arc;

use tracing::debug;

use crate::alphabet::Alphabet;
use crate::chain::{ChainError, Reader};
use crate::uvw::Uvw;

/// Read a full `LEARNING … END` stream and return the folded automaton.
///
/// Every chain is unfolded and the incremental reduction sequence applied
/// before the next chain is read; the exhaustive pass runs once after `END`.
/// Nothing is mutated for a record that fails validation, so an error leaves
/// no partial output worth keeping.
pub fn merge_chains<R: BufRead>(input: R) -> Result<Uvw, ChainError> {
    let mut reader = Reader::new(input)?;
    let header = reader.header();
    let alphabet = Arc::new(Alphabet::new(header.nof_bits, header.nof_letters)?);
    debug!(bits = header.nof_bits, letters = header.nof_letters, "alphabet ready");

    let mut uvw = Uvw::new(alphabet);
    let mut chains = 0usize;
    while let Some(chain) = reader.next_chain()? {
        uvw.add_chain(&chain);
        uvw.minimize();
        chains += 1;
        debug!(chains, states = uvw.state_count(), "chain folded");
    }
    reader.finish()?;

    uvw.minimize_exhaustive();
    Ok(uvw)
}
