//! Distributed reductions over the coordination store.
//!
//! Both aggregators follow the same protocol. Each of the P workers publishes one contribution
//! per round through an atomic script. The script zeroes the temporaries when it sees the first
//! contribution of a round (counter == 0), accumulates, increments the counter, and on the Pth
//! contribution finalizes: it publishes the combined value and resets counter and temporaries.
//! No worker needs to know the others' identities or timing.

mod centroids;
mod delta;

pub use centroids::{seeded_centroid, CentroidAggregator, UPDATE_CENTROID};
pub use delta::{DeltaAggregator, UPDATE_DELTA};

use crate::helpers::decode_int;
use crate::store::Commands;
use crate::{Error, Result};

/// Current value of a contribution counter. A missing counter reads as 0.
fn contributions(cmds: &mut dyn Commands, counter: &str) -> Result<i64> {
    match cmds.get(counter)? {
        Some(raw) => decode_int("EVAL", counter, &raw),
        None => Ok(0),
    }
}

/// Validates the keys and leading integer arguments handed to an aggregator script.
fn script_input<'a>(name: &'static str, keys: &'a [String], args: &'a [String], int_args: usize)
        -> Result<(&'a [String; 4], Vec<i64>)> {
    let keys: &[String; 4] = keys.try_into()
        .map_err(|_| Error::store("EVAL", name, format!("expected 4 keys, got {}", keys.len())))?;
    if args.len() < int_args {
        return Err(Error::store("EVAL", keys[0].as_str(), format!("expected at least {} arguments, got {}", int_args, args.len())));
    }
    let ints = args[..int_args].iter()
        .map(|raw| decode_int("EVAL", &keys[0], raw))
        .collect::<Result<Vec<i64>>>()?;
    Ok((keys, ints))
}
