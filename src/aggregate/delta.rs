use super::{contributions, script_input};
use crate::helpers::{decode_float, encode_float, Keys};
use crate::store::{Commands, CoordinationStore, Script};
use crate::Result;
use tracing::info;

/// Adds one worker's changed-point count and partition size and, on the Pth contribution,
/// publishes `numerator / denominator` as the new convergence value.
///
/// - **KEYS**: `[delta, counter, numerator, denominator]`
/// - **ARGV**: `[partial_numerator, partial_denominator, parties]`
pub const UPDATE_DELTA: Script = Script {
    name: "update_delta",
    lua: r#"
        local deltaKey = KEYS[1]
        local counterKey = KEYS[2]
        local numeratorKey = KEYS[3]
        local denominatorKey = KEYS[4]
        if tonumber(redis.call("GET", counterKey) or "0") == 0 then
            redis.call("SET", numeratorKey, 0)
            redis.call("SET", denominatorKey, 0)
        end
        local numerator = redis.call("INCRBY", numeratorKey, ARGV[1])
        local denominator = redis.call("INCRBY", denominatorKey, ARGV[2])
        local count = redis.call("INCR", counterKey)
        if count == tonumber(ARGV[3]) then
            local value = 0
            if denominator ~= 0 then
                value = numerator / denominator
            end
            redis.call("SET", deltaKey, string.format("%.17g", value))
            redis.call("SET", counterKey, 0)
            redis.call("SET", numeratorKey, 0)
            redis.call("SET", denominatorKey, 0)
        end
        return 0
    "#,
    body: update_delta,
};

fn update_delta(cmds: &mut dyn Commands, keys: &[String], args: &[String]) -> Result<()> {
    let (keys, ints) = script_input(UPDATE_DELTA.name, keys, args, 3)?;
    let [delta, counter, numerator, denominator] = keys;
    let parties = ints[2];

    if contributions(cmds, counter)? == 0 {
        cmds.set(numerator, "0")?;
        cmds.set(denominator, "0")?;
    }
    let num = cmds.incr_by(numerator, ints[0])?;
    let den = cmds.incr_by(denominator, ints[1])?;
    let count = cmds.incr_by(counter, 1)?;

    if count == parties {
        let value = if den != 0 { num as f64 / den as f64 } else { 0.0 };
        cmds.set(delta, &encode_float(value))?;
        cmds.set(counter, "0")?;
        cmds.set(numerator, "0")?;
        cmds.set(denominator, "0")?;
    }
    Ok(())
}


/// Shared convergence value of a job: the fraction of all points that changed their cluster
/// assignment in the last completed round.
pub struct DeltaAggregator<S: CoordinationStore> {
    store: S,
    keys: Keys,
    parties: usize,
}
impl<S: CoordinationStore> DeltaAggregator<S> {
    pub fn new(store: S, namespace: &str, parties: usize) -> Self {
        Self { store, keys: Keys::new(namespace), parties }
    }

    /// Set the convergence value to 1.0 (nothing converged yet, above every valid threshold)
    /// and reset counter and temporaries. Called once per job by the coordinator.
    pub fn initialize(&self) -> Result<()> {
        info!(parties = self.parties, "initializing global delta");
        self.store.set(&self.keys.delta(), "1")?;
        self.store.set(&self.keys.delta_counter(), "0")?;
        self.store.set(&self.keys.delta_numerator(), "0")?;
        self.store.set(&self.keys.delta_denominator(), "0")?;
        Ok(())
    }

    /// Contribute this worker's counts to the current round.
    ///
    /// ## Arguments
    /// - **changed**: Points of this worker whose assignment changed this round
    /// - **observed**: Points of this worker observed this round (its partition size)
    pub fn publish(&self, changed: u64, observed: u64) -> Result<()> {
        let keys = [
            self.keys.delta(),
            self.keys.delta_counter(),
            self.keys.delta_numerator(),
            self.keys.delta_denominator(),
        ];
        let args = [changed.to_string(), observed.to_string(), self.parties.to_string()];
        self.store.eval(&UPDATE_DELTA, &keys, &args)
    }

    /// The last finalized convergence value.
    pub fn value(&self) -> Result<f64> {
        let key = self.keys.delta();
        match self.store.get(&key)? {
            Some(raw) => decode_float("GET", &key, &raw),
            None => Err(crate::Error::store("GET", key, "convergence value is not initialized")),
        }
    }
}
