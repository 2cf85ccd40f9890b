use crate::helpers::Keys;
use crate::store::CoordinationStore;
use crate::Result;
use tracing::trace;

/// Reusable rendezvous point for a fixed number of participants that share nothing but the store.
///
/// Every participant owns its own `Barrier` instance (with the same name and party count) and
/// tracks the generation locally. Generation `g` uses two lists: arrivals are pushed onto
/// `<name>-list-<g>`, and the last arrival releases everybody else by pushing one token per
/// party onto `<name>-complete-<g>`. The last arrival of generation `g` also deletes the
/// completion list of generation `g - 1`, so at most two generations live in the store.
///
/// The barrier assumes exactly `parties` participants. If one of them never arrives, the others
/// stay blocked forever.
pub struct Barrier<S: CoordinationStore> {
    store: S,
    keys: Keys,
    name: String,
    parties: usize,
    generation: u64,
}
impl<S: CoordinationStore> Barrier<S> {
    /// ## Arguments
    /// - **store**: Store handle of the calling participant
    /// - **namespace**: Key prefix of the job
    /// - **name**: Name of this barrier, unique within the job
    /// - **parties**: Number of participants
    pub fn new(store: S, namespace: &str, name: &str, parties: usize) -> Self {
        Self {
            store,
            keys: Keys::new(namespace),
            name: name.to_owned(),
            parties,
            generation: 0,
        }
    }

    /// Generation the next [`Barrier::wait`] call will enter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Block until all parties have called `wait` for the current generation.
    ///
    /// ## Returns
    /// The 1-based arrival position within this generation. Exactly one participant per
    /// generation receives `parties`; that participant does not block.
    pub fn wait(&mut self) -> Result<usize> {
        let arrivals = self.keys.barrier_arrivals(&self.name, self.generation);
        let complete = self.keys.barrier_complete(&self.name, self.generation);

        let position = self.store.lpush(&arrivals, &[String::new()])?;
        trace!(generation = self.generation, position, "barrier arrival");
        if position < self.parties {
            self.store.blpop(&complete)?;
        } else {
            let tokens: Vec<String> = (0..self.parties).map(|i| i.to_string()).collect();
            self.store.lpush(&complete, &tokens)?;
            match self.generation.checked_sub(1) {
                Some(previous) => {
                    let previous = self.keys.barrier_complete(&self.name, previous);
                    self.store.del(&[arrivals.as_str(), previous.as_str()])?;
                }
                None => {
                    self.store.del(&[arrivals.as_str()])?;
                }
            }
        }

        self.generation += 1;
        Ok(position)
    }
}
