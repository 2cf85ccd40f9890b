use dkmeans::*;
use std::time::Duration;

fn main() -> Result<()> {
    let (parties, rounds) = (5, 3);
    let store = MemoryStore::new();

    // Workers arrive in staggered order, but nobody leaves a round early
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..parties).map(|id| {
            let store = store.clone();
            s.spawn(move || -> Result<()> {
                let mut barrier = Barrier::new(store, "demo", "rounds", parties);
                for round in 0..rounds {
                    std::thread::sleep(Duration::from_millis(20 * ((id + round) % parties) as u64));
                    let position = barrier.wait()?;
                    println!("round {}: worker {} arrived as {}/{}", round, id, position, parties);
                }
                Ok(())
            })
        }).collect();
        handles.into_iter().enumerate()
            .map(|(id, h)| h.join().unwrap_or(Err(Error::WorkerPanicked { worker_id: id })))
            .collect::<Result<Vec<()>>>()
    })?;

    println!("Keys left in the store: {:?}", store.keys());
    Ok(())
}
