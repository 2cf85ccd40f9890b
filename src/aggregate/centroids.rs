use super::{contributions, script_input};
use crate::helpers::{decode_float, encode_float, Keys};
use crate::store::{Commands, CoordinationStore, Script};
use crate::{Error, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

/// Adds one worker's partial sum and size into cluster k's temporaries and finalizes the round
/// on the Pth contribution.
///
/// - **KEYS**: `[centroid, counter, temp, size]`
/// - **ARGV**: `[partial_count, parties, sum_0, ..., sum_{D-1}]`
pub const UPDATE_CENTROID: Script = Script {
    name: "update_centroid",
    lua: r#"
        local centroidKey = KEYS[1]
        local counterKey = KEYS[2]
        local tempKey = KEYS[3]
        local sizeKey = KEYS[4]
        local parties = tonumber(ARGV[2])
        local n = redis.call("LLEN", centroidKey)
        if n == 0 then
            return redis.error_reply("centroid " .. centroidKey .. " is not initialized")
        end
        if #ARGV - 2 ~= n then
            return redis.error_reply("partial sum has " .. (#ARGV - 2) .. " coordinates, centroid has " .. n)
        end
        if tonumber(redis.call("GET", counterKey) or "0") == 0 then
            redis.call("DEL", tempKey, sizeKey)
            for i = 0, n - 1 do
                redis.call("HSET", tempKey, tostring(i), "0")
            end
            redis.call("SET", sizeKey, 0)
        end
        for i = 0, n - 1 do
            redis.call("HINCRBYFLOAT", tempKey, tostring(i), ARGV[3 + i])
        end
        local size = redis.call("INCRBY", sizeKey, ARGV[1])
        local count = redis.call("INCR", counterKey)
        if count == parties then
            if size ~= 0 then
                local values = {}
                for i = 0, n - 1 do
                    local sum = tonumber(redis.call("HGET", tempKey, tostring(i)))
                    values[i + 1] = string.format("%.17g", sum / size)
                end
                redis.call("DEL", centroidKey)
                redis.call("RPUSH", centroidKey, unpack(values))
            end
            redis.call("SET", counterKey, 0)
            for i = 0, n - 1 do
                redis.call("HSET", tempKey, tostring(i), "0")
            end
            redis.call("SET", sizeKey, 0)
        end
        return 0
    "#,
    body: update_centroid,
};

fn update_centroid(cmds: &mut dyn Commands, keys: &[String], args: &[String]) -> Result<()> {
    let (keys, ints) = script_input(UPDATE_CENTROID.name, keys, args, 2)?;
    let [centroid, counter, temp, size] = keys;
    let (partial_count, parties) = (ints[0], ints[1]);
    let partial_sum = args[2..].iter()
        .map(|raw| decode_float("EVAL", temp, raw))
        .collect::<Result<Vec<f64>>>()?;

    let dims = cmds.llen(centroid)?;
    if dims == 0 {
        return Err(Error::store("EVAL", centroid.as_str(), "centroid is not initialized"));
    }
    if partial_sum.len() != dims {
        return Err(Error::store("EVAL", centroid.as_str(),
            format!("partial sum has {} coordinates, centroid has {}", partial_sum.len(), dims)));
    }

    // first contribution of the round
    if contributions(cmds, counter)? == 0 {
        cmds.del(&[temp.as_str(), size.as_str()])?;
        zero_temporaries(cmds, temp, size, dims)?;
    }
    for (i, v) in partial_sum.into_iter().enumerate() {
        cmds.hincr_by_float(temp, &i.to_string(), v)?;
    }
    let total = cmds.incr_by(size, partial_count)?;
    let count = cmds.incr_by(counter, 1)?;

    if count == parties {
        // an empty cluster keeps its previous centroid
        if total != 0 {
            let averaged = (0..dims).map(|i| {
                let sum = match cmds.hget(temp, &i.to_string())? {
                    Some(raw) => decode_float("EVAL", temp, &raw)?,
                    None => 0.0,
                };
                Ok(encode_float(sum / total as f64))
            }).collect::<Result<Vec<String>>>()?;
            cmds.del(&[centroid.as_str()])?;
            cmds.rpush(centroid, &averaged)?;
        }
        cmds.set(counter, "0")?;
        zero_temporaries(cmds, temp, size, dims)?;
    }
    Ok(())
}

fn zero_temporaries(cmds: &mut dyn Commands, temp: &str, size: &str, dims: usize) -> Result<()> {
    for i in 0..dims {
        cmds.hset(temp, &i.to_string(), "0")?;
    }
    cmds.set(size, "0")
}

/// Deterministic initial centroid: **dims** draws from a standard normal distribution seeded
/// with **seed**. Independent processes produce bit-identical vectors for the same arguments.
pub fn seeded_centroid(seed: u64, dims: usize) -> Vec<f64> {
    let mut rnd = StdRng::seed_from_u64(seed);
    (0..dims).map(|_| rnd.sample(StandardNormal)).collect()
}


/// Shared centroid state of a job: for each of the K clusters, the published centroid, a
/// contribution counter and the partial sum and size of the round in progress.
///
/// ## Fields
/// - **clusters**: Amount of clusters (K)
/// - **dimensions**: Dimensionality of each centroid (D)
/// - **parties**: Amount of contributions that complete a round (P)
pub struct CentroidAggregator<S: CoordinationStore> {
    store: S,
    keys: Keys,
    clusters: usize,
    dimensions: usize,
    parties: usize,
}
impl<S: CoordinationStore> CentroidAggregator<S> {
    pub fn new(store: S, namespace: &str, clusters: usize, dimensions: usize, parties: usize) -> Self {
        Self { store, keys: Keys::new(namespace), clusters, dimensions, parties }
    }

    pub fn clusters(&self) -> usize { self.clusters }
    pub fn dimensions(&self) -> usize { self.dimensions }

    /// Overwrite all clusters with seeded standard-normal centroids (cluster k uses
    /// `seed_base + k`) and reset their counters. Called once per job by the coordinator,
    /// never by a worker.
    pub fn initialize(&self, seed_base: u64) -> Result<()> {
        info!(clusters = self.clusters, dimensions = self.dimensions, parties = self.parties,
            seed_base, "initializing global centroids");
        for k in 0..self.clusters {
            let centroid = seeded_centroid(seed_base.wrapping_add(k as u64), self.dimensions);
            self.reset_cluster(k, &centroid)?;
        }
        Ok(())
    }

    /// Overwrite all clusters with the given centroids and reset their counters.
    ///
    /// ## Arguments
    /// - **centroids**: Initial centroids [row-major] = [<centroid0>,<centroid1>,...], K × D values
    pub fn initialize_with(&self, centroids: &[f64]) -> Result<()> {
        if centroids.len() != self.clusters * self.dimensions {
            return Err(Error::config(format!(
                "expected {} x {} initial centroid values, got {}", self.clusters, self.dimensions, centroids.len())));
        }
        info!(clusters = self.clusters, dimensions = self.dimensions, "initializing global centroids from given values");
        for (k, centroid) in centroids.chunks_exact(self.dimensions).enumerate() {
            self.reset_cluster(k, centroid)?;
        }
        Ok(())
    }

    fn reset_cluster(&self, k: usize, centroid: &[f64]) -> Result<()> {
        let key = self.keys.centroid(k);
        let temp = self.keys.centroid_temp(k);
        self.store.del(&[key.as_str(), temp.as_str()])?;
        self.store.rpush(&key, &centroid.iter().cloned().map(encode_float).collect::<Vec<_>>())?;
        self.store.set(&self.keys.centroid_counter(k), "0")?;
        self.store.set(&self.keys.centroid_size(k), "0")?;
        Ok(())
    }

    /// Contribute this worker's partial sum and point count for cluster **k** to the current round.
    /// Runs as one atomic script; never blocks beyond concurrent publishes to the same cluster.
    ///
    /// ## Arguments
    /// - **k**: Cluster index
    /// - **partial_sum**: Component-wise sum of the points this worker assigned to **k** (D values)
    /// - **partial_count**: Amount of points this worker assigned to **k**
    pub fn publish(&self, k: usize, partial_sum: &[f64], partial_count: u64) -> Result<()> {
        if k >= self.clusters {
            return Err(Error::store("EVAL", self.keys.centroid(k), format!("cluster index out of range (K = {})", self.clusters)));
        }
        let keys = [
            self.keys.centroid(k),
            self.keys.centroid_counter(k),
            self.keys.centroid_temp(k),
            self.keys.centroid_size(k),
        ];
        let args: Vec<String> = [partial_count.to_string(), self.parties.to_string()].into_iter()
            .chain(partial_sum.iter().cloned().map(encode_float))
            .collect();
        self.store.eval(&UPDATE_CENTROID, &keys, &args)
    }

    /// Currently published centroids of all clusters [row-major], K × D values.
    ///
    /// Clusters are read one after another. Callers only read after a barrier release, when no
    /// publish of the previous round is still in flight.
    pub fn snapshot(&self) -> Result<Vec<f64>> {
        let mut centroids = Vec::with_capacity(self.clusters * self.dimensions);
        for k in 0..self.clusters {
            let key = self.keys.centroid(k);
            let raw = self.store.lrange(&key)?;
            if raw.len() != self.dimensions {
                return Err(Error::store("LRANGE", key,
                    format!("centroid has {} coordinates, expected {}", raw.len(), self.dimensions)));
            }
            for v in raw.iter() {
                centroids.push(decode_float("LRANGE", &key, v)?);
            }
        }
        debug!(clusters = self.clusters, "fetched centroid snapshot");
        Ok(centroids)
    }

    /// Contributions received so far in the current round for cluster **k**.
    pub fn contributions(&self, k: usize) -> Result<u64> {
        let key = self.keys.centroid_counter(k);
        match self.store.get(&key)? {
            Some(raw) => Ok(crate::helpers::decode_int("GET", &key, &raw)?.max(0) as u64),
            None => Ok(0),
        }
    }
}
