use crate::{Error, Result};

/// Names of the store keys a job uses. Every key is prefixed with the job's namespace,
/// so multiple jobs can share one store.
#[derive(Clone, Debug)]
pub(crate) struct Keys {
    namespace: String,
}
impl Keys {
    pub fn new(namespace: &str) -> Self {
        Self { namespace: namespace.to_owned() }
    }

    /// Published centroid of cluster **k** (list of D floats)
    pub fn centroid(&self, k: usize) -> String { format!("{}:centroid{}", self.namespace, k) }
    /// Contribution counter of cluster **k**
    pub fn centroid_counter(&self, k: usize) -> String { format!("{}_c", self.centroid(k)) }
    /// Partial sum of cluster **k** (hash: coordinate index -> sum)
    pub fn centroid_temp(&self, k: usize) -> String { format!("{}_temp", self.centroid(k)) }
    /// Partial size of cluster **k**
    pub fn centroid_size(&self, k: usize) -> String { format!("{}_st", self.centroid(k)) }

    pub fn delta(&self) -> String { format!("{}:delta", self.namespace) }
    pub fn delta_counter(&self) -> String { format!("{}_c", self.delta()) }
    pub fn delta_numerator(&self) -> String { format!("{}_temp", self.delta()) }
    pub fn delta_denominator(&self) -> String { format!("{}_st", self.delta()) }

    pub fn barrier_arrivals(&self, name: &str, generation: u64) -> String {
        format!("{}:{}-list-{}", self.namespace, name, generation)
    }
    pub fn barrier_complete(&self, name: &str, generation: u64) -> String {
        format!("{}:{}-complete-{}", self.namespace, name, generation)
    }
}


/// Stores keep every value as a string. `{}` on f64 yields the shortest representation
/// that parses back to the identical bit pattern.
pub(crate) fn encode_float(v: f64) -> String {
    format!("{}", v)
}

pub(crate) fn decode_float(op: &'static str, key: &str, raw: &str) -> Result<f64> {
    raw.trim().parse::<f64>()
        .map_err(|_| Error::store(op, key, format!("value `{}` is not a float", raw)))
}

pub(crate) fn decode_int(op: &'static str, key: &str, raw: &str) -> Result<i64> {
    raw.trim().parse::<i64>()
        .map_err(|_| Error::store(op, key, format!("value `{}` is not an integer", raw)))
}

#[cfg(test)]
macro_rules! assert_approx_eq {
	($left: expr, $right: expr, $tol: expr) => ({
		match ($left, $right, $tol) {
			(left_val , right_val, tol_val) => {
				let delta = (left_val - right_val).abs();
				if !(delta < tol_val) {
					panic!(
						"assertion failed: `(left ≈ right)` \
						(left: `{}`, right: `{}`) \
						with ∆={:1.1e} (allowed ∆={:e})",
						left_val , right_val, delta, tol_val
					)
				}
			}
		}
	});
	($left: expr, $right: expr) => (assert_approx_eq!(($left), ($right), 1e-12))
}
