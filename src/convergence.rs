/// Decides whether a worker runs another round.
///
/// The loop continues while fewer than `max_iterations` rounds have completed **and** the last
/// global convergence value is still above `threshold`. Before the first round the value is
/// taken to be `1.0`, so a job with `max_iterations > 0` always runs at least one round.
///
/// ## Fields:
/// - **threshold**: Convergence threshold, the job converged once `value <= threshold`
/// - **max_iterations**: Upper bound for the amount of rounds
#[derive(Clone, Debug)]
pub struct ConvergenceCheck {
    threshold: f64,
    max_iterations: usize,
    iterations: usize,
    value: f64,
}
impl ConvergenceCheck {
    pub fn new(threshold: f64, max_iterations: usize) -> Self {
        Self { threshold, max_iterations, iterations: 0, value: 1.0 }
    }

    /// ## Returns
    /// - **true** if the worker should run another round
    /// - **false** if it should stop
    pub fn should_continue(&self) -> bool {
        self.iterations < self.max_iterations && self.value > self.threshold
    }

    /// Has to be called once a round completed and the new global value was read.
    /// ## Arguments
    /// - **value**: The global convergence value published for the completed round
    pub fn next(&mut self, value: f64) {
        self.iterations += 1;
        self.value = value;
    }

    /// Rounds completed so far.
    pub fn iterations(&self) -> usize { self.iterations }
    /// Last observed global convergence value.
    pub fn value(&self) -> f64 { self.value }
    /// Whether the last observed value reached the threshold.
    pub fn converged(&self) -> bool { self.value <= self.threshold }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_when_value_reaches_threshold() {
        let mut check = ConvergenceCheck::new(0.001, 20);
        assert_eq!(check.should_continue(), true);
        check.next(1.0);
        assert_eq!(check.should_continue(), true);
        check.next(0.0015);
        assert_eq!(check.should_continue(), true);
        check.next(0.001);
        assert_eq!(check.should_continue(), false);
        assert_eq!(check.iterations(), 3);
        assert!(check.converged());
    }

    #[test]
    fn stops_at_max_iterations() {
        let mut check = ConvergenceCheck::new(0.00001, 2);
        check.next(0.5);
        assert_eq!(check.should_continue(), true);
        check.next(0.4);
        assert_eq!(check.should_continue(), false);
        assert!(!check.converged());
    }

    #[test]
    fn zero_iterations_never_runs() {
        let check = ConvergenceCheck::new(0.00001, 0);
        assert_eq!(check.should_continue(), false);
        assert_eq!(check.iterations(), 0);
        assert_eq!(check.value(), 1.0);
    }

    #[test]
    fn zero_threshold_needs_exact_convergence() {
        let mut check = ConvergenceCheck::new(0.0, 10);
        check.next(1e-9);
        assert_eq!(check.should_continue(), true);
        check.next(0.0);
        assert_eq!(check.should_continue(), false);
    }
}
