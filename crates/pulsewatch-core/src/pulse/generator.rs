//! Periodic pulse-burst pattern generation
//!
//! Produces the edge timestamps of a square-wave burst pattern: a fixed
//! number of pulses at 50% duty cycle, followed by a quiet gap. Used to drive
//! a [`SimulatedLine`](super::line::SimulatedLine) in the demo binary and to
//! build deterministic edge streams in tests and benchmarks.

/// Edge schedule generator for repeating bursts
///
/// Each pulse contributes two edges half a period apart. The off period is
/// measured from the last edge of one burst to the first edge of the next.
///
/// # Example
/// ```
/// use pulsewatch_core::pulse::generator::BurstGenerator;
///
/// let mut gen = BurstGenerator::new(2, 200, 5_000);
/// let edges: Vec<(u64, bool)> = (0..5).map(|_| gen.next_edge()).collect();
/// assert_eq!(
///     edges,
///     vec![(0, true), (100, false), (200, false), (300, false), (5_300, true)]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct BurstGenerator {
    /// Pulses per burst
    pulses_per_burst: u16,
    /// Full pulse period in µs
    pulse_period_us: u32,
    /// Silence between bursts in µs
    off_period_us: u32,
    /// Time of the first edge of the current burst
    burst_start_us: u64,
    /// Position within the current burst (0..edges_per_burst)
    edge_index: u32,
    /// Pulse count to switch to at the next burst boundary
    pending_pulses: Option<u16>,
}

impl BurstGenerator {
    /// Create a generator whose first burst starts at time 0
    ///
    /// # Arguments
    /// * `pulses_per_burst` - Pulses per burst (at least 1)
    /// * `pulse_period_us` - Full period of one pulse (at least 2 µs)
    /// * `off_period_us` - Silence between bursts
    pub fn new(pulses_per_burst: u16, pulse_period_us: u32, off_period_us: u32) -> Self {
        Self {
            pulses_per_burst: pulses_per_burst.max(1),
            pulse_period_us: pulse_period_us.max(2),
            off_period_us,
            burst_start_us: 0,
            edge_index: 0,
            pending_pulses: None,
        }
    }

    /// Move the start of the current burst to `start_us`
    pub fn start_at(mut self, start_us: u64) -> Self {
        self.burst_start_us = start_us;
        self.edge_index = 0;
        self
    }

    /// Timestamp of the next edge and whether it opens a burst
    pub fn next_edge(&mut self) -> (u64, bool) {
        let is_burst_start = self.edge_index == 0;
        let at = self.burst_start_us + self.edge_index as u64 * self.half_period() as u64;

        self.edge_index += 1;
        if self.edge_index >= self.edges_per_burst() {
            self.burst_start_us = at + self.off_period_us as u64;
            self.edge_index = 0;
            if let Some(pulses) = self.pending_pulses.take() {
                self.pulses_per_burst = pulses;
            }
        }

        (at, is_burst_start)
    }

    /// Fill `buffer` with consecutive edge timestamps
    ///
    /// # Returns
    /// Indices into the buffer where a burst started
    pub fn fill_buffer(&mut self, buffer: &mut [u64]) -> Vec<usize> {
        let mut burst_starts = Vec::new();
        for (i, slot) in buffer.iter_mut().enumerate() {
            let (at, is_start) = self.next_edge();
            *slot = at;
            if is_start {
                burst_starts.push(i);
            }
        }
        burst_starts
    }

    /// All edges of the next complete burst
    ///
    /// Finishes the current burst first if one is partly emitted.
    pub fn next_burst(&mut self) -> Vec<u64> {
        while self.edge_index != 0 {
            self.next_edge();
        }
        (0..self.edges_per_burst()).map(|_| self.next_edge().0).collect()
    }

    /// Change the pulse count starting with the next burst
    ///
    /// A partly emitted burst keeps its original length.
    pub fn set_pulses_per_burst(&mut self, pulses: u16) {
        let pulses = pulses.max(1);
        if self.edge_index == 0 {
            self.pulses_per_burst = pulses;
        } else {
            self.pending_pulses = Some(pulses);
        }
    }

    pub fn pulses_per_burst(&self) -> u16 {
        self.pulses_per_burst
    }

    pub fn pulse_period_us(&self) -> u32 {
        self.pulse_period_us
    }

    pub fn off_period_us(&self) -> u32 {
        self.off_period_us
    }

    /// Two edges per pulse
    pub fn edges_per_burst(&self) -> u32 {
        self.pulses_per_burst as u32 * 2
    }

    /// Time from first to last edge of a burst
    pub fn burst_span_us(&self) -> u32 {
        (self.edges_per_burst() - 1) * self.half_period()
    }

    /// Time from one burst start to the next
    pub fn cycle_length_us(&self) -> u64 {
        self.burst_span_us() as u64 + self.off_period_us as u64
    }

    fn half_period(&self) -> u32 {
        self.pulse_period_us / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_per_burst() {
        let gen = BurstGenerator::new(20, 100, 50_000);
        assert_eq!(gen.edges_per_burst(), 40);
        assert_eq!(gen.burst_span_us(), 39 * 50);
        assert_eq!(gen.cycle_length_us(), 39 * 50 + 50_000);
    }

    #[test]
    fn test_cycle_repeats() {
        let mut gen = BurstGenerator::new(3, 100, 10_000);
        let first = gen.next_burst();
        let second = gen.next_burst();

        assert_eq!(first.len(), 6);
        let offset = gen.cycle_length_us();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(b - a, offset);
        }
    }

    #[test]
    fn test_fill_buffer_marks_burst_starts() {
        let mut gen = BurstGenerator::new(2, 100, 3_000);
        let mut buffer = vec![0u64; 12];
        let starts = gen.fill_buffer(&mut buffer);

        assert_eq!(starts, vec![0, 4, 8]);
        assert_eq!(buffer[4] - buffer[3], 3_000);
        assert!(buffer.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_burst_finishes_partial() {
        let mut gen = BurstGenerator::new(2, 100, 3_000);
        gen.next_edge();
        let burst = gen.next_burst();
        assert_eq!(burst[0], 150 + 3_000);
    }

    #[test]
    fn test_start_at() {
        let mut gen = BurstGenerator::new(1, 100, 3_000).start_at(7_000);
        assert_eq!(gen.next_edge(), (7_000, true));
        assert_eq!(gen.next_edge(), (7_050, false));
        assert_eq!(gen.next_edge(), (10_050, true));
    }

    #[test]
    fn test_pulse_count_change_applies_to_next_burst() {
        let mut gen = BurstGenerator::new(2, 100, 3_000);
        gen.next_edge();
        gen.set_pulses_per_burst(5);
        assert_eq!(gen.pulses_per_burst(), 2);
        assert_eq!(gen.next_edge(), (50, false));
        assert_eq!(gen.next_edge(), (100, false));
        assert_eq!(gen.next_edge(), (150, false));
        assert_eq!(gen.pulses_per_burst(), 5);
        assert_eq!(gen.next_burst().len(), 10);
    }

    #[test]
    fn test_minimums() {
        let gen = BurstGenerator::new(0, 0, 0);
        assert_eq!(gen.pulses_per_burst(), 1);
        assert_eq!(gen.pulse_period_us(), 2);
    }
}
