//! Loop detection over scan origins.

extern crate cgmath;

use cgmath::{InnerSpace, Point3};

/// Best loop candidate so far: an index pair and the smallest inter-origin
/// distance seen when it was recorded.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    min_dist: f64,
    first: usize,
    last: usize,
}

/// Decides, each time a new scan is appended to the sequence, whether the
/// path from some earlier scan back to this one closes a loop.
///
/// The decision is a hysteresis over inter-origin distance: walking backwards
/// from the new scan, the path must first move farther than `dist` away and
/// then come back within `dist`. Every return-to-near updates the best
/// candidate slot if its distance beats the recorded minimum, so the
/// candidate surviving a full walk is the qualifying scan closest to the
/// start of the sequence.
///
/// The candidate slot persists across calls. A candidate is emitted once a
/// later walk shows no return-to-near of its own, or once the end of the
/// sequence is reached; emission clears the slot. This means a candidate
/// remembered from an earlier call can be emitted by a call whose own walk
/// saw no loop shape at all.
#[derive(Debug)]
pub struct LoopDetector {
    dist: f64,
    candidate: Option<Candidate>,
}

impl LoopDetector {
    /// Create a detector with the given loop-detection distance threshold.
    pub fn new(dist: f64) -> Self {
        LoopDetector {
            dist,
            candidate: None,
        }
    }

    /// Consider scan `end` against the scans before it. `origins` holds the
    /// common-frame origins of the whole sequence; only indices below `end`
    /// are compared. Returns the loop endpoints `(first, last)` when a loop
    /// triggers.
    pub fn detect(&mut self, end: usize, origins: &[Point3<f64>]) -> Option<(usize, usize)> {
        let mut state = 0;

        for i in (1..end).rev() {
            let norm = (origins[end] - origins[i]).magnitude();

            if state == 0 && norm > self.dist {
                state = 1;
            }
            if state > 0 && norm < self.dist {
                state = 2;
                let better = match self.candidate {
                    None => true,
                    Some(c) => norm < c.min_dist,
                };
                if better {
                    self.candidate = Some(Candidate {
                        min_dist: norm,
                        first: i,
                        last: end,
                    });
                }
            }
        }

        if state < 2 || end + 1 == origins.len() {
            if let Some(c) = self.candidate.take() {
                return Some((c.first, c.last));
            }
        }
        None
    }
}
