use serde::{Serialize, Deserialize};

/// Which way the key evaluation metric should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// `"Loss"` is minimised; every other metric is maximised.
    pub fn from_key_eval(key_eval: &str) -> Direction {
        if key_eval == "Loss" {
            Direction::Minimize
        } else {
            Direction::Maximize
        }
    }
}

/// Best validation value seen so far in a run and the epoch it came from.
/// `epoch` is 0 until the first improvement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestState {
    pub direction: Direction,
    pub value: f64,
    pub epoch: usize,
}

impl BestState {
    pub fn new(direction: Direction) -> BestState {
        let value = match direction {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => 0.0,
        };
        BestState { direction, value, epoch: 0 }
    }

    pub fn for_key_eval(key_eval: &str) -> BestState {
        BestState::new(Direction::from_key_eval(key_eval))
    }

    /// Ties count as improvements, so the later epoch wins. NaN never does.
    pub fn is_better(&self, current: f64) -> bool {
        match self.direction {
            Direction::Minimize => current <= self.value,
            Direction::Maximize => current >= self.value,
        }
    }

    pub fn record(&mut self, value: f64, epoch: usize) {
        self.value = value;
        self.epoch = epoch;
    }

    pub fn epochs_since(&self, epoch: usize) -> usize {
        epoch.saturating_sub(self.epoch)
    }
}
