//! External simulation clock.
//!
//! The core never advances time itself: every balance query and mutation
//! takes the tick as an argument. `SimClock` is the clock a host (the
//! runner, a test) owns and feeds into the engine.

use crate::types::{RunId, Tick};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id:       RunId,
    pub current_tick: Tick,
    pub speed:        SimSpeed,
    pub paused:       bool,
}

impl SimClock {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current_tick: 0,
            speed: SimSpeed::Normal,
            paused: true,
        }
    }

    /// Advance by the ticks one step covers at the current speed.
    /// Returns the new tick number.
    /// Panics if called while paused — callers must check.
    pub fn advance(&mut self) -> Tick {
        assert!(!self.paused, "advance() called on paused clock");
        self.current_tick += self.ticks_per_step();
        self.current_tick
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
    }

    pub fn ticks_per_step(&self) -> Tick {
        match self.speed {
            SimSpeed::Normal      => 1,
            SimSpeed::Accelerated => 7,
            SimSpeed::FastForward => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    Normal,       // 1 tick/step
    Accelerated,  // 7 ticks/step
    FastForward,  // 30 ticks/step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_respects_speed() {
        let mut clock = SimClock::new("c".into());
        clock.resume();
        assert_eq!(clock.advance(), 1);
        clock.set_speed(SimSpeed::Accelerated);
        assert_eq!(clock.advance(), 8);
    }
}
