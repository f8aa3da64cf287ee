/*
 *  autolevel.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Decaying running ceilings used to rescale output as ambient level drifts
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};

use crate::falloff::{Falloff, FalloffType};

pub const AUTO_LEVEL_MIN_DEFAULT: f32 = 10.0;

/// Auto-level settings. `min` and `max` are in raw (pre-normalized) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoLevel {
    pub enabled: bool,
    pub falloff: Falloff,
    /// lowest value a ceiling decays to
    pub min: f32,
    /// hard ceiling, `None` never clips
    pub max: Option<f32>,
}

impl Default for AutoLevel {
    fn default() -> Self {
        Self {
            enabled: false,
            falloff: Falloff::new(FalloffType::Exponential, 0.001),
            min: AUTO_LEVEL_MIN_DEFAULT,
            max: None,
        }
    }
}

impl AutoLevel {
    /// Builds enabled settings; a `None` falloff policy switches auto-level off.
    /// A negative `min` lets the ceiling fall all the way to zero.
    pub fn new(falloff: Falloff, min: f32, max: Option<f32>) -> Self {
        Self {
            enabled: !falloff.is_none(),
            falloff,
            min: min.max(0.0),
            max,
        }
    }

    /// Hard ceiling that applies right now, if any.
    #[inline]
    pub fn clip_limit(&self) -> Option<f32> {
        if self.enabled { self.max } else { None }
    }
}

/// One running peak-of-peaks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ceiling {
    value: f32,
    rate: f32,
}

impl Ceiling {
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Per-frame release toward `floor`, never below it.
    pub fn decay(&mut self, falloff: &Falloff, floor: f32) {
        if self.value > floor {
            self.rate = falloff.next_rate(self.rate);
            self.value -= self.rate;
        }
        if self.value < floor {
            self.value = floor;
        }
    }

    /// Raise the ceiling to `value` if it is higher. Returns true when the
    /// rise was cut short by `limit`, i.e. the value is clipping.
    pub fn observe(&mut self, value: f32, limit: Option<f32>) -> bool {
        if value <= self.value {
            return false;
        }
        self.rate = 0.0;
        match limit {
            Some(max) if value > max => {
                self.value = max;
                true
            }
            _ => {
                self.value = value;
                false
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_policy_disables() {
        let a = AutoLevel::new(Falloff::none(), 5.0, Some(100.0));
        assert!(!a.enabled);
        assert_eq!(a.clip_limit(), None);
        let a = AutoLevel::new(Falloff::new(FalloffType::Linear, 1.0), -1.0, None);
        assert!(a.enabled);
        assert_eq!(a.min, 0.0);
    }

    #[test]
    fn decay_holds_the_floor() {
        let f = Falloff::new(FalloffType::Exponential, 0.5);
        let mut c = Ceiling::default();
        c.observe(40.0, None);
        for _ in 0..64 {
            c.decay(&f, 10.0);
            assert!(c.value() >= 10.0);
        }
        assert_eq!(c.value(), 10.0);
    }

    #[test]
    fn starts_at_floor() {
        let mut c = Ceiling::default();
        c.decay(&Falloff::new(FalloffType::Linear, 1.0), 10.0);
        assert_eq!(c.value(), 10.0);
    }

    #[test]
    fn clipping_clamps_to_max() {
        let mut c = Ceiling::default();
        assert!(!c.observe(50.0, Some(80.0)));
        assert_eq!(c.value(), 50.0);
        assert!(c.observe(120.0, Some(80.0)));
        assert_eq!(c.value(), 80.0);
        // still above the clamp next time round
        assert!(c.observe(90.0, Some(80.0)));
        assert!(!c.observe(70.0, Some(80.0)));
    }

    #[test]
    fn observe_resets_release() {
        let f = Falloff::new(FalloffType::Accelerate, 1.0);
        let mut c = Ceiling::default();
        c.observe(100.0, None);
        c.decay(&f, 0.0);
        c.decay(&f, 0.0);
        assert_eq!(c.value(), 97.0);
        c.observe(98.0, None);
        c.decay(&f, 0.0);
        assert_eq!(c.value(), 97.0);
    }
}
