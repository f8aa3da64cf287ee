/*
 *  falloff.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Peak release policies and the instant-attack peak tracker
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

/// How fast a tracked peak is released once nothing refreshes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FalloffType {
    /// peak holds forever
    None,
    /// constant step per frame
    Linear,
    /// step grows by `rate` each frame
    Accelerate,
    /// step doubles each frame
    #[default]
    Exponential,
}

/// Release policy plus its base rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Falloff {
    #[serde(rename = "type")]
    pub kind: FalloffType,
    pub rate: f32,
}

impl Falloff {
    pub const fn new(kind: FalloffType, rate: f32) -> Self {
        Self { kind, rate }
    }

    pub const fn none() -> Self {
        Self { kind: FalloffType::None, rate: 0.0 }
    }

    pub fn is_none(&self) -> bool {
        self.kind == FalloffType::None
    }

    /// Next release step given the step used last frame.
    #[inline]
    pub fn next_rate(&self, current: f32) -> f32 {
        calculate_falloff(self.kind, self.rate, current)
    }
}

impl Default for Falloff {
    fn default() -> Self {
        Self::new(FalloffType::Exponential, 0.5)
    }
}

/// The release step for the next frame.
///
/// A zero `current` means the peak was just refreshed, so the exponential
/// policy restarts from `rate`. The doubled step saturates at `f32::MAX`.
#[inline]
pub fn calculate_falloff(kind: FalloffType, rate: f32, current: f32) -> f32 {
    match kind {
        FalloffType::None => 0.0,
        FalloffType::Linear => rate,
        FalloffType::Accelerate => current + rate,
        FalloffType::Exponential => {
            if current == 0.0 {
                rate
            } else {
                (current * 2.0).min(f32::MAX)
            }
        }
    }
}

/// Instant attack, policy-defined release.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakHold {
    value: f32,
    rate: f32,
}

impl PeakHold {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Release by one frame. The peak never falls below `floor`.
    pub fn fall(&mut self, falloff: &Falloff, floor: f32) {
        self.rate = falloff.next_rate(self.rate);
        if self.value - self.rate <= floor {
            self.value = floor;
        } else {
            self.value -= self.rate;
        }
    }

    /// Snap up to `value` if it beats the decayed peak. Returns true on snap.
    pub fn snap(&mut self, value: f32) -> bool {
        if value > self.value {
            self.value = value;
            self.rate = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates(kind: FalloffType, rate: f32, frames: usize) -> Vec<f32> {
        let f = Falloff::new(kind, rate);
        let mut cur = 0.0;
        (0..frames)
            .map(|_| {
                cur = f.next_rate(cur);
                cur
            })
            .collect()
    }

    #[test]
    fn policy_table() {
        assert_eq!(calculate_falloff(FalloffType::None, 0.5, 3.0), 0.0);
        assert_eq!(calculate_falloff(FalloffType::Linear, 0.5, 3.0), 0.5);
        assert_eq!(calculate_falloff(FalloffType::Accelerate, 0.5, 3.0), 3.5);
        assert_eq!(calculate_falloff(FalloffType::Exponential, 0.5, 0.0), 0.5);
        assert_eq!(calculate_falloff(FalloffType::Exponential, 0.5, 3.0), 6.0);
    }

    #[test]
    fn release_step_shapes() {
        assert!(rates(FalloffType::None, 0.3, 10).iter().all(|r| *r == 0.0));
        assert!(rates(FalloffType::Linear, 0.3, 10).iter().all(|r| *r == 0.3));
        for kind in [FalloffType::Accelerate, FalloffType::Exponential] {
            let r = rates(kind, 0.3, 20);
            assert!(r.windows(2).all(|w| w[1] >= w[0]), "{kind:?} shrank");
        }
        assert_eq!(rates(FalloffType::Exponential, 1.0, 4), vec![1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn exponential_saturates() {
        let r = rates(FalloffType::Exponential, 1.0, 400);
        assert!(r.iter().all(|x| x.is_finite()));
        assert_eq!(*r.last().unwrap(), f32::MAX);
    }

    #[test]
    fn linear_release_from_one() {
        let f = Falloff::new(FalloffType::Linear, 0.1);
        let mut p = PeakHold::default();
        p.snap(1.0);
        for _ in 0..5 {
            p.fall(&f, 0.0);
        }
        assert!((p.value() - 0.5).abs() < 1e-5);
        for _ in 0..20 {
            p.fall(&f, 0.0);
        }
        assert_eq!(p.value(), 0.0);
    }

    #[test]
    fn snap_resets_rate() {
        let f = Falloff::new(FalloffType::Accelerate, 0.1);
        let mut p = PeakHold::default();
        p.snap(10.0);
        p.fall(&f, 0.0);
        p.fall(&f, 0.0);
        assert!(p.rate() > 0.1);
        assert!(!p.snap(1.0));
        assert!(p.snap(20.0));
        assert_eq!(p.rate(), 0.0);
        assert_eq!(p.value(), 20.0);
    }

    #[test]
    fn falloff_yaml_shape() {
        let f: Falloff = serde_yaml::from_str("type: linear\nrate: 0.25\n").unwrap();
        assert_eq!(f, Falloff::new(FalloffType::Linear, 0.25));
    }
}
