/*
 *  normalize.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Range remapping with clamp
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

/// Clamp `x` into `[in_min, in_max]` and remap it onto `[out_min, out_max]`.
///
/// A zero-width input range has no slope, `out_min` is returned.
#[inline]
pub fn map_and_clip(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span == 0.0 {
        return out_min;
    }
    let x = x.clamp(in_min.min(in_max), in_min.max(in_max));
    (x - in_min) * (out_max - out_min) / span + out_min
}

/// Output range applied by the getters when normalizing is on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { enabled: false, min: 0.0, max: 1.0 }
    }
}

impl Normalizer {
    pub fn new(enabled: bool, min: f32, max: f32) -> Self {
        debug_assert!(min != max, "normalize output range must not be empty");
        Self { enabled, min, max }
    }

    /// Remap `x` from `[in_min, in_max]`. Anything over an active hard
    /// ceiling `clip` is pulled down to it first.
    #[inline]
    pub fn apply(&self, x: f32, in_min: f32, in_max: f32, clip: Option<f32>) -> f32 {
        let x = match clip {
            Some(max) if x > max => max,
            _ => x,
        };
        map_and_clip(x, in_min, in_max, self.min, self.max)
    }

    /// Remap when enabled, pass through otherwise.
    #[inline]
    pub fn scale(&self, x: f32, in_max: f32, clip: Option<f32>) -> f32 {
        if self.enabled { self.apply(x, 0.0, in_max, clip) } else { x }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint() {
        assert_eq!(map_and_clip(5.0, 0.0, 10.0, 0.0, 1.0), 0.5);
        assert_eq!(map_and_clip(5.0, 0.0, 10.0, 0.0, 255.0), 127.5);
    }

    #[test]
    fn bounds_are_exact() {
        assert_eq!(map_and_clip(10.0, 0.0, 10.0, 0.0, 1.0), 1.0);
        assert_eq!(map_and_clip(0.0, 0.0, 10.0, 0.0, 1.0), 0.0);
        assert_eq!(map_and_clip(11.0, 0.0, 10.0, 2.0, 3.0), 3.0);
        assert_eq!(map_and_clip(-1.0, 0.0, 10.0, 2.0, 3.0), 2.0);
        assert_eq!(map_and_clip(-7.0, -4.0, 4.0, -1.0, 1.0), -1.0);
    }

    #[test]
    fn empty_range_is_out_min() {
        assert_eq!(map_and_clip(3.0, 2.0, 2.0, 0.25, 1.0), 0.25);
    }

    #[test]
    fn clip_before_clamp() {
        let n = Normalizer::new(true, 0.0, 1.0);
        // ceiling at 100 but a hard max of 50: 75 reads as 50
        assert_eq!(n.apply(75.0, 0.0, 100.0, Some(50.0)), 0.5);
        assert_eq!(n.apply(75.0, 0.0, 100.0, None), 0.75);
        // still never above out max
        assert_eq!(n.apply(500.0, 0.0, 40.0, Some(50.0)), 1.0);
    }

    #[test]
    fn disabled_passes_through() {
        let n = Normalizer::default();
        assert_eq!(n.scale(42.0, 10.0, None), 42.0);
    }
}
