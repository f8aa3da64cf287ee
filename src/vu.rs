/*
 *  vu.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Aggregate loudness across all bands
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

use crate::autolevel::{AutoLevel, Ceiling};
use crate::falloff::{Falloff, PeakHold};

/// Brings the summed band energy near individual band peak values.
pub const VU_DIVISOR: f32 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VuMeter {
    value: f32,
    peak: PeakHold,
    min: Option<f32>,
    max: f32,
    peak_min: Option<f32>,
    ceiling: Ceiling,
}

impl VuMeter {
    /// Release the auto-level ceiling by one frame.
    pub fn decay_ceiling(&mut self, auto: &AutoLevel) {
        if auto.enabled {
            self.ceiling.decay(&auto.falloff, auto.min);
        }
    }

    /// Feed one frame's summed band contributions. Returns true if the peak
    /// hit the auto-level hard ceiling.
    pub fn update(&mut self, total: f32, falloff: &Falloff, auto: &AutoLevel) -> bool {
        self.value = total / VU_DIVISOR;

        self.peak.fall(falloff, 0.0);
        self.peak.snap(self.value);

        self.max = self.max.max(self.value);
        self.min = Some(self.min.map_or(self.value, |m| m.min(self.value)));

        let clipping = self.ceiling.observe(self.peak.value(), auto.clip_limit());
        self.peak_min = Some(self.peak_min.map_or(self.peak.value(), |m| m.min(self.peak.value())));
        clipping
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn peak(&self) -> f32 {
        self.peak.value()
    }

    /// Highest value seen since the meter was created.
    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn min(&self) -> f32 {
        self.min.unwrap_or(0.0)
    }

    pub fn peak_min(&self) -> f32 {
        self.peak_min.unwrap_or(0.0)
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling.value()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
