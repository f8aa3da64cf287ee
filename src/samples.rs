/*
 *  samples.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw sample level tracking and the waveform trigger
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
use crate::falloff::Falloff;
use crate::normalize::Normalizer;

/// Raw sample ceiling floor is the auto-level minimum scaled by this.
pub const SAMPLE_LEVEL_SCALE: f32 = 0x4FFF as f32;

/// Running min / max of |sample| across ingestions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    max: Ceiling,
    min: Option<f32>,
}

impl SampleStats {
    pub fn ingest(&mut self, samples: &[i32], auto: &AutoLevel, falloff: &Falloff) {
        if auto.enabled {
            self.max.decay(falloff, auto.min * SAMPLE_LEVEL_SCALE);
        }
        for s in samples {
            let v = s.unsigned_abs() as f32;
            self.max.observe(v, None);
            match self.min {
                Some(m) if m <= v => {}
                _ => self.min = Some(v),
            }
        }
    }

    pub fn max(&self) -> f32 {
        self.max.value()
    }

    pub fn min(&self) -> f32 {
        self.min.unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// First index `i` where the waveform crosses from `>= 0` to `< 0` between
/// `i` and `i + 1`.
pub fn trigger_index(samples: &[i32]) -> Option<usize> {
    samples.windows(2).position(|w| w[0] >= 0 && w[1] < 0)
}

/// Read-only view over the buffer last handed to `compute_fft`, paired with
/// the level state needed to scale it.
#[derive(Debug, Clone, Copy)]
pub struct SampleView<'s> {
    samples: &'s [i32],
    stats: SampleStats,
    normalizer: Normalizer,
}

impl<'s> SampleView<'s> {
    pub(crate) fn new(samples: &'s [i32], stats: SampleStats, normalizer: Normalizer) -> Self {
        Self { samples, stats, normalizer }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn raw(&self) -> &'s [i32] {
        self.samples
    }

    /// Sample at `index`, scaled over `[-max, max]` when normalizing.
    /// Out of range reads as the output minimum.
    pub fn sample(&self, index: usize) -> f32 {
        let Some(&s) = self.samples.get(index) else {
            return if self.normalizer.enabled { self.normalizer.min } else { 0.0 };
        };
        let v = s as f32;
        if self.normalizer.enabled {
            let m = self.stats.max();
            self.normalizer.apply(v, -m, m, None)
        } else {
            v
        }
    }

    pub fn trigger_index(&self) -> Option<usize> {
        trigger_index(self.samples)
    }

    pub fn min(&self) -> f32 {
        if self.normalizer.enabled { self.normalizer.min } else { self.stats.min() }
    }

    pub fn max(&self) -> f32 {
        if self.normalizer.enabled { self.normalizer.max } else { self.stats.max() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::falloff::FalloffType;

    #[test]
    fn trigger_finds_first_downward_crossing() {
        assert_eq!(trigger_index(&[-3, -1, 2, 5, 0, -4, 3, -2]), Some(4));
        assert_eq!(trigger_index(&[1, -1]), Some(0));
    }

    #[test]
    fn trigger_none_without_crossing() {
        assert_eq!(trigger_index(&[]), None);
        assert_eq!(trigger_index(&[7]), None);
        assert_eq!(trigger_index(&[-5, -1, 0, 3, 9]), None);
    }

    #[test]
    fn stats_track_magnitudes() {
        let mut st = SampleStats::default();
        st.ingest(&[-300, 20, 150, -5], &AutoLevel::default(), &Falloff::default());
        assert_eq!(st.max(), 300.0);
        assert_eq!(st.min(), 5.0);
        st.ingest(&[i32::MIN], &AutoLevel::default(), &Falloff::default());
        assert_eq!(st.max(), 2_147_483_648.0);
    }

    #[test]
    fn auto_level_pulls_max_to_floor() {
        let auto = AutoLevel::new(Falloff::new(FalloffType::Linear, 1.0), 1.0, None);
        let fall = Falloff::new(FalloffType::Exponential, 1_000.0);
        let mut st = SampleStats::default();
        st.ingest(&[100_000], &auto, &fall);
        for _ in 0..32 {
            st.ingest(&[0], &auto, &fall);
            assert!(st.max() >= SAMPLE_LEVEL_SCALE);
        }
        assert_eq!(st.max(), SAMPLE_LEVEL_SCALE);
    }

    #[test]
    fn view_scales_symmetrically() {
        let buf = [-100, 0, 50, 100];
        let mut st = SampleStats::default();
        st.ingest(&buf, &AutoLevel::default(), &Falloff::default());

        let raw = SampleView::new(&buf, st, Normalizer::default());
        assert_eq!(raw.sample(2), 50.0);
        assert_eq!(raw.sample(9), 0.0);
        assert_eq!(raw.max(), 100.0);

        let norm = SampleView::new(&buf, st, Normalizer::new(true, -1.0, 1.0));
        assert_eq!(norm.sample(0), -1.0);
        assert_eq!(norm.sample(1), 0.0);
        assert_eq!(norm.sample(3), 1.0);
        assert_eq!(norm.sample(9), -1.0);
        assert_eq!(norm.min(), -1.0);
        assert_eq!(norm.max(), 1.0);
    }
}
