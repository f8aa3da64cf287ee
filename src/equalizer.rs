/*
 *  equalizer.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per band gain curve from low / mid / high levels
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

use arrayvec::ArrayVec;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::bands::{Regions, MAX_BANDS};
use crate::error::{AnalysisError, Result};

/// Gains for the three regions. 0.5 = 50%, 1.0 = unity, 1.5 = 150%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqLevels {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for EqLevels {
    fn default() -> Self {
        Self { low: 1.0, mid: 1.0, high: 1.0 }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Two chained linear segments through three control values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f32,
    pub apex: f32,
    pub end: f32,
}

impl Segment {
    /// Curve value at `t` in 0..=1 across the region.
    #[inline]
    pub fn at(&self, t: f32) -> f32 {
        lerp(lerp(self.start, self.apex, t), lerp(self.apex, self.end, t), t)
    }
}

/// Control segments for bass, mid and treble. Each region ends on the blend
/// the next one starts from.
pub fn segments(levels: &EqLevels) -> [Segment; 3] {
    let low_mid = (levels.low + levels.mid) / 2.0;
    let mid_high = (levels.mid + levels.high) / 2.0;
    [
        Segment { start: levels.low, apex: levels.low, end: low_mid },
        Segment { start: low_mid, apex: levels.mid, end: mid_high },
        Segment { start: mid_high, apex: levels.high, end: levels.high },
    ]
}

/// Gain per band for `bands` active bands.
pub fn curve(levels: &EqLevels, bands: usize) -> ArrayVec<f32, MAX_BANDS> {
    let bands = bands.min(MAX_BANDS);
    let regions = Regions::for_bands(bands);
    let segs = segments(levels);
    let mut out: ArrayVec<f32, MAX_BANDS> = (0..bands).map(|_| 1.0).collect();
    for (range, seg) in [regions.bass, regions.mid, regions.treble].into_iter().zip(segs) {
        let size = range.len() as f32;
        for i in range.clone() {
            let t = (i - range.start) as f32 / size;
            out[i] = seg.at(t);
        }
    }
    out
}

/// Equalizer state, either curve driven or a verbatim per band table.
#[derive(Debug, Clone, PartialEq)]
pub struct Equalizer {
    levels: EqLevels,
    curve_mode: bool,
    gains: ArrayVec<f32, MAX_BANDS>,
}

impl Equalizer {
    /// Unity gain on every band, no curve selected yet.
    pub fn new(bands: usize) -> Self {
        Self {
            levels: EqLevels::default(),
            curve_mode: false,
            gains: (0..bands.min(MAX_BANDS)).map(|_| 1.0).collect(),
        }
    }

    pub fn set_levels(&mut self, levels: EqLevels, bands: usize) {
        self.levels = levels;
        self.curve_mode = true;
        self.gains = curve(&levels, bands);
    }

    /// Take `gains` verbatim. Band count changes no longer regenerate the
    /// curve until levels are set again.
    pub fn set_custom(&mut self, gains: &[f32], bands: usize) -> Result<()> {
        if gains.len() != bands || bands > MAX_BANDS {
            return Err(AnalysisError::EqualizerLength { bands, levels: gains.len() });
        }
        self.curve_mode = false;
        self.gains.clear();
        self.gains.extend(gains.iter().copied());
        Ok(())
    }

    /// Follow a band count change.
    pub fn resize(&mut self, bands: usize) {
        let bands = bands.min(MAX_BANDS);
        if self.curve_mode {
            debug!("equalizer: regenerating curve for {bands} bands");
            self.gains = curve(&self.levels, bands);
        } else {
            self.gains.truncate(bands);
            while self.gains.len() < bands {
                self.gains.push(1.0);
            }
        }
    }

    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    #[inline]
    pub fn gain(&self, band: usize) -> f32 {
        self.gains.get(band).copied().unwrap_or(1.0)
    }

    pub fn levels(&self) -> EqLevels {
        self.levels
    }

    pub fn is_curve(&self) -> bool {
        self.curve_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn unity_levels_make_a_flat_curve() {
        let c = curve(&EqLevels::default(), 64);
        assert_eq!(c.len(), 64);
        assert!(c.iter().all(|g| (g - 1.0).abs() < EPS));
    }

    #[test]
    fn continuous_across_regions() {
        let levels = EqLevels { low: 1.8, mid: 0.6, high: 1.2 };
        let [bass, mid, treble] = segments(&levels);
        assert!((bass.at(1.0) - mid.at(0.0)).abs() < EPS);
        assert!((mid.at(1.0) - treble.at(0.0)).abs() < EPS);
    }

    #[test]
    fn curve_starts_on_low_and_heads_to_high() {
        let levels = EqLevels { low: 2.0, mid: 1.0, high: 0.5 };
        let c = curve(&levels, 64);
        assert!((c[0] - 2.0).abs() < EPS);
        // first mid band starts from the low/mid blend
        assert!((c[8] - 1.5).abs() < EPS);
        // first treble band starts from the mid/high blend
        assert!((c[36] - 0.75).abs() < EPS);
        assert!((c[63] - 0.5).abs() < 0.01);
    }

    #[test]
    fn negative_gain_propagates() {
        let c = curve(&EqLevels { low: -1.0, mid: 1.0, high: 1.0 }, 16);
        assert!(c[0] < 0.0);
    }

    #[test]
    fn tiny_band_counts() {
        let c = curve(&EqLevels { low: 3.0, mid: 2.0, high: 1.0 }, 1);
        assert_eq!(c.as_slice(), &[3.0]);
        let c = curve(&EqLevels { low: 3.0, mid: 2.0, high: 1.0 }, 2);
        assert_eq!(c.len(), 2);
        assert!((c[1] - 2.5).abs() < EPS);
    }

    #[test]
    fn custom_disables_regeneration() {
        let mut eq = Equalizer::new(8);
        eq.set_levels(EqLevels { low: 2.0, mid: 1.0, high: 1.0 }, 8);
        assert!(eq.is_curve());
        eq.resize(16);
        assert_eq!(eq.gains().len(), 16);
        assert!((eq.gain(0) - 2.0).abs() < EPS);

        let custom: Vec<f32> = (0..16).map(|i| i as f32 * 0.1).collect();
        eq.set_custom(&custom, 16).unwrap();
        assert!(!eq.is_curve());
        eq.resize(32);
        assert_eq!(eq.gains()[..16], custom[..]);
        assert_eq!(eq.gain(31), 1.0);
        eq.resize(4);
        assert_eq!(eq.gains(), &custom[..4]);
    }

    #[test]
    fn custom_length_checked() {
        let mut eq = Equalizer::new(16);
        let err = eq.set_custom(&[1.0; 8], 16).unwrap_err();
        assert_eq!(err, AnalysisError::EqualizerLength { bands: 16, levels: 8 });
    }

    #[test]
    fn out_of_range_gain_is_unity() {
        let eq = Equalizer::new(4);
        assert_eq!(eq.gain(40), 1.0);
    }
}
