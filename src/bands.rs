/*
 *  bands.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Transform bin to perceptual band mapping
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
//! Bands are log spaced: a 64 entry table of relative widths (summing to 1)
//! is folded down to the requested power-of-two band count and scaled onto
//! the usable half of the window.

use std::ops::Range;

use arrayvec::ArrayVec;

pub const MAX_BANDS: usize = 64;
pub const DEFAULT_BANDS: usize = 64;
pub const DEFAULT_WINDOW_SIZE: usize = 1024;
pub const MIN_WINDOW_SIZE: usize = 8;
/// DC and the first noisy bin are never assigned to a band
pub const RESERVED_BINS: usize = 2;

// share of the one-sided spectrum the table spans (tops out ~17kHz @ 44k1)
const BIN_COVERAGE: f32 = 0.802_032_2;

#[rustfmt::skip]
static BAND_LUT: [f32; MAX_BANDS] = [
    0.000_527_081_2, 0.000_570_409_5, 0.000_617_299_6, 0.000_668_044_3,
    0.000_722_960_5, 0.000_782_390_9, 0.000_846_706_9, 0.000_916_309_8,
    0.000_991_634_4, 0.001_073_151_1, 0.001_161_368_7, 0.001_256_838_3,
    0.001_360_155_8, 0.001_471_966_5, 0.001_592_968_5, 0.001_723_917_4,
    0.001_865_630_9, 0.002_018_993_8, 0.002_184_963_8, 0.002_364_577_3,
    0.002_558_955_7, 0.002_769_312_9, 0.002_996_962_4, 0.003_243_325_7,
    0.003_509_941_1, 0.003_798_473_4, 0.004_110_724_4, 0.004_448_643_7,
    0.004_814_341_4, 0.005_210_101_1, 0.005_638_393_9, 0.006_101_894_2,
    0.006_603_496_3, 0.007_146_332_3, 0.007_733_791_7, 0.008_369_542_8,
    0.009_057_555_3, 0.009_802_125_5, 0.010_607_902_6, 0.011_479_918_1,
    0.012_423_617_0, 0.013_444_892_0, 0.014_550_120_2, 0.015_746_203_0,
    0.017_040_608_9, 0.018_441_420_6, 0.019_957_385_1, 0.021_597_968_4,
    0.023_373_414_8, 0.025_294_810_5, 0.027_374_153_2, 0.029_624_426_9,
    0.032_059_682_8, 0.034_695_127_3, 0.037_547_216_8, 0.040_633_760_3,
    0.043_974_031_0, 0.047_588_886_4, 0.051_500_898_5, 0.055_734_495_0,
    0.060_316_111_4, 0.065_274_356_4, 0.070_640_190_6, 0.076_447_119_6,
];

#[inline]
pub fn is_supported_band_count(bands: usize) -> bool {
    bands > 0 && bands <= MAX_BANDS && bands.is_power_of_two()
}

#[inline]
pub fn is_valid_window_size(window: usize) -> bool {
    window >= MIN_WINDOW_SIZE && window.is_power_of_two()
}

/// Fractional bin width per band for a window of `window` samples.
pub fn band_widths(window: usize, bands: usize) -> ArrayVec<f32, MAX_BANDS> {
    let scale = (window as f32 / 2.0) * BIN_COVERAGE;
    let step = MAX_BANDS / bands.clamp(1, MAX_BANDS);
    BAND_LUT
        .chunks(step)
        .map(|chunk| chunk.iter().sum::<f32>() * scale)
        .collect()
}

/// Contiguous run of bins summed into one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinRange {
    pub start: usize,
    pub len: usize,
    /// contribution multiplier, the band width when it is under one bin
    pub weight: f32,
}

impl BinRange {
    pub fn bins(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Mapping of bins onto the active bands for one window size.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    window: usize,
    widths: ArrayVec<f32, MAX_BANDS>,
    ranges: ArrayVec<BinRange, MAX_BANDS>,
}

impl BandLayout {
    /// `bands` must be supported and `window` valid, callers resolve both first.
    pub fn new(window: usize, bands: usize) -> Self {
        debug_assert!(is_supported_band_count(bands));
        debug_assert!(is_valid_window_size(window));

        let widths = band_widths(window, bands);
        let limit = window / 2;
        let mut offset = RESERVED_BINS;
        let mut ranges = ArrayVec::new();
        for &w in &widths {
            // each band consumes whole bins, rounding up can run past the
            // last valid bin so clamp rather than trust the table
            let want = w.ceil() as usize;
            let start = offset.min(limit);
            let len = want.min(limit - start);
            ranges.push(BinRange {
                start,
                len,
                weight: if w < 1.0 { w } else { 1.0 },
            });
            offset += want;
        }
        Self { window, widths, ranges }
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    pub fn band_count(&self) -> usize {
        self.widths.len()
    }

    pub fn widths(&self) -> &[f32] {
        &self.widths
    }

    pub fn ranges(&self) -> &[BinRange] {
        &self.ranges
    }

    /// Bins available to bands once the reserved ones are skipped.
    pub fn usable_bins(&self) -> usize {
        (self.window / 2).saturating_sub(RESERVED_BINS)
    }

    /// Bins actually consumed by the layout.
    pub fn assigned_bins(&self) -> usize {
        self.ranges.iter().map(|r| r.len).sum()
    }
}

/// Bass / mid / treble split of the active bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regions {
    pub bass: Range<usize>,
    pub mid: Range<usize>,
    pub treble: Range<usize>,
}

impl Regions {
    /// Bass takes the first eighth (at least one band), mid and treble share
    /// what is left with mid getting the smaller half. Small band counts can
    /// leave mid or treble empty.
    pub fn for_bands(bands: usize) -> Self {
        let bass = bands.div_ceil(8).max(1);
        let mid = (bands.saturating_sub(bass) / 2).max(1);
        let treble = bands.saturating_sub(bass + mid).max(1);

        let b_end = bass.min(bands);
        let m_end = (bass + mid).min(bands);
        let t_end = (bass + mid + treble).min(bands);
        Self {
            bass: 0..b_end,
            mid: b_end..m_end,
            treble: m_end..t_end,
        }
    }

    pub fn widths(&self) -> [usize; 3] {
        [self.bass.len(), self.mid.len(), self.treble.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lut_is_a_unit_partition() {
        let s: f32 = BAND_LUT.iter().sum();
        assert!((s - 1.0).abs() < 1e-4);
        assert!(BAND_LUT.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn supported_counts() {
        for n in [1, 2, 4, 8, 16, 32, 64] {
            assert!(is_supported_band_count(n));
        }
        for n in [0, 3, 12, 48, 65, 128] {
            assert!(!is_supported_band_count(n));
        }
        assert!(is_valid_window_size(1024));
        assert!(!is_valid_window_size(4));
        assert!(!is_valid_window_size(1000));
    }

    #[test]
    fn widths_fold_the_table() {
        let w64 = band_widths(1024, 64);
        let w16 = band_widths(1024, 16);
        assert_eq!(w64.len(), 64);
        assert_eq!(w16.len(), 16);
        let s64: f32 = w64.iter().sum();
        let s16: f32 = w16.iter().sum();
        assert!((s64 - s16).abs() < 1e-2);
        assert!((w16[0] - w64[..4].iter().sum::<f32>()).abs() < 1e-4);
        // lows narrower than highs
        assert!(w16[0] < w16[15]);
    }

    #[test]
    fn first_bands_are_fractional_at_64() {
        let l = BandLayout::new(1024, 64);
        let r = l.ranges();
        assert_eq!(r[0].start, 2);
        assert_eq!(r[0].len, 1);
        assert!(r[0].weight < 1.0);
        assert_eq!(r[1].start, 3);
        // contiguous
        for w in r.windows(2) {
            assert!(w[1].start >= w[0].start + w[0].len);
        }
    }

    #[test]
    fn rounding_overrun_is_clamped() {
        // 64 bands over a 256 window asks for more bins than exist
        let l = BandLayout::new(256, 64);
        assert!(l.assigned_bins() <= l.usable_bins());
        assert!(l.ranges().iter().all(|r| r.bins().end <= 128));
        assert_eq!(l.ranges().last().unwrap().len, 0);
    }

    #[test]
    fn regions_for_common_counts() {
        let r = Regions::for_bands(64);
        assert_eq!(r.widths(), [8, 28, 28]);
        assert_eq!(r.treble.end, 64);

        let r = Regions::for_bands(16);
        assert_eq!(r.widths(), [2, 7, 7]);

        let r = Regions::for_bands(4);
        assert_eq!(r.bass, 0..1);
        assert_eq!(r.mid, 1..2);
        assert_eq!(r.treble, 2..4);

        let r = Regions::for_bands(1);
        assert_eq!(r.bass, 0..1);
        assert!(r.mid.is_empty());
        assert!(r.treble.is_empty());
    }
}
