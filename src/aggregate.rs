/*
 *  aggregate.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Spectrum bins summed into bands
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

use crate::bands::{BandLayout, MAX_BANDS};
use crate::equalizer::Equalizer;

/// Scale down applied to raw bin values, sized for 32 bit I2S input.
pub const ATTENUATION: f32 = (0xFFFF * 0xFF) as f32;

/// Sum the bins of each band into `out`, one value per band, applying the
/// equalizer gain and fractional width. Bands under `noise_floor` read zero.
///
/// Returns the total contribution across all bands before the noise floor,
/// which feeds the VU meter.
pub fn aggregate_bands(
    real: &[f32],
    imag: &[f32],
    layout: &BandLayout,
    eq: &Equalizer,
    noise_floor: f32,
    out: &mut ArrayVec<f32, MAX_BANDS>,
) -> f32 {
    out.clear();
    let mut total = 0.0;
    for (band, range) in layout.ranges().iter().enumerate() {
        let gain = eq.gain(band) * range.weight;
        let mut acc = 0.0f32;
        for k in range.bins() {
            let (Some(&re), Some(&im)) = (real.get(k), imag.get(k)) else {
                break;
            };
            let r = re / ATTENUATION;
            let i = im / ATTENUATION;
            acc += (r * r + i * i).sqrt() * gain;
        }
        total += acc;
        out.push(if acc < noise_floor { 0.0 } else { acc });
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equalizer::EqLevels;

    fn spectrum(n: usize, bins: &[(usize, f32)]) -> (Vec<f32>, Vec<f32>) {
        let mut re = vec![0.0; n];
        for &(k, v) in bins {
            re[k] = v * ATTENUATION;
        }
        (re, vec![0.0; n])
    }

    #[test]
    fn reserved_bins_ignored() {
        let layout = BandLayout::new(1024, 64);
        let eq = Equalizer::new(64);
        let (re, im) = spectrum(1024, &[(0, 1e6), (1, 1e6)]);
        let mut out = ArrayVec::new();
        let total = aggregate_bands(&re, &im, &layout, &eq, 0.0, &mut out);
        assert_eq!(total, 0.0);
        assert!(out.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn fractional_band_scaled_by_width() {
        let layout = BandLayout::new(1024, 64);
        let eq = Equalizer::new(64);
        let (re, im) = spectrum(1024, &[(2, 100.0)]);
        let mut out = ArrayVec::new();
        aggregate_bands(&re, &im, &layout, &eq, 0.0, &mut out);
        let w0 = layout.widths()[0];
        assert!((out[0] - 100.0 * w0).abs() < 1e-3);
    }

    #[test]
    fn real_and_imag_combine() {
        let layout = BandLayout::new(64, 1);
        let eq = Equalizer::new(1);
        let mut re = vec![0.0; 64];
        let mut im = vec![0.0; 64];
        re[2] = 3.0 * ATTENUATION;
        im[2] = 4.0 * ATTENUATION;
        let mut out = ArrayVec::new();
        let total = aggregate_bands(&re, &im, &layout, &eq, 0.0, &mut out);
        assert!((out[0] - 5.0).abs() < 1e-4);
        assert_eq!(total, out[0]);
    }

    #[test]
    fn gain_and_noise_floor() {
        let layout = BandLayout::new(64, 1);
        let mut eq = Equalizer::new(1);
        eq.set_levels(EqLevels { low: 2.0, mid: 1.0, high: 1.0 }, 1);
        let (re, im) = spectrum(64, &[(2, 1.0), (3, 1.0)]);
        let mut out = ArrayVec::new();
        let total = aggregate_bands(&re, &im, &layout, &eq, 0.0, &mut out);
        assert!((out[0] - 4.0).abs() < 1e-4);

        // floor zeroes the band but the VU still sees it
        let total_floored = aggregate_bands(&re, &im, &layout, &eq, 10.0, &mut out);
        assert_eq!(out[0], 0.0);
        assert_eq!(total, total_floored);
    }

    #[test]
    fn short_spectrum_does_not_panic() {
        let layout = BandLayout::new(1024, 16);
        let eq = Equalizer::new(16);
        let (re, im) = spectrum(16, &[(3, 1.0)]);
        let mut out = ArrayVec::new();
        aggregate_bands(&re, &im, &layout, &eq, 0.0, &mut out);
        assert_eq!(out.len(), 16);
    }
}
