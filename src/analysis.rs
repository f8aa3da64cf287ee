/*
 *  analysis.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Band, peak and loudness analysis over one transform window
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
//! The analyzer is driven in a fixed order each period:
//!
//! 1. [`AudioAnalysis::compute_fft`] with the raw window
//! 2. [`AudioAnalysis::compute_frequencies`] to fold bins into bands
//! 3. any of the getters, as often as needed until the next window
//!
//! Getters return raw values, or values scaled into the normalize range
//! against the running auto-level ceilings when normalizing is on.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use arrayvec::ArrayVec;
use log::{debug, trace, warn};

use crate::aggregate::aggregate_bands;
use crate::autolevel::{AutoLevel, Ceiling};
use crate::bands::{
    is_supported_band_count, is_valid_window_size, BandLayout, Regions, DEFAULT_BANDS,
    DEFAULT_WINDOW_SIZE, MAX_BANDS,
};
use crate::equalizer::{EqLevels, Equalizer};
use crate::error::{AnalysisError, Result};
use crate::falloff::{Falloff, FalloffType, PeakHold};
use crate::normalize::Normalizer;
use crate::samples::{SampleStats, SampleView};
use crate::spectrum::{Spectrum, SpectrumEngine, Transform, TransformFactory};
use crate::vu::VuMeter;

pub struct AudioAnalysis {
    // transform
    factory: TransformFactory,
    transform: Option<Box<dyn Transform>>,
    spectrum: Spectrum,

    // settings
    noise_floor: f32,
    normalizer: Normalizer,
    auto_level: AutoLevel,
    band_peak_falloff: Falloff,
    vu_peak_falloff: Falloff,
    sample_falloff: Falloff,
    default_band_size: usize,
    // (requested, default in effect) for the last set_band_size call
    last_band_request: Option<(usize, usize)>,

    // band layout
    layout: BandLayout,
    equalizer: Equalizer,

    // per band state, active length == band count
    bands: ArrayVec<f32, MAX_BANDS>,
    peaks: ArrayVec<PeakHold, MAX_BANDS>,

    band_avg: f32,
    peak_avg: f32,
    band_max_index: Option<usize>,
    band_min_index: Option<usize>,
    peak_max_index: Option<usize>,
    peak_min_index: Option<usize>,
    band_ceiling: Ceiling,
    clipping: bool,

    vu: VuMeter,
    samples: SampleStats,
}

impl Default for AudioAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AudioAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioAnalysis")
            .field("window", &self.layout.window_size())
            .field("bands", &self.layout.band_count())
            .field("normalizer", &self.normalizer)
            .field("auto_level", &self.auto_level)
            .field("clipping", &self.clipping)
            .finish_non_exhaustive()
    }
}

impl AudioAnalysis {
    pub fn new() -> Self {
        Self::with_transform(SpectrumEngine::boxed)
    }

    /// Analyzer whose transform is built by `factory` whenever the window
    /// size or sample rate changes.
    pub fn with_transform(factory: TransformFactory) -> Self {
        let layout = BandLayout::new(DEFAULT_WINDOW_SIZE, DEFAULT_BANDS);
        let mut peaks = ArrayVec::new();
        let mut bands = ArrayVec::new();
        for _ in 0..DEFAULT_BANDS {
            peaks.push(PeakHold::default());
            bands.push(0.0);
        }
        Self {
            factory,
            transform: None,
            spectrum: Spectrum::new(DEFAULT_WINDOW_SIZE),
            noise_floor: 0.0,
            normalizer: Normalizer::default(),
            auto_level: AutoLevel::default(),
            band_peak_falloff: Falloff::new(FalloffType::Exponential, 0.5),
            vu_peak_falloff: Falloff::new(FalloffType::Exponential, 0.5),
            sample_falloff: Falloff::new(FalloffType::Exponential, 0.001),
            default_band_size: DEFAULT_BANDS,
            last_band_request: None,
            layout,
            equalizer: Equalizer::new(DEFAULT_BANDS),
            bands,
            peaks,
            band_avg: 0.0,
            peak_avg: 0.0,
            band_max_index: None,
            band_min_index: None,
            peak_max_index: None,
            peak_min_index: None,
            band_ceiling: Ceiling::default(),
            clipping: false,
            vu: VuMeter::default(),
            samples: SampleStats::default(),
        }
    }

    /* --- transform --- */

    /// Run the forward transform over `samples`, one full window. The window
    /// length must be a power of two.
    pub fn compute_fft(&mut self, samples: &[i32], sample_rate: u32) -> Result<()> {
        let window = samples.len();
        if !is_valid_window_size(window) {
            return Err(AnalysisError::InvalidWindowSize(window));
        }
        self.ensure_transform(window, sample_rate);

        self.samples.ingest(samples, &self.auto_level, &self.sample_falloff);
        self.spectrum.load_samples(samples);
        if let Some(t) = self.transform.as_deref_mut() {
            self.spectrum.transform(t);
        }
        Ok(())
    }

    /// Load a spectrum computed elsewhere in place of `compute_fft`.
    pub fn set_spectrum(&mut self, real: &[f32], imag: &[f32]) -> Result<()> {
        if real.len() != imag.len() {
            warn!("analysis: spectrum halves differ, real={} imag={}", real.len(), imag.len());
            return Err(AnalysisError::SpectrumLength {
                expected: real.len(),
                real: real.len(),
                imag: imag.len(),
            });
        }
        if !is_valid_window_size(real.len()) {
            return Err(AnalysisError::InvalidWindowSize(real.len()));
        }
        if self.spectrum.len() != real.len() {
            self.spectrum = Spectrum::new(real.len());
            self.relayout(real.len(), self.layout.band_count());
        }
        self.spectrum.copy_from(real, imag)
    }

    fn ensure_transform(&mut self, window: usize, sample_rate: u32) {
        let stale = self
            .transform
            .as_ref()
            .map_or(true, |t| t.window_size() != window || t.sample_rate() != sample_rate);
        if stale {
            debug!("analysis: building transform for {window} samples @ {sample_rate}Hz");
            self.transform = Some((self.factory)(window, sample_rate));
        }
        if self.layout.window_size() != window {
            self.relayout(window, self.layout.band_count());
        }
    }

    pub fn real(&self) -> &[f32] {
        self.spectrum.real()
    }

    pub fn imaginary(&self) -> &[f32] {
        self.spectrum.imag()
    }

    /* --- configuration --- */

    /// Bands under this raw value read as zero.
    pub fn set_noise_floor(&mut self, noise_floor: f32) {
        self.noise_floor = noise_floor;
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    /// Scale getter output into `min..=max`. The bounds must differ.
    pub fn normalize(&mut self, enabled: bool, min: f32, max: f32) {
        self.normalizer = Normalizer::new(enabled, min, max);
    }

    /// Track decaying ceilings for normalization. `min` and `max` are raw
    /// values, `max == None` never clips. A `None` falloff turns it off.
    pub fn auto_level(&mut self, falloff: Falloff, min: f32, max: Option<f32>) {
        self.auto_level = AutoLevel::new(falloff, min, max);
    }

    pub fn set_auto_level(&mut self, auto: AutoLevel) {
        self.auto_level = auto;
    }

    pub fn band_peak_falloff(&mut self, falloff: Falloff) {
        self.band_peak_falloff = falloff;
    }

    pub fn vu_peak_falloff(&mut self, falloff: Falloff) {
        self.vu_peak_falloff = falloff;
    }

    pub fn samples_falloff(&mut self, falloff: Falloff) {
        self.sample_falloff = falloff;
    }

    pub fn set_equalizer_levels(&mut self, low: f32, mid: f32, high: f32) {
        let bands = self.band_size();
        self.equalizer.set_levels(EqLevels { low, mid, high }, bands);
    }

    /// One gain per active band, taken verbatim.
    pub fn set_equalizer_bands(&mut self, gains: &[f32]) -> Result<()> {
        let bands = self.band_size();
        self.equalizer.set_custom(gains, bands)
    }

    pub fn equalizer_levels(&self) -> &[f32] {
        self.equalizer.gains()
    }

    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    /// Band count used when a requested one is not supported.
    pub fn set_default_band_size(&mut self, band_size: usize) {
        if is_supported_band_count(band_size) {
            self.default_band_size = band_size;
        } else {
            warn!("analysis: ignoring unsupported default band size {band_size}");
        }
    }

    /// Switch band count. Unsupported counts fall back to the default band
    /// size. Repeating the last request under the same default is a no-op.
    pub fn set_band_size(&mut self, band_size: usize) {
        let request = (band_size, self.default_band_size);
        if self.last_band_request == Some(request) {
            return;
        }
        self.last_band_request = Some(request);

        let resolved = if is_supported_band_count(band_size) {
            band_size
        } else {
            warn!(
                "analysis: unsupported band size {band_size}, using {}",
                self.default_band_size
            );
            self.default_band_size
        };
        if resolved != self.layout.band_count() {
            self.relayout(self.layout.window_size(), resolved);
        }
    }

    fn relayout(&mut self, window: usize, bands: usize) {
        debug!("analysis: band layout {bands} bands over {window} samples");
        self.layout = BandLayout::new(window, bands);
        self.bands.truncate(bands);
        self.peaks.truncate(bands);
        while self.bands.len() < bands {
            self.bands.push(0.0);
            self.peaks.push(PeakHold::default());
        }
        self.equalizer.resize(bands);
    }

    pub fn band_size(&self) -> usize {
        self.layout.band_count()
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn is_normalize(&self) -> bool {
        self.normalizer.enabled
    }

    /// Output range of the normalized getters, `(min, max)`.
    pub fn normalize_range(&self) -> (f32, f32) {
        (self.normalizer.min, self.normalizer.max)
    }

    pub fn is_auto_level(&self) -> bool {
        self.auto_level.enabled
    }

    /// True when the last `compute_frequencies` hit the auto-level hard ceiling.
    pub fn is_clipping(&self) -> bool {
        self.clipping
    }

    /* --- analysis --- */

    /// Fold the current spectrum into bands, update peaks, VU and ceilings.
    /// `Some(n)` switches band count first (see [`Self::set_band_size`]).
    pub fn compute_frequencies(&mut self, band_size: Option<usize>) {
        if let Some(n) = band_size {
            self.set_band_size(n);
        }
        self.clipping = false;

        if self.auto_level.enabled {
            self.band_ceiling.decay(&self.auto_level.falloff, self.auto_level.min);
        }
        self.vu.decay_ceiling(&self.auto_level);

        let total = aggregate_bands(
            self.spectrum.real(),
            self.spectrum.imag(),
            &self.layout,
            &self.equalizer,
            self.noise_floor,
            &mut self.bands,
        );

        let clip = self.auto_level.clip_limit();
        let floor = self.noise_floor;
        let mut band_max = 0.0f32;
        let mut band_min = f32::MAX;
        let mut peak_max = 0.0f32;
        let mut peak_min = f32::MAX;
        let mut band_sum = 0.0f32;
        let mut peak_sum = 0.0f32;
        self.band_max_index = None;
        self.band_min_index = None;
        self.peak_max_index = None;
        self.peak_min_index = None;

        for (i, (&band, peak)) in self.bands.iter().zip(self.peaks.iter_mut()).enumerate() {
            peak.fall(&self.band_peak_falloff, 0.0);
            peak.snap(band);
            let p = peak.value();

            if band > band_max && band > floor {
                band_max = band;
                self.band_max_index = Some(i);
            }
            if band < band_min {
                band_min = band;
                self.band_min_index = Some(i);
            }
            if p > peak_max && p > floor {
                peak_max = p;
                self.peak_max_index = Some(i);
            }
            if p < peak_min && p > floor {
                peak_min = p;
                self.peak_min_index = Some(i);
            }
            if self.band_ceiling.observe(p, clip) {
                self.clipping = true;
            }

            band_sum += band;
            peak_sum += p;
        }

        let n = self.bands.len().max(1) as f32;
        self.band_avg = band_sum / n;
        self.peak_avg = peak_sum / n;

        if self.vu.update(total, &self.vu_peak_falloff, &self.auto_level) {
            self.clipping = true;
        }

        trace!(
            "analysis: max band {:?} vu {:.3} ceiling {:.3} clipping {}",
            self.band_max_index,
            self.vu.value(),
            self.band_ceiling.value(),
            self.clipping
        );
    }

    /* --- bands --- */

    #[inline]
    fn scale_band(&self, x: f32) -> f32 {
        self.normalizer.scale(x, self.band_ceiling.value(), self.auto_level.clip_limit())
    }

    #[inline]
    fn scale_vu(&self, x: f32) -> f32 {
        self.normalizer.scale(x, self.vu.ceiling(), self.auto_level.clip_limit())
    }

    fn scaled<'a>(&self, raw: &'a [f32]) -> Cow<'a, [f32]> {
        if self.normalizer.enabled {
            Cow::Owned(raw.iter().map(|&x| self.scale_band(x)).collect())
        } else {
            Cow::Borrowed(raw)
        }
    }

    /// All band values from the last frame.
    pub fn bands(&self) -> Cow<'_, [f32]> {
        self.scaled(&self.bands)
    }

    /// Band value, 0 for an index past the active bands.
    pub fn band(&self, index: usize) -> f32 {
        self.bands.get(index).map_or(0.0, |&b| self.scale_band(b))
    }

    pub fn band_avg(&self) -> f32 {
        self.scale_band(self.band_avg)
    }

    pub fn band_max(&self) -> f32 {
        self.band_max_index.map_or(0.0, |i| self.band(i))
    }

    /// Loudest band above the noise floor, first one wins a tie.
    pub fn band_max_index(&self) -> Option<usize> {
        self.band_max_index
    }

    pub fn band_min(&self) -> f32 {
        self.band_min_index.map_or(0.0, |i| self.band(i))
    }

    pub fn band_min_index(&self) -> Option<usize> {
        self.band_min_index
    }

    /* --- peaks --- */

    pub fn peaks(&self) -> Cow<'_, [f32]> {
        let raw: ArrayVec<f32, MAX_BANDS> = self.peaks.iter().map(PeakHold::value).collect();
        Cow::Owned(self.scaled(&raw).into_owned())
    }

    pub fn peak(&self, index: usize) -> f32 {
        self.peaks.get(index).map_or(0.0, |p| self.scale_band(p.value()))
    }

    pub fn peak_avg(&self) -> f32 {
        self.scale_band(self.peak_avg)
    }

    pub fn peak_max(&self) -> f32 {
        self.peak_max_index.map_or(0.0, |i| self.peak(i))
    }

    pub fn peak_max_index(&self) -> Option<usize> {
        self.peak_max_index
    }

    pub fn peak_min(&self) -> f32 {
        self.peak_min_index.map_or(0.0, |i| self.peak(i))
    }

    pub fn peak_min_index(&self) -> Option<usize> {
        self.peak_min_index
    }

    /// Running ceiling used to normalize bands and peaks.
    pub fn band_ceiling(&self) -> f32 {
        self.band_ceiling.value()
    }

    /* --- bass / mid / treble --- */

    pub fn regions(&self) -> Regions {
        Regions::for_bands(self.band_size())
    }

    pub fn bass(&self) -> f32 {
        let r = self.regions();
        region_max(&self.bands(), &[r.bass])
    }

    pub fn mid(&self) -> f32 {
        let r = self.regions();
        region_max(&self.bands(), &[r.mid, r.bass])
    }

    pub fn treble(&self) -> f32 {
        let r = self.regions();
        region_max(&self.bands(), &[r.treble, r.mid, r.bass])
    }

    pub fn bass_peak(&self) -> f32 {
        let r = self.regions();
        region_max(&self.peaks(), &[r.bass])
    }

    pub fn mid_peak(&self) -> f32 {
        let r = self.regions();
        region_max(&self.peaks(), &[r.mid, r.bass])
    }

    pub fn treble_peak(&self) -> f32 {
        let r = self.regions();
        region_max(&self.peaks(), &[r.treble, r.mid, r.bass])
    }

    /* --- volume unit --- */

    pub fn volume_unit(&self) -> f32 {
        self.scale_vu(self.vu.value())
    }

    pub fn volume_unit_peak(&self) -> f32 {
        self.scale_vu(self.vu.peak())
    }

    /// Highest VU value seen so far.
    pub fn volume_unit_max(&self) -> f32 {
        self.scale_vu(self.vu.max())
    }

    pub fn volume_unit_min(&self) -> f32 {
        self.scale_vu(self.vu.min())
    }

    /// Lowest VU peak seen so far.
    pub fn volume_unit_peak_min(&self) -> f32 {
        self.scale_vu(self.vu.peak_min())
    }

    /// VU auto-level ceiling, or the top of the normalize range.
    pub fn volume_unit_peak_max(&self) -> f32 {
        if self.normalizer.enabled { self.normalizer.max } else { self.vu.ceiling() }
    }

    /* --- samples --- */

    /// Sample queries over `samples`, which should be the buffer last passed
    /// to `compute_fft`.
    pub fn samples<'s>(&self, samples: &'s [i32]) -> SampleView<'s> {
        debug_assert_eq!(
            samples.len(),
            self.layout.window_size(),
            "sample view over a buffer other than the analysed window"
        );
        SampleView::new(samples, self.samples, self.normalizer)
    }

    pub fn sample_min(&self) -> f32 {
        if self.normalizer.enabled { self.normalizer.min } else { self.samples.min() }
    }

    pub fn sample_max(&self) -> f32 {
        if self.normalizer.enabled { self.normalizer.max } else { self.samples.max() }
    }

    /// Drop all frame state, settings are kept.
    pub fn reset(&mut self) {
        self.bands.iter_mut().for_each(|b| *b = 0.0);
        self.peaks.iter_mut().for_each(PeakHold::reset);
        self.band_avg = 0.0;
        self.peak_avg = 0.0;
        self.band_max_index = None;
        self.band_min_index = None;
        self.peak_max_index = None;
        self.peak_min_index = None;
        self.band_ceiling.reset();
        self.clipping = false;
        self.vu.reset();
        self.samples.reset();
    }
}

/// Max over the first non-empty range, 0 if all are empty.
fn region_max(values: &[f32], ranges: &[Range<usize>]) -> f32 {
    ranges
        .iter()
        .find_map(|r| values.get(r.clone())?.iter().copied().reduce(f32::max))
        .unwrap_or(0.0)
}
