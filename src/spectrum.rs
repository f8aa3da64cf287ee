/*
 *  spectrum.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Spectrum buffers and the forward transform behind them
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

use std::sync::Arc;

use log::debug;
use rustfft::num_complex::Complex;

use crate::error::{AnalysisError, Result};

/// Forward transform consumed by the analyzer.
///
/// On entry `real` holds the time domain window and `imag` is zeroed. On exit
/// `real` holds bin magnitudes and `imag` the imaginary component.
pub trait Transform: Send {
    fn window_size(&self) -> usize;
    fn sample_rate(&self) -> u32;
    fn forward(&mut self, real: &mut [f32], imag: &mut [f32]);
}

/// Builds a transform for (window size, sample rate).
pub type TransformFactory = fn(usize, u32) -> Box<dyn Transform>;

/// DC removal, Hamming window and a rustfft forward pass.
pub struct SpectrumEngine {
    sr: u32,
    nfft: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumEngine {
    pub fn new(nfft: usize, sr: u32) -> Self {
        let mut planner = rustfft::FftPlanner::<f32>::new();
        let fft: Arc<dyn rustfft::Fft<f32>> = planner.plan_fft_forward(nfft);

        // Hamming, symmetric
        let denom = (nfft.max(2) - 1) as f32;
        let window = (0..nfft)
            .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * (i as f32) / denom).cos())
            .collect::<Vec<_>>();

        let buf = vec![Complex::new(0.0, 0.0); nfft];
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        debug!("spectrum: planned {nfft} point fft @ {sr}Hz");
        Self { sr, nfft, fft, window, buf, scratch }
    }

    /// Default `TransformFactory`.
    pub fn boxed(nfft: usize, sr: u32) -> Box<dyn Transform> {
        Box::new(Self::new(nfft, sr))
    }
}

impl Transform for SpectrumEngine {
    fn window_size(&self) -> usize {
        self.nfft
    }

    fn sample_rate(&self) -> u32 {
        self.sr
    }

    fn forward(&mut self, real: &mut [f32], imag: &mut [f32]) {
        let n = self.nfft.min(real.len()).min(imag.len());
        if n == 0 {
            return;
        }

        let mean = real[..n].iter().map(|&s| s as f64).sum::<f64>() / n as f64;
        for i in 0..self.nfft {
            let s = if i < n { real[i] - mean as f32 } else { 0.0 };
            self.buf[i] = Complex::new(s * self.window[i], 0.0);
        }

        self.fft.process_with_scratch(&mut self.buf, &mut self.scratch);

        for i in 0..n {
            let c = self.buf[i];
            real[i] = c.norm();
            imag[i] = c.im;
        }
    }
}

/// Magnitude / imaginary pair, one entry per window sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    real: Vec<f32>,
    imag: Vec<f32>,
}

impl Spectrum {
    pub fn new(len: usize) -> Self {
        Self { real: vec![0.0; len], imag: vec![0.0; len] }
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn real(&self) -> &[f32] {
        &self.real
    }

    pub fn imag(&self) -> &[f32] {
        &self.imag
    }

    /// Prime for a forward pass: samples in `real`, zeroes in `imag`.
    pub fn load_samples(&mut self, samples: &[i32]) {
        self.real.clear();
        self.real.extend(samples.iter().map(|&s| s as f32));
        self.imag.clear();
        self.imag.resize(samples.len(), 0.0);
    }

    /// Copy in a spectrum computed elsewhere. Both halves must be `len()` long.
    pub fn copy_from(&mut self, real: &[f32], imag: &[f32]) -> Result<()> {
        if real.len() != self.len() || imag.len() != self.len() {
            return Err(AnalysisError::SpectrumLength {
                expected: self.len(),
                real: real.len(),
                imag: imag.len(),
            });
        }
        self.real.copy_from_slice(real);
        self.imag.copy_from_slice(imag);
        Ok(())
    }

    pub fn transform(&mut self, t: &mut dyn Transform) {
        t.forward(&mut self.real, &mut self.imag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(n: usize, bin: usize, amp: f32) -> Vec<i32> {
        (0..n)
            .map(|i| {
                let ph = 2.0 * std::f32::consts::PI * (bin as f32) * (i as f32) / (n as f32);
                (amp * ph.sin()) as i32
            })
            .collect()
    }

    #[test]
    fn tone_lands_in_its_bin() {
        let n = 1024;
        let mut eng = SpectrumEngine::new(n, 44_100);
        let mut s = Spectrum::new(n);
        s.load_samples(&tone(n, 40, 1.0e6));
        s.transform(&mut eng);

        let half = &s.real()[..n / 2];
        let (peak_bin, _) = half
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &m)| if m > acc.1 { (i, m) } else { acc });
        assert_eq!(peak_bin, 40);
    }

    #[test]
    fn dc_is_removed() {
        let n = 256;
        let mut eng = SpectrumEngine::new(n, 48_000);
        let mut s = Spectrum::new(n);
        s.load_samples(&vec![5_000; n]);
        s.transform(&mut eng);
        assert!(s.real()[0] < 1e-2);
    }

    #[test]
    fn copy_from_checks_length() {
        let mut s = Spectrum::new(8);
        assert!(s.copy_from(&[0.0; 8], &[0.0; 8]).is_ok());
        let e = s.copy_from(&[0.0; 8], &[0.0; 4]).unwrap_err();
        assert_eq!(e, AnalysisError::SpectrumLength { expected: 8, real: 8, imag: 4 });
    }

    #[test]
    fn engine_reports_its_key() {
        let t = SpectrumEngine::boxed(512, 22_050);
        assert_eq!(t.window_size(), 512);
        assert_eq!(t.sample_rate(), 22_050);
    }
}
