/*
 *  error.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the analysis engine
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

use thiserror::Error;

/// Errors raised at the engine boundary. Frame computation itself never fails,
/// these only guard the buffers and tables handed in by a caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Real and imaginary halves of a spectrum must match the window.
    #[error("spectrum length mismatch: expected {expected} bins, got real={real} imag={imag}")]
    SpectrumLength {
        expected: usize,
        real: usize,
        imag: usize,
    },

    /// Window sizes are powers of two with room for the reserved bins.
    #[error("invalid window size {0} (must be a power of two >= {min})", min = crate::bands::MIN_WINDOW_SIZE)]
    InvalidWindowSize(usize),

    /// A custom equalizer needs exactly one gain per active band.
    #[error("equalizer length mismatch: {bands} bands, got {levels} levels")]
    EqualizerLength { bands: usize, levels: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_numbers() {
        let e = AnalysisError::SpectrumLength { expected: 1024, real: 512, imag: 1024 };
        let s = e.to_string();
        assert!(s.contains("1024"));
        assert!(s.contains("real=512"));

        let e = AnalysisError::InvalidWindowSize(100);
        assert!(e.to_string().contains("100"));
    }
}
