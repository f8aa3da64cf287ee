/*
 *  lib.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Spectral band aggregation and adaptive level engine
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
//! Turns a window of PCM samples into log spaced frequency bands with peak
//! hold, a loudness (VU) value and adaptive ceilings for display scaling.
//!
//! ```no_run
//! use lyanalysis::AudioAnalysis;
//!
//! let mut analysis = AudioAnalysis::new();
//! let window = vec![0i32; 1024];
//! analysis.compute_fft(&window, 44_100)?;
//! analysis.compute_frequencies(Some(16));
//! let bass = analysis.bass();
//! # let _ = bass;
//! # Ok::<(), lyanalysis::AnalysisError>(())
//! ```

pub mod aggregate;
pub mod analysis;
pub mod autolevel;
pub mod bands;
pub mod config;
pub mod equalizer;
pub mod error;
pub mod falloff;
pub mod normalize;
pub mod samples;
pub mod spectrum;
pub mod vu;

pub use analysis::AudioAnalysis;
pub use autolevel::AutoLevel;
pub use equalizer::EqLevels;
pub use error::{AnalysisError, Result};
pub use falloff::{Falloff, FalloffType};
pub use samples::SampleView;
pub use spectrum::{SpectrumEngine, Transform};
