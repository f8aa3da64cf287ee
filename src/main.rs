/*
 *  main.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Command line front end: PCM in, band reports out
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

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;

use lyanalysis::config::{self, Cli, Config};
use lyanalysis::AudioAnalysis;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

// frames synthesized when no limit is given
const TONE_FRAMES: usize = 32;
const TONE_AMPLITUDE: f32 = 1.0e8;
const NOISE_AMPLITUDE: i32 = 2_000_000;
const BARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Where windows come from.
enum Source {
    Pcm(Box<dyn Read>),
    Tone { hz: f32, noise: bool, phase: u64 },
}

impl Source {
    fn open(cli: &Cli) -> Result<Self> {
        if let Some(hz) = cli.tone {
            return Ok(Self::Tone { hz, noise: cli.noise, phase: 0 });
        }
        let reader: Box<dyn Read> = match cli.input.as_deref() {
            None => Box::new(io::stdin().lock()),
            Some(p) if p.as_os_str() == "-" => Box::new(io::stdin().lock()),
            Some(p) => Box::new(
                File::open(p).with_context(|| format!("opening {}", p.display()))?,
            ),
        };
        Ok(Self::Pcm(reader))
    }

    /// Fill `window`, false once the input is exhausted.
    fn next_window(&mut self, window: &mut [i32], sample_rate: u32) -> Result<bool> {
        match self {
            Self::Pcm(reader) => {
                let mut bytes = vec![0u8; window.len() * 4];
                match reader.read_exact(&mut bytes) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(false),
                    Err(e) => return Err(e).context("reading PCM input"),
                }
                for (s, b) in window.iter_mut().zip(bytes.chunks_exact(4)) {
                    *s = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                }
                Ok(true)
            }
            Self::Tone { hz, noise, phase } => {
                let mut rng = rand::rng();
                let step = std::f32::consts::TAU * *hz / sample_rate as f32;
                for s in window.iter_mut() {
                    let t = (*phase % sample_rate as u64) as f32;
                    let mut v = (TONE_AMPLITUDE * (step * t).sin()) as i32;
                    if *noise {
                        v = v.saturating_add(rng.random_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE));
                    }
                    *s = v;
                    *phase += 1;
                }
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameReport<'a> {
    frame: usize,
    bands: &'a [f32],
    peaks: &'a [f32],
    bass: f32,
    mid: f32,
    treble: f32,
    vu: f32,
    vu_peak: f32,
    band_max_index: Option<usize>,
    clipping: bool,
    trigger: Option<usize>,
}

/// One bar per value, scaled over `bottom..=top`.
fn histogram(values: &[f32], bottom: f32, top: f32) -> String {
    let last = (BARS.len() - 1) as f32;
    let span = top - bottom;
    values
        .iter()
        .map(|v| {
            let level = if span == 0.0 { 0.0 } else { ((v - bottom) / span).clamp(0.0, 1.0) };
            BARS[(level * last).round() as usize]
        })
        .collect()
}

fn run(cli: &Cli, cfg: &Config) -> Result<()> {
    let window_size = cfg.window();
    let sample_rate = cfg.sample_rate();

    let mut analysis = AudioAnalysis::new();
    cfg.apply(&mut analysis).context("applying configuration")?;
    debug!("{analysis:?}");

    let mut source = Source::open(cli)?;
    let limit = cli.frames.or(cli.tone.map(|_| TONE_FRAMES));
    let mut window = vec![0i32; window_size];
    let mut out = BufWriter::new(io::stdout().lock());

    let mut frame = 0usize;
    while limit.is_none_or(|n| frame < n) {
        if !source.next_window(&mut window, sample_rate)? {
            break;
        }
        analysis.compute_fft(&window, sample_rate)?;
        analysis.compute_frequencies(None);

        let bands = analysis.bands();
        let peaks = analysis.peaks();
        if cli.json {
            let report = FrameReport {
                frame,
                bands: &bands,
                peaks: &peaks,
                bass: analysis.bass(),
                mid: analysis.mid(),
                treble: analysis.treble(),
                vu: analysis.volume_unit(),
                vu_peak: analysis.volume_unit_peak(),
                band_max_index: analysis.band_max_index(),
                clipping: analysis.is_clipping(),
                trigger: analysis.samples(&window).trigger_index(),
            };
            serde_json::to_writer(&mut out, &report)?;
            writeln!(out)?;
        } else {
            let (bottom, top) = if analysis.is_normalize() {
                analysis.normalize_range()
            } else {
                (0.0, analysis.band_ceiling().max(f32::EPSILON))
            };
            writeln!(
                out,
                "{frame:>5} |{}| vu {:>10.3}{}",
                histogram(&bands, bottom, top),
                analysis.volume_unit(),
                if analysis.is_clipping() { " CLIP" } else { "" }
            )?;
        }
        frame += 1;
    }
    out.flush()?;

    if frame == 0 {
        warn!("no complete {window_size} sample window in input");
    }
    info!("analysed {frame} frames");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli)?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(
        Env::default().default_filter_or(cfg.log_level.as_deref().unwrap_or("info")),
    )
    .format_timestamp_secs()
    .init();

    info!("This {} worth the Squeeze", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    run(&cli, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_scales_to_top() {
        assert_eq!(histogram(&[0.0, 0.5, 1.0, 2.0], 0.0, 1.0), " ▄██");
    }

    #[test]
    fn histogram_follows_normalize_range() {
        let mut a = AudioAnalysis::new();
        a.normalize(true, 0.0, 255.0);
        let (bottom, top) = a.normalize_range();
        assert_eq!(histogram(&[0.0, 127.5, 255.0], bottom, top), " ▄█");
        assert_eq!(histogram(&[-1.0, 0.0, 1.0], -1.0, 1.0), " ▄█");
        assert_eq!(histogram(&[3.0], 2.0, 2.0), " ");
    }

    #[test]
    fn tone_windows_never_end() {
        let mut src = Source::Tone { hz: 440.0, noise: true, phase: 0 };
        let mut w = vec![0; 64];
        assert!(src.next_window(&mut w, 8_000).unwrap());
        assert!(w.iter().any(|s| *s != 0));
    }

    #[test]
    fn pcm_stops_on_short_window() {
        let bytes: Vec<u8> = [1i32, -2, 3].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut src = Source::Pcm(Box::new(io::Cursor::new(bytes)));
        let mut w = vec![0; 2];
        assert!(src.next_window(&mut w, 8_000).unwrap());
        assert_eq!(w, vec![1, -2]);
        assert!(!src.next_window(&mut w, 8_000).unwrap());
    }
}
