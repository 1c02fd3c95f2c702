// Windchime
// Copyright (C) 2026  The Windchime Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use windchime::{
    clock::{SystemClock, ThreadSleeper},
    config::{DeviceConfig, WeatherConfig},
    device::{self, Collaborators, DeviceState},
    indicator::{LogIndicator, LogStatusLed},
    voice::OscChimeVoice,
    weather::{FileWeatherSource, OfflineWeather, WeatherSource},
};

/// Plays a wind chime on a SuperCollider server, driven by the weather.
#[derive(Debug, Parser)]
#[command(name = "windchime", version, about)]
struct Args {
    /// Path to the JSON device configuration. Defaults are used if it does not exist.
    #[arg(short, long, default_value = "windchime.json")]
    config: PathBuf,

    /// Use randomly generated weather instead of the configured source.
    #[arg(long)]
    offline: bool,

    /// Seed for the gesture generator and offline weather.
    #[arg(long)]
    seed: Option<u64>,

    /// UDP address of the SuperCollider server, overriding the configuration.
    #[arg(long)]
    synth: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = DeviceConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.offline {
        config.weather = WeatherConfig::Offline;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(address) = args.synth {
        config.synth.address = address;
    }

    let weather: Box<dyn WeatherSource> = match &config.weather {
        WeatherConfig::Offline => {
            let rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
                None => StdRng::from_entropy(),
            };
            Box::new(OfflineWeather::new(rng))
        }
        WeatherConfig::File { path, format } => Box::new(FileWeatherSource::new(path, *format)),
    };

    let voice = OscChimeVoice::connect(&config.synth.address, &config.synth.synthdef)
        .with_context(|| format!("connecting to synth server at {}", config.synth.address))?
        .loudness(config.loudness);

    let mut state = DeviceState::new(
        &config,
        Collaborators {
            weather,
            voice: Box::new(voice),
            lamp: Box::new(LogIndicator::new(config.led_brightness)),
            busy_led: Box::new(LogStatusLed),
            sleeper: Box::new(ThreadSleeper),
        },
    )
    .context("building device state")?;

    let scheduler =
        device::build_scheduler(&config.tasks, SystemClock).context("building task schedule")?;

    log::info!("starting up");
    state.start_up();
    scheduler.run_forever(&mut state)
}
