// Commandline argument parser using clap for VioBridge

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct BridgeArgs {
    #[command(subcommand)]
    /// Where tracker events come from, a recording or the simulator
    pub command: CommandTask,

    /// RON configuration file; defaults are used when absent
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Stream estimates as JSON to this host:port, overriding the config
    #[arg(short = 'u', long = "udp")]
    pub udp_target: Option<String>,

    /// Don't fuse visual poses, locate with ultrasound only
    #[arg(long = "no-vio")]
    pub no_vio: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Feed a recorded tracker session through the bridge
    #[command(about)]
    Replay(ReplayCommand),

    /// Feed a simulated walk through the bridge
    #[command(about)]
    Simulate(SimulateCommand),
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ReplayCommand {
    /// Recorded session, one tracker event per line
    #[arg(short = 'i', long = "input")]
    pub infile: PathBuf,

    /// Playback speed; frames are spaced by their timestamps divided by this
    #[arg(short = 's', long = "speed", default_value_t = 1.0)]
    pub speed: f64,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct SimulateCommand {
    /// Number of camera frames to generate
    #[arg(short = 'n', long = "frames", default_value_t = 600)]
    pub frames: usize,

    /// Frames per second
    #[arg(short = 'r', long = "rate", default_value_t = 30.0)]
    pub frame_rate: f64,

    /// Radius of the simulated walk, in meters
    #[arg(long = "radius", default_value_t = 2.0)]
    pub radius: f64,

    /// Meters of noise added to every simulated position
    #[arg(long = "noise", default_value_t = 0.0)]
    pub noise: f64,

    /// Also write the simulated session to this file, in replay format
    #[arg(short = 'o', long = "record")]
    pub record: Option<PathBuf>,
}
