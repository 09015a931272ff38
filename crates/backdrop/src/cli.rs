use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use settings::{PowerSetting, Profile};

#[derive(Parser, Debug)]
#[command(
    name = "backdrop",
    author,
    version,
    about = "GPU-accelerated decorative background",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Settings file to load instead of the one in the config directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Defaults profile (`development` or `production`); follows the build when unset.
    #[arg(long, value_enum, global = true)]
    pub profile: Option<ProfileArg>,

    /// Enable the debug overlay and performance monitoring.
    #[arg(long = "debug", env = "BACKDROP_DEBUG", global = true)]
    pub debug: bool,

    /// Show the debug overlay (toggle at runtime with Ctrl+Shift+P).
    #[arg(long, global = true)]
    pub debug_overlay: bool,

    /// Ignore pointer movement.
    #[arg(long, global = true)]
    pub no_mouse: bool,

    /// Ignore scrolling.
    #[arg(long, global = true)]
    pub no_parallax: bool,

    /// Swap the static background out instantly instead of fading it.
    #[arg(long, global = true)]
    pub no_fade: bool,

    /// Skip the GPU entirely and keep the static background.
    #[arg(long, global = true)]
    pub no_gpu: bool,

    /// Adapter power preference.
    #[arg(long, value_enum, value_name = "low|high", global = true)]
    pub power: Option<PowerArg>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", global = true)]
    pub size: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the background window (the default).
    Run,
    /// Write the static fallback background to a PNG file.
    Fallback(FallbackArgs),
    /// Report GPU capability and the adapters wgpu can see.
    Probe,
    /// Print the effective configuration after all layers are applied.
    Config,
}

#[derive(Parser, Debug)]
pub struct FallbackArgs {
    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileArg {
    Development,
    Production,
}

impl From<ProfileArg> for Profile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Development => Profile::Development,
            ProfileArg::Production => Profile::Production,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerArg {
    Low,
    High,
}

impl From<PowerArg> for PowerSetting {
    fn from(value: PowerArg) -> Self {
        match value {
            PowerArg::Low => PowerSetting::Low,
            PowerArg::High => PowerSetting::High,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
