//! Command-line interface for the image evaluation harness.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{EvalConfig, MetricKind};
use crate::error::Result;
use crate::io::{load_linear, save_srgb};
use crate::metrics::frequency_spectrum;
use crate::pipeline::Evaluation;

/// Image Similarity Evaluation Tool
///
/// Compares a "bad" and a "good" candidate against a ground-truth capture
/// with L2, FFT-L2, SSIM, PSNR, VGG19 and patch pattern-match metrics.
#[derive(Parser, Debug)]
#[command(name = "imgeval")]
#[command(version)]
#[command(about = "Rank two candidate images against a ground-truth capture")]
#[command(long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare the bad and good candidates against the ground truth
    Compare(CompareArgs),

    /// Save the normalized FFT magnitude spectrum of one image
    Spectrum {
        /// Input image path
        #[arg(short, long)]
        input: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// Keep colour channels instead of converting to grayscale
        #[arg(long)]
        color: bool,
    },
}

/// Options for the `compare` subcommand. Flags override the config file.
#[derive(clap::Args, Debug, Default)]
pub struct CompareArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Folder holding the captures
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Ground-truth file name inside the capture folder
    #[arg(long)]
    pub ground_truth: Option<PathBuf>,

    /// Bad candidate file name inside the capture folder
    #[arg(long)]
    pub bad: Option<PathBuf>,

    /// Good candidate file name inside the capture folder
    #[arg(long)]
    pub good: Option<PathBuf>,

    /// Keep colour channels instead of converting to grayscale
    #[arg(long)]
    pub color: bool,

    /// Patch edge length for pattern matching
    #[arg(short, long)]
    pub patch_size: Option<usize>,

    /// Limit the pattern-match search to this many pixels around each patch
    #[arg(long)]
    pub search_radius: Option<usize>,

    /// SSIM window edge length
    #[arg(long)]
    pub ssim_window: Option<usize>,

    /// Write the ground-truth FFT spectrum to this file
    #[arg(long)]
    pub fft_output: Option<PathBuf>,

    /// Write the good candidate's pattern-match overlay to this file
    #[arg(long)]
    pub match_output: Option<PathBuf>,

    /// ONNX export of VGG19 truncated after its first dense layer
    #[arg(long)]
    pub vgg_model: Option<PathBuf>,

    /// Metrics to compute (comma separated)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub metrics: Vec<MetricArg>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Metric argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricArg {
    /// Pixel-space L2 distance
    L2,
    /// FFT magnitude L2 distance
    FftL2,
    /// Structural similarity
    Ssim,
    /// Peak signal-to-noise ratio
    Psnr,
    /// VGG19 feature distance
    Vgg19,
    /// Patch pattern-match score
    PatternMatch,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::L2 => MetricKind::L2,
            MetricArg::FftL2 => MetricKind::FftL2,
            MetricArg::Ssim => MetricKind::Ssim,
            MetricArg::Psnr => MetricKind::Psnr,
            MetricArg::Vgg19 => MetricKind::Vgg19,
            MetricArg::PatternMatch => MetricKind::PatternMatch,
        }
    }
}

impl CompareArgs {
    /// Build the effective configuration: file (or defaults), then flags.
    pub fn to_config(&self) -> Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_toml_file(path)?,
            None => EvalConfig::default(),
        };

        if let Some(dir) = &self.dir {
            config.capture_dir = dir.clone();
        }
        if let Some(name) = &self.ground_truth {
            config.ground_truth = name.clone();
        }
        if let Some(name) = &self.bad {
            config.bad = name.clone();
        }
        if let Some(name) = &self.good {
            config.good = name.clone();
        }
        if self.color {
            config.grayscale = false;
        }
        if let Some(size) = self.patch_size {
            config.patch_size = size;
        }
        if self.search_radius.is_some() {
            config.search_radius = self.search_radius;
        }
        if let Some(window) = self.ssim_window {
            config.ssim_window = window;
        }
        if self.fft_output.is_some() {
            config.fft_output = self.fft_output.clone();
        }
        if self.match_output.is_some() {
            config.match_output = self.match_output.clone();
        }
        if self.vgg_model.is_some() {
            config.vgg_model = self.vgg_model.clone();
        }
        if !self.metrics.is_empty() {
            config.metrics = self.metrics.iter().map(|&m| m.into()).collect();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run the CLI application.
pub fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else if !cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }

    match cli.command {
        Commands::Compare(args) => run_compare(&args, cli.quiet),
        Commands::Spectrum {
            input,
            output,
            color,
        } => run_spectrum(input, output, color),
    }
}

/// Run compare command.
fn run_compare(args: &CompareArgs, quiet: bool) -> Result<()> {
    let config = args.to_config()?;
    log::debug!("Effective configuration: {:?}", config);

    let report = Evaluation::new(config)
        .show_progress(!quiet && !args.json)
        .run()?;

    if args.json {
        println!("{}", report.to_json()?);
    } else if !quiet {
        print!("{}", report);
    }

    Ok(())
}

/// Run spectrum command.
fn run_spectrum(input: PathBuf, output: PathBuf, color: bool) -> Result<()> {
    let image = load_linear(&input, !color)?;
    let spectrum = frequency_spectrum(&image);
    save_srgb(&spectrum.normalized(), &output)
}
