//! elxbridge CLI - Command-line interface for elastix registration
//!
//! This binary registers images with elastix, applies stored transformations
//! with transformix, and edits parameter files.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use elxbridge_cli::commands;
use elxbridge_cli::commands::register::{parse_channel_pair, RegisterOptions};
use elxbridge_cli::commands::warp::WarpOptions;
use elxbridge_cli::config::ToolArgs;
use elxbridge_cli::logging;
use elxbridge_image::PixelType;
use elxbridge_params::Preset;

/// elxbridge - elastix/transformix registration driver
#[derive(Parser)]
#[command(name = "elxbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,

    #[command(flatten)]
    tools: ToolArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a moving image onto a fixed image
    Register {
        /// Fixed (reference) image (NRRD)
        #[arg(short, long)]
        fixed: PathBuf,

        /// Moving image (NRRD)
        #[arg(short, long)]
        moving: PathBuf,

        /// Parameter file or preset name (rigid, deformable), once per stage
        #[arg(short, long = "params")]
        params: Vec<String>,

        /// Mask for the fixed image (NRRD, same geometry as the fixed image)
        #[arg(long)]
        fixed_mask: Option<PathBuf>,

        /// Landmarks in the fixed image (elastix point file)
        #[arg(long)]
        fixed_points: Option<PathBuf>,

        /// Landmarks in the moving image (elastix point file)
        #[arg(long)]
        moving_points: Option<PathBuf>,

        /// Channel pair FIXED:MOVING for multi-component images, repeatable
        #[arg(long = "channel", value_parser = parse_channel_pair)]
        channels: Vec<(usize, usize)>,

        /// Directory receiving the transform parameter files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Also write the warped moving image to this path
        #[arg(long)]
        result: Option<PathBuf>,
    },

    /// Warp an image with stored transformations
    Warp {
        /// Image to warp (NRRD)
        #[arg(short, long)]
        input: PathBuf,

        /// Transform parameter file, repeatable, in chain order
        #[arg(short, long = "transform")]
        transforms: Vec<PathBuf>,

        /// Deformation field (NRRD) applied in-process instead of transformix
        #[arg(long)]
        field: Option<PathBuf>,

        /// Output pixel type (default: input pixel type)
        #[arg(long)]
        pixel_type: Option<PixelType>,

        /// B-spline interpolation order for non-integer pixel types
        #[arg(long, default_value_t = 3)]
        order: u8,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build a volume from individually registered slices
    Reconstruct {
        /// JSON manifest listing slices and their transform files
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output volume path
        #[arg(short, long)]
        output: PathBuf,

        /// Output pixel type
        #[arg(long, default_value = "float")]
        pixel_type: PixelType,

        /// B-spline interpolation order
        #[arg(long, default_value_t = 3)]
        order: u8,

        /// Slice distance, overriding the manifest
        #[arg(long)]
        z_spacing: Option<f64>,
    },

    /// Inspect and edit parameter files
    Params {
        #[command(subcommand)]
        command: ParamsCommands,
    },

    /// Check the elastix installation and configuration
    Doctor,
}

#[derive(Subcommand)]
enum ParamsCommands {
    /// Print a preset parameter file
    Show {
        /// Preset name (rigid, deformable)
        preset: Preset,
    },

    /// Print the values of a directive
    Get {
        file: PathBuf,
        key: String,

        /// Print the whole directive instead of its values
        #[arg(long)]
        raw: bool,
    },

    /// Set a directive, replacing the first occurrence
    Set {
        file: PathBuf,
        key: String,
        #[arg(required = true)]
        values: Vec<String>,

        /// Wrap each value in double quotes
        #[arg(short, long)]
        quote: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove the first occurrence of a directive
    Remove {
        file: PathBuf,
        key: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::setup_logging(&cli.log_level) {
        eprintln!("{}: {}", colored::Colorize::red("error"), e);
        return ExitCode::from(1);
    }

    let result = match cli.command {
        Commands::Register {
            fixed,
            moving,
            params,
            fixed_mask,
            fixed_points,
            moving_points,
            channels,
            out_dir,
            result,
        } => cli.tools.resolve().and_then(|config| {
            let options = RegisterOptions {
                fixed,
                moving,
                params,
                fixed_mask,
                fixed_points,
                moving_points,
                channels,
                out_dir,
                result,
            };
            commands::register::run(&options, config)
        }),
        Commands::Warp {
            input,
            transforms,
            field,
            pixel_type,
            order,
            output,
        } => cli.tools.resolve().and_then(|config| {
            let options = WarpOptions {
                input,
                transforms,
                field,
                pixel_type,
                order,
                output,
            };
            commands::warp::run(&options, config)
        }),
        Commands::Reconstruct {
            manifest,
            output,
            pixel_type,
            order,
            z_spacing,
        } => cli.tools.resolve().and_then(|config| {
            commands::reconstruct::run(&manifest, &output, pixel_type, order, z_spacing, config)
        }),
        Commands::Params { command } => match command {
            ParamsCommands::Show { preset } => commands::params::show(preset),
            ParamsCommands::Get { file, key, raw } => commands::params::get(&file, &key, raw),
            ParamsCommands::Set {
                file,
                key,
                values,
                quote,
                output,
            } => commands::params::set(&file, &key, &values, quote, output.as_deref()),
            ParamsCommands::Remove { file, key, output } => {
                commands::params::remove(&file, &key, output.as_deref())
            }
        },
        Commands::Doctor => cli
            .tools
            .resolve()
            .and_then(|config| commands::doctor::run(cli.tools.config.as_deref(), &config)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_register() {
        let cli = Cli::try_parse_from([
            "elxbridge",
            "register",
            "--fixed",
            "fixed.nrrd",
            "--moving",
            "moving.nrrd",
            "-p",
            "rigid",
            "-p",
            "deformable",
            "--channel",
            "0:1",
            "--out-dir",
            "out",
            "--keep-work-dir",
        ])
        .unwrap();
        assert!(cli.tools.keep_work_dir);
        match cli.command {
            Commands::Register {
                params, channels, ..
            } => {
                assert_eq!(params, vec!["rigid", "deformable"]);
                assert_eq!(channels, vec![(0, 1)]);
            }
            _ => panic!("expected register command"),
        }
    }

    #[test]
    fn test_cli_parses_warp_pixel_type() {
        let cli = Cli::try_parse_from([
            "elxbridge",
            "warp",
            "-i",
            "labels.nrrd",
            "-t",
            "TransformParameters.0.txt",
            "--pixel-type",
            "short",
            "-o",
            "out.nrrd",
        ])
        .unwrap();
        match cli.command {
            Commands::Warp {
                pixel_type, order, ..
            } => {
                assert_eq!(pixel_type, Some(PixelType::I16));
                assert_eq!(order, 3);
            }
            _ => panic!("expected warp command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_preset() {
        assert!(Cli::try_parse_from(["elxbridge", "params", "show", "affine"]).is_err());
    }

    #[test]
    fn test_cli_global_tool_flags() {
        let cli = Cli::try_parse_from([
            "elxbridge",
            "doctor",
            "--elastix-path",
            "/opt/elastix/bin",
        ])
        .unwrap();
        assert_eq!(cli.tools.elastix_path, Some(PathBuf::from("/opt/elastix/bin")));
        assert_eq!(cli.log_level, "info");
    }
}
