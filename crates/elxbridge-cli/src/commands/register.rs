//! Register command implementation
//!
//! Registers a moving image onto a fixed image and stores the resulting
//! transformation chain.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use elxbridge_backend_elastix::{ParameterSource, RegistrationConfig, RegistrationHelper};
use elxbridge_image::PointSet;
use elxbridge_params::{transform_parameters_path, ChainRewrite, Preset};

use super::{read_image, write_image};

/// Inputs of one `register` invocation.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub fixed: PathBuf,
    pub moving: PathBuf,
    /// Parameter files or preset names, one per stage.
    pub params: Vec<String>,
    pub fixed_mask: Option<PathBuf>,
    pub fixed_points: Option<PathBuf>,
    pub moving_points: Option<PathBuf>,
    pub channels: Vec<(usize, usize)>,
    pub out_dir: PathBuf,
    /// Where to write the moving image warped into fixed space.
    pub result: Option<PathBuf>,
}

/// Run the register command
///
/// Writes `TransformParameters.{i}.txt` for every stage and, when it could be
/// computed, `deformationField.nrrd` into the output directory.
pub fn run(options: &RegisterOptions, config: RegistrationConfig) -> Result<ExitCode> {
    println!("{}", "elxbridge register".cyan().bold());
    println!("  {} {}", "fixed:".dimmed(), options.fixed.display());
    println!("  {} {}", "moving:".dimmed(), options.moving.display());
    println!();

    let fixed = read_image(&options.fixed)?;
    let moving = read_image(&options.moving)?;
    let stages = options
        .params
        .iter()
        .map(|value| parameter_source(value))
        .collect::<Result<Vec<_>>>()?;

    let mut helper = RegistrationHelper::with_config(config);
    helper.set_status_callback(|line| println!("  {} {}", "->".green(), line));
    helper.set_image_data(fixed, moving.clone())?;
    if let Some(ref path) = options.fixed_mask {
        helper.set_fixed_image_mask_data(read_image(path)?)?;
    }
    if options.fixed_points.is_some() || options.moving_points.is_some() {
        helper.set_point_data(
            read_points(options.fixed_points.as_deref())?,
            read_points(options.moving_points.as_deref())?,
        );
    }
    helper.set_registration_parameters(stages);
    helper.set_channel_selections(options.channels.clone());

    helper.register()?;

    for path in export_chain(helper.transformations(), &options.out_dir)? {
        println!("  {} {}", "wrote".green(), path.display());
    }
    match helper.deformation_field() {
        Some(field) => {
            let path = options.out_dir.join("deformationField.nrrd");
            write_image(&path, field)?;
            println!("  {} {}", "wrote".green(), path.display());
        }
        None => println!("  {} deformation field not available", "!!".yellow()),
    }

    if let Some(ref path) = options.result {
        let warped = helper.warp_image(&moving, moving.pixel_type(), 3)?;
        write_image(path, &warped)?;
        println!("  {} {}", "wrote".green(), path.display());
    }

    println!();
    println!(
        "{} {} stage(s) registered",
        "SUCCESS".green().bold(),
        helper.transformations().len()
    );
    Ok(ExitCode::SUCCESS)
}

/// Writes a transform chain into `out_dir` as `TransformParameters.{i}.txt`.
///
/// Each link's back-reference is repointed at its predecessor inside
/// `out_dir`, so the exported chain stays usable once the working directory
/// is gone.
pub fn export_chain(chain: &[String], out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    ChainRewrite::links_only()
        .apply_chain(chain, out_dir)
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let path = transform_parameters_path(out_dir, i);
            fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

/// Resolves a `--params` value: an existing file, else a preset name.
pub fn parameter_source(value: &str) -> Result<ParameterSource> {
    if Path::new(value).is_file() {
        return Ok(ParameterSource::File(PathBuf::from(value)));
    }
    value
        .parse::<Preset>()
        .map(|preset| ParameterSource::Text(preset.text()))
        .map_err(|e| anyhow!("'{}' is not a parameter file; {}", value, e))
}

/// Parses a `FIXED:MOVING` channel pair.
pub fn parse_channel_pair(value: &str) -> Result<(usize, usize), String> {
    let (fixed, moving) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FIXED:MOVING, got '{}'", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid channel index '{}'", s))
    };
    Ok((parse(fixed)?, parse(moving)?))
}

fn read_points(path: Option<&Path>) -> Result<Option<PointSet>> {
    path.map(|path| {
        PointSet::read(path).with_context(|| format!("Failed to read points: {}", path.display()))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use elxbridge_params::{get_value, presets};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_channel_pair() {
        assert_eq!(parse_channel_pair("0:2"), Ok((0, 2)));
        assert_eq!(parse_channel_pair(" 1 : 0 "), Ok((1, 0)));
        assert!(parse_channel_pair("3").is_err());
        assert!(parse_channel_pair("a:1").is_err());
    }

    #[test]
    fn test_parameter_source_prefers_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigid");
        fs::write(&path, "(Transform \"AffineTransform\")").unwrap();

        let from_file = parameter_source(path.to_str().unwrap()).unwrap();
        assert_eq!(from_file, ParameterSource::File(path));

        let preset = parameter_source("deformable").unwrap();
        assert_eq!(preset, ParameterSource::Text(presets::deformable()));

        assert!(parameter_source("affine").is_err());
    }

    #[test]
    fn test_export_chain_points_into_out_dir() {
        let work = tempfile::tempdir().unwrap();
        let stale = transform_parameters_path(work.path(), 0);
        let chain = vec![
            "(Transform \"EulerTransform\")\n(InitialTransformParametersFileName \"NoInitialTransform\")\n"
                .to_string(),
            format!(
                "(Transform \"BSplineTransform\")\n(InitialTransformParametersFileName \"{}\")\n",
                stale.display()
            ),
        ];
        drop(work);

        let out = tempfile::tempdir().unwrap();
        let out_dir = out.path().join("transforms");
        let written = export_chain(&chain, &out_dir).unwrap();
        assert_eq!(
            written,
            vec![
                transform_parameters_path(&out_dir, 0),
                transform_parameters_path(&out_dir, 1)
            ]
        );

        let first = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(
            get_value(&first, "InitialTransformParametersFileName"),
            Some(vec!["NoInitialTransform".to_string()])
        );
        let second = fs::read_to_string(&written[1]).unwrap();
        assert_eq!(
            get_value(&second, "InitialTransformParametersFileName"),
            Some(vec![written[0].to_string_lossy().into_owned()])
        );
        assert!(!second.contains(&stale.to_string_lossy().into_owned()));
        assert_eq!(get_value(&second, "Transform"), Some(vec!["BSplineTransform".to_string()]));
    }

    #[test]
    fn test_read_points_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.txt");
        fs::write(&path, "point\n2\n1 2\n3 4\n").unwrap();

        assert_eq!(read_points(None).unwrap(), None);
        assert_eq!(read_points(Some(&path)).unwrap().unwrap().len(), 2);
    }
}
