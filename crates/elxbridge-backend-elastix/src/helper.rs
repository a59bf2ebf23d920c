//! Registration orchestration.
//!
//! [`RegistrationHelper`] collects the inputs of one registration job,
//! materializes them into a working directory, runs elastix, and keeps the
//! resulting transformation chain and deformation field for later warps.

use std::borrow::Cow;
use std::cell::Cell;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use elxbridge_image::convert::{prepare_for_registration, to_host_layout};
use elxbridge_image::{nrrd, warp_with_displacement, Image, ImageError, Interpolation, PixelType, PointSet};
use elxbridge_params::{inject_point_metric, presets, transform_parameters_path, ChainRewrite};
use tracing::{debug, error, info, warn};

use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, RegistrationResult};
use crate::runner::{library_env, ProcessOutput, ProcessRunner, SystemRunner};
use crate::workdir::WorkingDirectory;

/// Progress of the most recent job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Idle,
    InputsSet,
    WorkingDirReady,
    ParamsWritten,
    DataMaterialized,
    ExecutableInvoked,
    OutputsParsed,
    DeformationComputed,
    WarpInvoked,
    Done,
}

impl RegistrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::Idle => "idle",
            RegistrationState::InputsSet => "inputs_set",
            RegistrationState::WorkingDirReady => "working_dir_ready",
            RegistrationState::ParamsWritten => "params_written",
            RegistrationState::DataMaterialized => "data_materialized",
            RegistrationState::ExecutableInvoked => "executable_invoked",
            RegistrationState::OutputsParsed => "outputs_parsed",
            RegistrationState::DeformationComputed => "deformation_computed",
            RegistrationState::WarpInvoked => "warp_invoked",
            RegistrationState::Done => "done",
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registration stage: inline parameter text or a parameter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    Text(String),
    File(PathBuf),
}

impl ParameterSource {
    /// Treats `value` as a file path if such a file exists, else as text.
    pub fn detect(value: impl Into<String>) -> Self {
        let value = value.into();
        if Path::new(&value).is_file() {
            ParameterSource::File(PathBuf::from(value))
        } else {
            ParameterSource::Text(value)
        }
    }

    /// Returns the parameter text.
    pub fn resolve(&self) -> RegistrationResult<String> {
        match self {
            ParameterSource::Text(text) => Ok(text.clone()),
            ParameterSource::File(path) => {
                fs::read_to_string(path).map_err(|source| RegistrationError::ReadParameters {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

impl From<String> for ParameterSource {
    fn from(text: String) -> Self {
        ParameterSource::Text(text)
    }
}

impl From<&str> for ParameterSource {
    fn from(text: &str) -> Self {
        ParameterSource::Text(text.to_string())
    }
}

impl From<PathBuf> for ParameterSource {
    fn from(path: PathBuf) -> Self {
        ParameterSource::File(path)
    }
}

/// Callback receiving human-readable progress lines.
pub type StatusCallback = Box<dyn Fn(&str) + Send>;

/// Drives elastix and transformix for one pair of images.
pub struct RegistrationHelper<R: ProcessRunner = SystemRunner> {
    config: RegistrationConfig,
    runner: R,
    fixed: Option<Image>,
    moving: Option<Image>,
    fixed_mask: Option<Image>,
    points: Option<(PointSet, PointSet)>,
    parameters: Vec<ParameterSource>,
    channel_selections: Vec<(usize, usize)>,
    transformations: Vec<String>,
    deformation_field: Option<Image>,
    status: Option<StatusCallback>,
    state: Cell<RegistrationState>,
}

impl RegistrationHelper<SystemRunner> {
    /// Creates a helper with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistrationConfig::default())
    }

    /// Creates a helper that launches real processes.
    pub fn with_config(config: RegistrationConfig) -> Self {
        Self::with_runner(config, SystemRunner)
    }
}

impl Default for RegistrationHelper<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> RegistrationHelper<R> {
    /// Creates a helper that launches processes through `runner`.
    pub fn with_runner(config: RegistrationConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            fixed: None,
            moving: None,
            fixed_mask: None,
            points: None,
            parameters: Vec::new(),
            channel_selections: Vec::new(),
            transformations: Vec::new(),
            deformation_field: None,
            status: None,
            state: Cell::new(RegistrationState::Idle),
        }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Current position in the job state machine.
    pub fn state(&self) -> RegistrationState {
        self.state.get()
    }

    /// Sets the fixed and moving images.
    ///
    /// Fails when a fixed mask is already set and its geometry differs from
    /// the fixed image.
    pub fn set_image_data(&mut self, fixed: Image, moving: Image) -> RegistrationResult<()> {
        if let Some(ref mask) = self.fixed_mask {
            check_mask_geometry(&fixed, mask)?;
        }
        self.fixed = Some(fixed);
        self.moving = Some(moving);
        self.state.set(RegistrationState::InputsSet);
        Ok(())
    }

    /// Sets the fixed image mask, checked against an already set fixed image.
    pub fn set_fixed_image_mask_data(&mut self, mask: Image) -> RegistrationResult<()> {
        if let Some(ref fixed) = self.fixed {
            check_mask_geometry(fixed, &mask)?;
        }
        self.fixed_mask = Some(mask);
        Ok(())
    }

    /// Sets corresponding landmarks. Points are only used when both sets are
    /// given.
    pub fn set_point_data(&mut self, fixed: Option<PointSet>, moving: Option<PointSet>) {
        match (fixed, moving) {
            (Some(fixed), Some(moving)) => self.points = Some((fixed, moving)),
            (fixed, moving) => {
                warn!(
                    "Fixed pointset is [{}]; moving pointset is [{}]. No pointsets are used.",
                    describe_points(fixed.as_ref()),
                    describe_points(moving.as_ref())
                );
                self.points = None;
            }
        }
    }

    /// Whether landmarks take part in the registration.
    pub fn uses_points(&self) -> bool {
        self.points.is_some()
    }

    /// Sets the registration stages. An empty list selects the rigid preset.
    pub fn set_registration_parameters<I, P>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<ParameterSource>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
    }

    /// Sets `(fixed_channel, moving_channel)` pairs for multi-component images.
    pub fn set_channel_selections(&mut self, selections: Vec<(usize, usize)>) {
        self.channel_selections = selections;
    }

    /// Replaces the transformation chain. Any cached deformation field
    /// belongs to the old chain and is dropped.
    pub fn set_transformations(&mut self, transformations: Vec<String>) {
        self.transformations = transformations;
        self.deformation_field = None;
    }

    pub fn transformations(&self) -> &[String] {
        &self.transformations
    }

    /// Sets a precomputed deformation field used by [`warp_image`](Self::warp_image).
    pub fn set_deformation_field(&mut self, field: Option<Image>) {
        self.deformation_field = field;
    }

    pub fn deformation_field(&self) -> Option<&Image> {
        self.deformation_field.as_ref()
    }

    pub fn set_status_callback(&mut self, callback: impl Fn(&str) + Send + 'static) {
        self.status = Some(Box::new(callback));
    }

    /// Runs the registration.
    ///
    /// On success the transformation chain is replaced and, when transformix
    /// succeeds, the deformation field is cached. A failing deformation pass
    /// is logged and leaves the cache empty.
    pub fn register(&mut self) -> RegistrationResult<()> {
        let (transformations, field) = self.run_registration()?;
        self.transformations = transformations;
        self.deformation_field = field;
        self.state.set(RegistrationState::Done);
        self.report("Registration OK!");
        Ok(())
    }

    fn run_registration(&self) -> RegistrationResult<(Vec<String>, Option<Image>)> {
        let (fixed, moving) = match (&self.fixed, &self.moving) {
            (Some(fixed), Some(moving)) => (fixed, moving),
            _ => {
                error!("No image set for registration!");
                return Err(RegistrationError::MissingImages);
            }
        };

        let env = library_env(self.config.library_dir.as_deref());
        let elastix = self.config.locator().locate("elastix", &self.runner, &env)?;

        let workdir = WorkingDirectory::create(
            self.config.working_directory.as_deref(),
            self.config.remove_working_directory,
        )?;
        self.state.set(RegistrationState::WorkingDirReady);

        let stage_count = self.write_parameter_files(&workdir)?;
        self.state.set(RegistrationState::ParamsWritten);

        let mut args = vec![OsString::from("-out"), workdir.path().as_os_str().to_os_string()];
        self.materialize_image(moving, ImageRole::Moving, &workdir, &mut args)?;
        self.materialize_image(fixed, ImageRole::Fixed, &workdir, &mut args)?;

        if let Some(ref mask) = self.fixed_mask {
            let path = workdir.join("fixedMask.nrrd");
            nrrd::write(&path, &*prepare(mask)?)?;
            push_pair(&mut args, "-fMask", &path);
        }

        if let Some((ref fixed_points, ref moving_points)) = self.points {
            let dimension = prepare(fixed)?.dimension();
            let fixed_path = workdir.join("fixedPoints.txt");
            let moving_path = workdir.join("movingPoints.txt");
            moving_points.write(&moving_path, dimension)?;
            fixed_points.write(&fixed_path, dimension)?;
            push_pair(&mut args, "-fp", &fixed_path);
            push_pair(&mut args, "-mp", &moving_path);
        }

        for i in 0..stage_count {
            push_pair(&mut args, "-p", &workdir.join(format!("pp{}.txt", i)));
        }
        self.state.set(RegistrationState::DataMaterialized);

        info!("Registration started ...");
        self.run_tool(&elastix, &args, &env)?;
        self.state.set(RegistrationState::ExecutableInvoked);
        info!("Registration finished.");

        check_log(&workdir.join("elastix.log"), "elastix")?;

        let transformations = (0..stage_count)
            .map(|i| read_output(&transform_parameters_path(workdir.path(), i)))
            .collect::<RegistrationResult<Vec<_>>>()?;
        self.state.set(RegistrationState::OutputsParsed);
        self.report("Transformation parameters assimilated");

        let field = match self.compute_deformation_field(&workdir, &transformations, &env) {
            Ok(field) => {
                self.state.set(RegistrationState::DeformationComputed);
                Some(field)
            }
            Err(e) => {
                error!("Error loading deformation field: {}", e);
                None
            }
        };

        workdir.finish();
        Ok((transformations, field))
    }

    /// Writes `pp{i}.txt` for every stage and returns the stage count.
    fn write_parameter_files(&self, workdir: &WorkingDirectory) -> RegistrationResult<usize> {
        let default_stage = [ParameterSource::Text(presets::rigid())];
        let stages: &[ParameterSource] = if self.parameters.is_empty() {
            &default_stage
        } else {
            &self.parameters
        };

        for (i, stage) in stages.iter().enumerate() {
            let mut text = stage.resolve()?;
            if self.points.is_some() {
                inject_point_metric(&mut text);
            }
            let path = workdir.join(format!("pp{}.txt", i));
            write_text(&path, &text)?;
            self.report(&format!("Parameter file written: {}", path.display()));
        }
        Ok(stages.len())
    }

    fn materialize_image(
        &self,
        image: &Image,
        role: ImageRole,
        workdir: &WorkingDirectory,
        args: &mut Vec<OsString>,
    ) -> RegistrationResult<()> {
        if image.components() == 1 {
            let path = workdir.join(format!("{}.nrrd", role.name()));
            symlink_or_write(image, &path)?;
            push_pair(args, &format!("-{}", role.flag()), &path);
            return Ok(());
        }

        let default_selection = [(0, 0)];
        let selections: &[(usize, usize)] = if self.channel_selections.is_empty() {
            warn!(
                "{} image has {} components but no channel selection; using channel 0",
                role.name(),
                image.components()
            );
            &default_selection
        } else {
            &self.channel_selections
        };

        let prepared = prepare(image)?;
        for (k, &(fixed_channel, moving_channel)) in selections.iter().enumerate() {
            let channel = match role {
                ImageRole::Fixed => fixed_channel,
                ImageRole::Moving => moving_channel,
            };
            let path = workdir.join(format!("{}.{}.nrrd", role.name(), channel));
            nrrd::write(&path, &prepared.extract_component(channel)?)?;
            push_pair(args, &format!("-{}{}", role.flag(), k), &path);
        }
        Ok(())
    }

    fn compute_deformation_field(
        &self,
        workdir: &WorkingDirectory,
        transformations: &[String],
        env: &[(OsString, OsString)],
    ) -> RegistrationResult<Image> {
        let transformix = self.config.locator().locate("transformix", &self.runner, env)?;
        let last = write_chain(workdir.path(), transformations, &ChainRewrite::links_only())?;

        let mut args = vec![OsString::from("-def"), OsString::from("all")];
        push_pair(&mut args, "-tp", &last);
        push_pair(&mut args, "-out", workdir.path());
        self.run_tool(&transformix, &args, env)?;
        check_log(&workdir.join("transformix.log"), "transformix")?;

        let field = load_output(&workdir.join("deformationField.nrrd"))?;
        self.report("Deformation field computed");
        Ok(field)
    }

    /// Warps `image` into the fixed image space.
    ///
    /// With a cached deformation field the image is resampled in memory
    /// (nearest neighbor for integer `pixel_type`, linear otherwise) and no
    /// process is started. Otherwise the transformation chain is rewritten
    /// for `pixel_type` and `interpolation_order` and applied by transformix.
    ///
    /// The result is in host layout: 2D results become single-slice volumes
    /// carrying the slice spacing of `image`.
    pub fn warp_image(
        &self,
        image: &Image,
        pixel_type: PixelType,
        interpolation_order: u8,
    ) -> RegistrationResult<Image> {
        let data = prepare(image)?;
        if let Some(ref fixed) = self.fixed {
            prepare(fixed)?;
        }
        let z_spacing = (image.dimension() >= 3).then(|| image.geometry().spacing()[2]);

        if let Some(ref field) = self.deformation_field {
            let interpolation = Interpolation::for_pixel_type(pixel_type);
            let warped = warp_with_displacement(&data, field, interpolation, pixel_type)?;
            self.state.set(RegistrationState::WarpInvoked);
            let result = to_host_layout(warped, z_spacing);
            self.state.set(RegistrationState::Done);
            return Ok(result);
        }

        if self.transformations.is_empty() {
            return Err(RegistrationError::NoTransformation);
        }

        let env = library_env(self.config.library_dir.as_deref());
        let transformix = self.config.locator().locate("transformix", &self.runner, &env)?;
        let workdir = WorkingDirectory::create(
            self.config.working_directory.as_deref(),
            self.config.remove_working_directory,
        )?;
        self.state.set(RegistrationState::WorkingDirReady);

        let rewrite = ChainRewrite::for_pixel_type(
            pixel_type.elastix_name(),
            pixel_type.is_integer(),
            interpolation_order,
        );
        let last = write_chain(workdir.path(), &self.transformations, &rewrite)?;
        self.state.set(RegistrationState::ParamsWritten);

        let data_path = workdir.join("data.nrrd");
        nrrd::write(&data_path, &data)?;
        self.state.set(RegistrationState::DataMaterialized);

        let mut args = Vec::new();
        push_pair(&mut args, "-in", &data_path);
        push_pair(&mut args, "-tp", &last);
        push_pair(&mut args, "-out", workdir.path());
        self.run_tool(&transformix, &args, &env)?;
        self.state.set(RegistrationState::WarpInvoked);

        check_log(&workdir.join("transformix.log"), "transformix")?;
        let result = load_output(&workdir.join("result.nrrd"))?;
        workdir.finish();

        self.state.set(RegistrationState::Done);
        Ok(to_host_layout(result, z_spacing))
    }

    fn run_tool(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> RegistrationResult<ProcessOutput> {
        debug!(program = %program.display(), ?args, "launching");
        let output = self
            .runner
            .run(program, args, env)
            .map_err(|source| RegistrationError::SpawnFailed {
                program: program.to_path_buf(),
                source,
            })?;
        match output.exit_code {
            Some(0) => debug!(program = %program.display(), "exited successfully"),
            code => warn!(program = %program.display(), exit_code = ?code, "process exited with non-zero status"),
        }
        for line in output.lines() {
            debug!("{}", line);
        }
        Ok(output)
    }

    fn report(&self, message: &str) {
        info!("{}", message);
        if let Some(ref status) = self.status {
            status(message);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ImageRole {
    Fixed,
    Moving,
}

impl ImageRole {
    fn name(&self) -> &'static str {
        match self {
            ImageRole::Fixed => "fixed",
            ImageRole::Moving => "moving",
        }
    }

    fn flag(&self) -> &'static str {
        match self {
            ImageRole::Fixed => "f",
            ImageRole::Moving => "m",
        }
    }
}

fn check_mask_geometry(image: &Image, mask: &Image) -> RegistrationResult<()> {
    if image.same_geometry(mask) {
        return Ok(());
    }
    error!(
        "Fixed image [{}] and fixed mask image [{}]. Image geometries of mask image and image have to be equal!",
        image.shape(),
        mask.shape()
    );
    Err(RegistrationError::GeometryMismatch {
        image_shape: image.shape(),
        mask_shape: mask.shape(),
    })
}

fn describe_points(points: Option<&PointSet>) -> String {
    match points {
        Some(points) => format!("{} points", points.len()),
        None => "missing".to_string(),
    }
}

/// Converts to registration layout, surfacing unsupported shapes as
/// [`RegistrationError::UnsupportedDimension`].
fn prepare(image: &Image) -> RegistrationResult<Cow<'_, Image>> {
    prepare_for_registration(image).map_err(|e| match e {
        ImageError::UnsupportedDimension { dimension, shape } => {
            error!("Image [{}]. Shape has to be [NxM], [NxMxK] or [NxMx1]", shape);
            RegistrationError::UnsupportedDimension { dimension, shape }
        }
        other => other.into(),
    })
}

/// Links the image's source file into place when it can be reused as is,
/// otherwise writes the converted image.
fn symlink_or_write(image: &Image, target: &Path) -> RegistrationResult<()> {
    let prepared = prepare(image)?;
    if let Cow::Borrowed(unchanged) = &prepared {
        if let Some(source) = reusable_source(unchanged) {
            match create_symlink(&source, target) {
                Ok(()) => {
                    info!("Symlinked {} to {}", source.display(), target.display());
                    return Ok(());
                }
                Err(e) => debug!(error = %e, "symlink failed, writing instead"),
            }
        }
    }
    nrrd::write(target, &prepared)?;
    Ok(())
}

fn reusable_source(image: &Image) -> Option<PathBuf> {
    let source = image.source_path()?;
    let is_nrrd = source
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("nrrd"))
        .unwrap_or(false);
    if !is_nrrd || !source.is_file() {
        return None;
    }
    source.canonicalize().ok()
}

#[cfg(unix)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported"))
}

/// Writes a rewritten chain into `directory` and returns the last link's path.
fn write_chain(
    directory: &Path,
    transformations: &[String],
    rewrite: &ChainRewrite,
) -> RegistrationResult<PathBuf> {
    let chain = rewrite.apply_chain(transformations, directory);
    let mut last = None;
    for (i, text) in chain.iter().enumerate() {
        let path = transform_parameters_path(directory, i);
        write_text(&path, text)?;
        last = Some(path);
    }
    last.ok_or(RegistrationError::NoTransformation)
}

/// Fails when the last non-blank line of a tool log mentions an error. A
/// missing log is only logged.
fn check_log(path: &Path, tool: &str) -> RegistrationResult<()> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("{} log file not found at {}", tool, path.display());
            return Ok(());
        }
        Err(source) => {
            return Err(RegistrationError::OutputMissing {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    match text.lines().map(str::trim).rev().find(|line| !line.is_empty()) {
        Some(line) if line.contains("Error") => {
            error!("{} log file contains error: {}", tool, line);
            Err(RegistrationError::external_failure(tool, line))
        }
        _ => Ok(()),
    }
}

fn read_output(path: &Path) -> RegistrationResult<String> {
    fs::read_to_string(path).map_err(|source| RegistrationError::OutputMissing {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads an image produced by a tool. The working directory may be deleted
/// afterwards, so the source path is dropped.
fn load_output(path: &Path) -> RegistrationResult<Image> {
    match nrrd::read(path) {
        Ok(image) => Ok(image.without_source_path()),
        Err(ImageError::Read { path, source }) => Err(RegistrationError::OutputMissing { path, source }),
        Err(other) => Err(other.into()),
    }
}

fn write_text(path: &Path, text: &str) -> RegistrationResult<()> {
    fs::write(path, text).map_err(|source| RegistrationError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn push_pair(args: &mut Vec<OsString>, flag: &str, value: &Path) {
    args.push(OsString::from(flag));
    args.push(value.as_os_str().to_os_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use elxbridge_image::Geometry;
    use pretty_assertions::assert_eq;

    fn image(dims: &[usize]) -> Image {
        Image::new(PixelType::F32, dims, 1).unwrap()
    }

    #[test]
    fn test_mask_geometry_checked_both_ways() {
        let mut helper = RegistrationHelper::new();
        helper.set_image_data(image(&[4, 4]), image(&[4, 4])).unwrap();
        let err = helper.set_fixed_image_mask_data(image(&[4, 5])).unwrap_err();
        assert_eq!(err.code(), "ELX_004");

        let mut helper = RegistrationHelper::new();
        let shifted = Geometry::new(vec![1.0, 1.0], vec![0.5, 0.0], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        helper
            .set_fixed_image_mask_data(image(&[4, 4]).with_geometry(shifted).unwrap())
            .unwrap();
        assert!(helper.set_image_data(image(&[4, 4]), image(&[4, 4])).is_err());
        assert_eq!(helper.state(), RegistrationState::Idle);
    }

    #[test]
    fn test_points_need_both_sets() {
        let mut helper = RegistrationHelper::new();
        helper.set_point_data(Some(PointSet::new(vec![[0.0; 3]])), None);
        assert!(!helper.uses_points());
        helper.set_point_data(
            Some(PointSet::new(vec![[0.0; 3]])),
            Some(PointSet::new(vec![[1.0; 3]])),
        );
        assert!(helper.uses_points());
    }

    #[test]
    fn test_parameter_source_detect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pp.txt");
        fs::write(&path, "(Transform \"EulerTransform\")").unwrap();

        let source = ParameterSource::detect(path.to_string_lossy());
        assert_eq!(source, ParameterSource::File(path.clone()));
        assert_eq!(source.resolve().unwrap(), "(Transform \"EulerTransform\")");

        let inline = ParameterSource::detect("(Transform \"BSplineTransform\")");
        assert!(matches!(inline, ParameterSource::Text(_)));

        let missing = ParameterSource::File(dir.path().join("absent.txt"));
        assert_eq!(missing.resolve().unwrap_err().code(), "ELX_009");
    }

    #[test]
    fn test_check_log_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("elastix.log");
        fs::write(&log, "Error in an early stage\nTotal time elapsed: 2s\n\n  \n").unwrap();
        assert!(check_log(&log, "elastix").is_ok());

        fs::write(&log, "Running\nitk::ExceptionObject\nError occurred during actual registration.\n\n").unwrap();
        let err = check_log(&log, "elastix").unwrap_err();
        assert_eq!(err.code(), "ELX_006");

        assert!(check_log(&dir.path().join("missing.log"), "elastix").is_ok());
    }

    #[test]
    fn test_write_chain_links() {
        let dir = tempfile::tempdir().unwrap();
        let chain = vec![
            "(InitialTransformParametersFileName \"x\")".to_string(),
            "(InitialTransformParametersFileName \"y\")".to_string(),
        ];
        let last = write_chain(dir.path(), &chain, &ChainRewrite::links_only()).unwrap();
        assert_eq!(last, dir.path().join("TransformParameters.1.txt"));
        let second = fs::read_to_string(&last).unwrap();
        assert!(second.contains(&*transform_parameters_path(dir.path(), 0).to_string_lossy()));

        let err = write_chain(dir.path(), &[], &ChainRewrite::links_only()).unwrap_err();
        assert_eq!(err.code(), "ELX_010");
    }

    #[test]
    fn test_symlink_reuses_nrrd_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.nrrd");
        nrrd::write(&source, &image(&[3, 3])).unwrap();
        let loaded = nrrd::read(&source).unwrap();

        let target = dir.path().join("moving.nrrd");
        symlink_or_write(&loaded, &target).unwrap();
        #[cfg(unix)]
        assert!(fs::symlink_metadata(&target).unwrap().file_type().is_symlink());

        // A single-slice volume needs conversion and is written instead.
        let volume = dir.path().join("volume.nrrd");
        nrrd::write(&volume, &image(&[3, 3, 1])).unwrap();
        let target = dir.path().join("fixed.nrrd");
        symlink_or_write(&nrrd::read(&volume).unwrap(), &target).unwrap();
        assert!(!fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
        assert_eq!(nrrd::read(&target).unwrap().dims(), &[3, 3]);
    }
}
