//! Default parameter files.
//!
//! Two presets cover the common slice-to-slice workflow: a rigid alignment
//! followed by an optional B-spline refinement.

use std::fmt;
use std::str::FromStr;

/// Named parameter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Euler transform, multi-resolution, Mattes mutual information.
    Rigid,
    /// B-spline transform on top of a prior rigid stage.
    Deformable,
}

impl Preset {
    /// All presets in the order a two-stage registration applies them.
    pub const ALL: [Preset; 2] = [Preset::Rigid, Preset::Deformable];

    /// Returns the preset name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Rigid => "rigid",
            Preset::Deformable => "deformable",
        }
    }

    /// Returns the parameter text of this preset.
    pub fn text(&self) -> String {
        match self {
            Preset::Rigid => rigid(),
            Preset::Deformable => deformable(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rigid" => Ok(Preset::Rigid),
            "deformable" | "bspline" => Ok(Preset::Deformable),
            other => Err(format!(
                "unknown preset '{}', expected one of: rigid, deformable",
                other
            )),
        }
    }
}

const RIGID: &str = r#"// Rigid registration
// ImageTypes
(FixedInternalImagePixelType "float")
(MovingInternalImagePixelType "float")
(UseDirectionCosines "true")

// Components
(Registration "MultiResolutionRegistration")
(FixedImagePyramid "FixedSmoothingImagePyramid")
(MovingImagePyramid "MovingSmoothingImagePyramid")
(Interpolator "BSplineInterpolator")
(Metric "AdvancedMattesMutualInformation")
(Optimizer "AdaptiveStochasticGradientDescent")
(ResampleInterpolator "FinalBSplineInterpolator")
(Resampler "DefaultResampler")
(Transform "EulerTransform")

// Transformation
(AutomaticTransformInitialization "true")
(AutomaticTransformInitializationMethod "CenterOfGravity")
(AutomaticScalesEstimation "true")
(HowToCombineTransforms "Compose")

// Pyramid
(NumberOfResolutions 4)

// Metric
(NumberOfHistogramBins 32)
(ErodeMask "false")

// Optimizer
(MaximumNumberOfIterations 250)

// Sampling
(NumberOfSpatialSamples 2048)
(NewSamplesEveryIteration "true")
(ImageSampler "RandomCoordinate")
(CheckNumberOfSamples "true")

// Interpolation and resampling
(BSplineInterpolationOrder 1)
(FinalBSplineInterpolationOrder 3)
(DefaultPixelValue 0)

// Output
(WriteResultImage "false")
(ResultImagePixelType "float")
(ResultImageFormat "nrrd")
(CompressResultImage "false")
"#;

const DEFORMABLE: &str = r#"// Deformable (B-spline) registration
// ImageTypes
(FixedInternalImagePixelType "float")
(MovingInternalImagePixelType "float")
(UseDirectionCosines "true")

// Components
(Registration "MultiResolutionRegistration")
(FixedImagePyramid "FixedSmoothingImagePyramid")
(MovingImagePyramid "MovingSmoothingImagePyramid")
(Interpolator "BSplineInterpolator")
(Metric "AdvancedMattesMutualInformation")
(Optimizer "AdaptiveStochasticGradientDescent")
(ResampleInterpolator "FinalBSplineInterpolator")
(Resampler "DefaultResampler")
(Transform "BSplineTransform")

// Transformation
(FinalGridSpacingInPhysicalUnits 20)
(GridSpacingSchedule 8.0 4.0 2.0 1.0)
(HowToCombineTransforms "Compose")

// Pyramid
(NumberOfResolutions 4)

// Metric
(NumberOfHistogramBins 32)
(ErodeMask "false")

// Optimizer
(MaximumNumberOfIterations 500)

// Sampling
(NumberOfSpatialSamples 2048)
(NewSamplesEveryIteration "true")
(ImageSampler "RandomCoordinate")
(CheckNumberOfSamples "true")

// Interpolation and resampling
(BSplineInterpolationOrder 1)
(FinalBSplineInterpolationOrder 3)
(DefaultPixelValue 0)

// Output
(WriteResultImage "false")
(ResultImagePixelType "float")
(ResultImageFormat "nrrd")
(CompressResultImage "false")
"#;

/// Returns the rigid preset parameter text.
pub fn rigid() -> String {
    RIGID.to_string()
}

/// Returns the deformable preset parameter text.
pub fn deformable() -> String {
    DEFORMABLE.to_string()
}
