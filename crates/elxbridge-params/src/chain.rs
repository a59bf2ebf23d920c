//! Rewrites applied to registration parameters and transform chains.

use std::path::{Path, PathBuf};

use crate::edit::{quoted, replace};

/// Marker string for the first link of a chain.
pub const NO_INITIAL_TRANSFORM: &str = "NoInitialTransform";

/// Adds the corresponding-points distance term to a registration parameter
/// text, turning it into a multi-metric registration.
pub fn inject_point_metric(text: &mut String) {
    let registration = if text.contains("MultiResolution") {
        "MultiMetricMultiResolutionRegistration"
    } else {
        "MultiMetricRegistration"
    };
    replace(text, "Registration", &quoted(registration));
    replace(
        text,
        "Metric",
        "\"AdvancedMattesMutualInformation\" \"CorrespondingPointsEuclideanDistanceMetric\"",
    );
}

/// Output options applied to each link of a transform chain before it is
/// handed to transformix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRewrite {
    /// Result pixel type name (`"float"`, `"short"`, ...). `None` keeps the
    /// value stored in the chain.
    pub pixel_type: Option<String>,
    /// Whether the requested pixel type is an integer type, which selects
    /// nearest-neighbor resampling.
    pub integer_pixels: bool,
    /// B-spline order used for non-integer resampling.
    pub interpolation_order: u8,
}

impl Default for ChainRewrite {
    fn default() -> Self {
        Self {
            pixel_type: None,
            integer_pixels: false,
            interpolation_order: 3,
        }
    }
}

impl ChainRewrite {
    /// Creates a rewrite that only fixes up back-references and the output
    /// format.
    pub fn links_only() -> Self {
        Self::default()
    }

    /// Creates a rewrite for the given result pixel type.
    pub fn for_pixel_type(
        pixel_type: impl Into<String>,
        integer_pixels: bool,
        interpolation_order: u8,
    ) -> Self {
        Self {
            pixel_type: Some(pixel_type.into()),
            integer_pixels,
            interpolation_order,
        }
    }

    /// Rewrites link `index` of a chain whose files live in `directory`.
    pub fn apply(&self, text: &mut String, index: usize, directory: &Path) {
        if let Some(ref pixel_type) = self.pixel_type {
            replace(text, "ResultImagePixelType", &quoted(pixel_type));
            if self.integer_pixels {
                replace(
                    text,
                    "ResampleInterpolator",
                    &quoted("FinalNearestNeighborInterpolator"),
                );
            } else {
                replace(
                    text,
                    "ResampleInterpolator",
                    &quoted("FinalBSplineInterpolatorFloat"),
                );
                replace(
                    text,
                    "FinalBSplineInterpolationOrder",
                    &self.interpolation_order.to_string(),
                );
            }
        }

        replace(text, "ResultImageFormat", &quoted("nrrd"));
        replace(text, "CompressResultImage", &quoted("false"));

        let initial = if index == 0 {
            NO_INITIAL_TRANSFORM.to_string()
        } else {
            transform_parameters_path(directory, index - 1)
                .to_string_lossy()
                .into_owned()
        };
        replace(text, "InitialTransformParametersFileName", &quoted(&initial));
    }

    /// Rewrites a whole chain for `directory`, returning the new texts.
    pub fn apply_chain(&self, chain: &[String], directory: &Path) -> Vec<String> {
        chain
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let mut link = link.clone();
                self.apply(&mut link, i, directory);
                link
            })
            .collect()
    }
}

/// Path of chain link `index` inside `directory`.
pub fn transform_parameters_path(directory: &Path, index: usize) -> PathBuf {
    directory.join(format!("TransformParameters.{}.txt", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::get_value;
    use crate::presets::{deformable, rigid};
    use pretty_assertions::assert_eq;

    fn value(text: &str, key: &str) -> Vec<String> {
        get_value(text, key).unwrap_or_default()
    }

    #[test]
    fn test_inject_point_metric_multi_resolution() {
        let mut text = rigid();
        inject_point_metric(&mut text);
        assert_eq!(
            value(&text, "Registration"),
            vec!["MultiMetricMultiResolutionRegistration"]
        );
        assert_eq!(
            value(&text, "Metric"),
            vec![
                "AdvancedMattesMutualInformation",
                "CorrespondingPointsEuclideanDistanceMetric"
            ]
        );
    }

    #[test]
    fn test_inject_point_metric_single_resolution() {
        let mut text = "(Registration \"Single\")\n(Metric \"AdvancedMeanSquares\")\n".to_string();
        inject_point_metric(&mut text);
        assert_eq!(value(&text, "Registration"), vec!["MultiMetricRegistration"]);
    }

    #[test]
    fn test_rewrite_integer_pixels() {
        let mut text = deformable();
        let rewrite = ChainRewrite::for_pixel_type("short", true, 3);
        rewrite.apply(&mut text, 0, Path::new("/work"));
        assert_eq!(value(&text, "ResultImagePixelType"), vec!["short"]);
        assert_eq!(
            value(&text, "ResampleInterpolator"),
            vec!["FinalNearestNeighborInterpolator"]
        );
        assert_eq!(
            value(&text, "InitialTransformParametersFileName"),
            vec![NO_INITIAL_TRANSFORM]
        );
    }

    #[test]
    fn test_rewrite_float_pixels_sets_order() {
        let mut text = rigid();
        let rewrite = ChainRewrite::for_pixel_type("float", false, 1);
        rewrite.apply(&mut text, 0, Path::new("/work"));
        assert_eq!(
            value(&text, "ResampleInterpolator"),
            vec!["FinalBSplineInterpolatorFloat"]
        );
        assert_eq!(value(&text, "FinalBSplineInterpolationOrder"), vec!["1"]);
    }

    #[test]
    fn test_chain_back_references() {
        let chain = vec![rigid(), deformable()];
        let dir = Path::new("/work");
        let rewritten = ChainRewrite::links_only().apply_chain(&chain, dir);
        assert_eq!(rewritten.len(), 2);
        assert_eq!(
            value(&rewritten[1], "InitialTransformParametersFileName"),
            vec![transform_parameters_path(dir, 0).to_string_lossy().into_owned()]
        );
        // Pixel type untouched when none requested.
        assert_eq!(value(&rewritten[1], "ResultImagePixelType"), vec!["float"]);
    }
}
