//! Point sets in the elastix text format.
//!
//! ```text
//! point
//! 3
//! 10.5 4 0
//! 12 8.25 0
//! 3 3 1
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ImageError, ImageResult};

/// Coordinate system of the listed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointKind {
    /// Physical coordinates.
    #[default]
    Point,
    /// Continuous voxel indices.
    Index,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Point => "point",
            PointKind::Index => "index",
        }
    }
}

/// Ordered list of landmarks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointSet {
    kind: PointKind,
    points: Vec<[f64; 3]>,
}

impl PointSet {
    /// Creates a set of physical points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self {
            kind: PointKind::Point,
            points,
        }
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: [f64; 3]) {
        self.points.push(point);
    }

    /// Renders the set with `dimension` coordinates per line (2 or 3).
    pub fn to_elastix_text(&self, dimension: usize) -> String {
        let dimension = dimension.clamp(1, 3);
        let mut out = String::new();
        out.push_str(&format!("{}\n{}\n", self.kind.as_str(), self.points.len()));
        for point in &self.points {
            let coords: Vec<String> = point[..dimension].iter().map(|c| c.to_string()).collect();
            out.push_str(&format!("{}\n", coords.join(" ")));
        }
        out
    }

    /// Writes the set to `path`.
    pub fn write(&self, path: impl AsRef<Path>, dimension: usize) -> ImageResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_elastix_text(dimension)).map_err(|source| ImageError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a point file.
    pub fn read(path: impl AsRef<Path>) -> ImageResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }
}

impl FromStr for PointSet {
    type Err = ImageError;

    /// Parses the elastix point format. The header keyword is optional and
    /// defaults to `point`; the declared count must match the listed points.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());

        let mut first = lines
            .next()
            .ok_or_else(|| ImageError::invalid_points("file is empty"))?;
        let kind = match first {
            "point" => Some(PointKind::Point),
            "index" => Some(PointKind::Index),
            _ => None,
        };
        if kind.is_some() {
            first = lines
                .next()
                .ok_or_else(|| ImageError::invalid_points("missing point count"))?;
        }
        let count: usize = first
            .parse()
            .map_err(|_| ImageError::invalid_points(format!("invalid point count '{}'", first)))?;

        let mut points = Vec::with_capacity(count);
        for (row, line) in lines.enumerate() {
            let coords = line
                .split_whitespace()
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ImageError::invalid_points(format!("line {}: '{}'", row + 1, line)))?;
            if coords.is_empty() || coords.len() > 3 {
                return Err(ImageError::invalid_points(format!(
                    "line {}: expected 1 to 3 coordinates, found {}",
                    row + 1,
                    coords.len()
                )));
            }
            let mut point = [0.0; 3];
            point[..coords.len()].copy_from_slice(&coords);
            points.push(point);
        }

        if points.len() != count {
            return Err(ImageError::invalid_points(format!(
                "header declares {} points, found {}",
                count,
                points.len()
            )));
        }

        Ok(Self {
            kind: kind.unwrap_or_default(),
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_format() {
        let set = PointSet::new(vec![[10.5, 4.0, 0.0], [12.0, 8.25, 1.0]]);
        assert_eq!(set.to_elastix_text(3), "point\n2\n10.5 4 0\n12 8.25 1\n");
        assert_eq!(set.to_elastix_text(2), "point\n2\n10.5 4\n12 8.25\n");

        let indices: PointSet = "index\n1\n7 -2.5\n".parse().unwrap();
        assert_eq!(indices.to_elastix_text(2), "index\n1\n7 -2.5\n");
        assert_eq!(PointSet::default().to_elastix_text(3), "point\n0\n");
    }

    #[test]
    fn test_parse_index_file() {
        let set: PointSet = "index\n2\n1 2\n3 4 5\n".parse().unwrap();
        assert_eq!(set.kind(), PointKind::Index);
        assert_eq!(set.points(), &[[1.0, 2.0, 0.0], [3.0, 4.0, 5.0]]);
    }

    #[test]
    fn test_count_mismatch() {
        let err = "point\n3\n1 2\n".parse::<PointSet>().unwrap_err();
        assert_eq!(err.code(), "IMAGE_011");
        assert!("point\n1\n1 x\n".parse::<PointSet>().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixedPoints.txt");
        let set = PointSet::new(vec![[1.0, 2.0, 3.0]]);
        set.write(&path, 3).unwrap();
        assert_eq!(PointSet::read(&path).unwrap(), set);
    }
}
