//! Node geometry
//!
//! Geometry is advisory: it positions overlay highlights and nothing else.
//! A node whose measurement fails or comes back incomplete is dropped from
//! the cycle's output, never retried.

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use super::errors::MeasureResult;

/// Geometry as reported by the host; any field may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawGeometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl RawGeometry {
    /// Fully populated geometry
    pub fn complete(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Usable geometry, if every field is present and finite and the box
    /// has a positive area
    pub fn resolve(&self) -> Option<Geometry> {
        let (x, y, width, height) = (self.x?, self.y?, self.width?, self.height?);
        let finite = [x, y, width, height].iter().all(|v| v.is_finite());
        if finite && width > 0.0 && height > 0.0 {
            Some(Geometry { x, y, width, height })
        } else {
            None
        }
    }
}

/// Measured on-screen box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Asynchronous geometry measurement
///
/// One request per node; the pipeline joins every outstanding request
/// before it resumes.
pub trait GeometryProvider<N> {
    fn measure(&self, node: &N) -> LocalBoxFuture<'static, MeasureResult<RawGeometry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_complete_positive_box() {
        assert!(RawGeometry::complete(0.0, 0.0, 10.0, 10.0).resolve().is_some());
        assert!(RawGeometry::complete(0.0, 0.0, 0.0, 10.0).resolve().is_none());
        assert!(RawGeometry::complete(f64::NAN, 0.0, 10.0, 10.0).resolve().is_none());

        let partial = RawGeometry {
            width: None,
            ..RawGeometry::complete(1.0, 2.0, 3.0, 4.0)
        };
        assert!(partial.resolve().is_none());
        assert!(RawGeometry::default().resolve().is_none());
    }
}
