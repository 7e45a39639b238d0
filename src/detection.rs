use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Contour,
    Hough,
    Fused,
}

/// Ball candidate: (x,y) of the center, radius and confidence in [0, 1]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub confidence: f32,
    pub method: DetectionMethod,
}

impl Detection {
    pub fn new(x: f32, y: f32, radius: f32, confidence: f32, method: DetectionMethod) -> Self {
        Self {
            x,
            y,
            radius,
            confidence,
            method,
        }
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, other: &Detection) -> f32 {
        na::distance(&self.center(), &other.center())
    }

    /// Merges a contour candidate with the hough circle found around it
    pub fn fuse(&self, other: &Detection) -> Detection {
        Detection {
            x: ((self.x + other.x) / 2.0).trunc(),
            y: ((self.y + other.y) / 2.0).trunc(),
            radius: (self.radius + other.radius) / 2.0,
            confidence: (self.confidence + 0.3).min(1.0),
            method: DetectionMethod::Fused,
        }
    }
}
