use nalgebra as na;

use crate::detection::Detection;
use crate::ObjectId;

/// What one processed frame produced
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub dims: (i32, i32),
    pub detections: Vec<Detection>,
    pub objects: Vec<(ObjectId, na::Point2<f32>)>,
}

impl Frame {
    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> Option<na::Point2<f32>> {
        self.objects
            .iter()
            .find(|(oid, _)| *oid == id)
            .map(|(_, p)| *p)
    }
}
