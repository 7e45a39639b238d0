use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::shot::ShotState;
use crate::ObjectId;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Track {
    pub track_id: ObjectId,
    pub position: (f32, f32),
    pub time_since_update: u32,

    // in px per frame
    pub velocity: (f32, f32),
    pub acceleration: (f32, f32),
    pub speed: f32,

    // a-coeff of the parabola fitted to this track's trajectory
    pub curvature: Option<f32>,

    #[serde(skip)]
    pub shot_state: ShotState,
}

impl Track {
    #[inline]
    pub fn position(&self) -> na::Point2<f32> {
        na::Point2::new(self.position.0, self.position.1)
    }
}
