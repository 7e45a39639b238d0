use std::collections::{BTreeMap, HashMap, HashSet};

use crate::trajectory::TrajectoryAnalyzer;
use crate::ObjectId;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info};

/// Hoop region in processing-frame pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct HoopRoi {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl HoopRoi {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline(always)]
    fn within_columns(&self, p: &na::Point2<f32>) -> bool {
        self.x <= p.x && p.x <= self.x + self.width
    }

    #[inline]
    pub fn is_above(&self, p: &na::Point2<f32>) -> bool {
        self.within_columns(p) && p.y < self.y
    }

    #[inline]
    pub fn is_inside(&self, p: &na::Point2<f32>) -> bool {
        self.within_columns(p) && self.y <= p.y && p.y <= self.y + self.height
    }

    #[inline]
    pub fn is_below(&self, p: &na::Point2<f32>) -> bool {
        p.y > self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShotState {
    #[default]
    Idle,
    AboveHoop,
    InHoop,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShotOutcome {
    Scored,
    Missed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShotLogEntry {
    pub frame: u64,
    pub object_id: ObjectId,
    pub result: ShotOutcome,
    pub position: (f32, f32),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShotStats {
    pub shots_taken: u32,
    pub shots_made: u32,
    pub shooting_percentage: f32,
    pub shot_log: Vec<ShotLogEntry>,
}

/// Per-object shot classifier against the hoop region.
///
/// IDLE -> ABOVE_HOOP when the ball is above the hoop, ABOVE_HOOP -> IN_HOOP
/// when it enters moving down, IN_HOOP -> IDLE once it leaves: through the
/// bottom it is a make, any other exit is a miss.
#[derive(Debug, Clone)]
pub struct ShotStateMachine {
    hoop: Option<HoopRoi>,
    states: HashMap<ObjectId, ShotState>,
    shots_taken: u32,
    shots_made: u32,
    shot_log: Vec<ShotLogEntry>,
    last_result: Option<(ShotOutcome, u64)>,
}

impl ShotStateMachine {
    pub fn new(hoop: Option<HoopRoi>) -> Self {
        Self {
            hoop,
            states: HashMap::new(),
            shots_taken: 0,
            shots_made: 0,
            shot_log: Vec::new(),
            last_result: None,
        }
    }

    pub fn set_hoop_roi(&mut self, hoop: Option<HoopRoi>) {
        self.hoop = hoop;
    }

    #[inline]
    pub fn hoop_roi(&self) -> Option<&HoopRoi> {
        self.hoop.as_ref()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.hoop.is_some()
    }

    #[inline]
    pub fn state(&self, id: ObjectId) -> ShotState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    #[inline]
    pub fn shots_taken(&self) -> u32 {
        self.shots_taken
    }

    #[inline]
    pub fn shots_made(&self) -> u32 {
        self.shots_made
    }

    #[inline]
    pub fn shot_log(&self) -> &[ShotLogEntry] {
        &self.shot_log
    }

    pub fn shooting_percentage(&self) -> f32 {
        if self.shots_taken == 0 {
            return 0.0;
        }

        self.shots_made as f32 / self.shots_taken as f32 * 100.0
    }

    pub fn update(
        &mut self,
        objects: &BTreeMap<ObjectId, na::Point2<f32>>,
        trajectory: &TrajectoryAnalyzer,
        frame: u64,
    ) {
        let hoop = match self.hoop {
            Some(hoop) => hoop,
            None => return,
        };

        for (&id, pos) in objects {
            let state = self.state(id);

            let next = match state {
                ShotState::Idle if hoop.is_above(pos) => ShotState::AboveHoop,
                ShotState::Idle => continue,
                ShotState::AboveHoop => {
                    if hoop.is_inside(pos) && trajectory.get_velocity(id).y > 0.0 {
                        ShotState::InHoop
                    } else if !hoop.is_above(pos) && !hoop.is_inside(pos) {
                        ShotState::Idle
                    } else {
                        continue;
                    }
                }
                ShotState::InHoop => {
                    if hoop.is_below(pos) {
                        self.record(id, pos, ShotOutcome::Scored, frame);
                        ShotState::Idle
                    } else if !hoop.is_inside(pos) {
                        self.record(id, pos, ShotOutcome::Missed, frame);
                        ShotState::Idle
                    } else {
                        continue;
                    }
                }
            };

            debug!(id, frame, from = ?state, to = ?next, "shot state");
            self.states.insert(id, next);
        }
    }

    fn record(&mut self, id: ObjectId, pos: &na::Point2<f32>, result: ShotOutcome, frame: u64) {
        self.shots_taken += 1;
        if result == ShotOutcome::Scored {
            self.shots_made += 1;
        }

        self.last_result = Some((result, frame));
        self.shot_log.push(ShotLogEntry {
            frame,
            object_id: id,
            result,
            position: (pos.x, pos.y),
        });

        info!(
            id,
            frame,
            ?result,
            taken = self.shots_taken,
            made = self.shots_made,
            "shot finished"
        );
    }

    /// Last shot outcome and its age in frames, if not older than `flash_duration`
    pub fn get_recent_shot_result(
        &self,
        frame: u64,
        flash_duration: u64,
    ) -> Option<(ShotOutcome, u64)> {
        let (result, shot_frame) = self.last_result?;
        let age = frame.saturating_sub(shot_frame);

        if age <= flash_duration {
            Some((result, age))
        } else {
            None
        }
    }

    pub fn stats(&self) -> ShotStats {
        ShotStats {
            shots_taken: self.shots_taken,
            shots_made: self.shots_made,
            shooting_percentage: self.shooting_percentage(),
            shot_log: self.shot_log.clone(),
        }
    }

    pub fn cleanup(&mut self, active_ids: &HashSet<ObjectId>) {
        self.states.retain(|id, _| active_ids.contains(id));
    }
}
