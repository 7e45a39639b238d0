use std::collections::HashSet;

use crate::config::Config;
use crate::detector::BallDetector;
use crate::error::Error;
use crate::frame::Frame;
use crate::shot::{ShotStateMachine, ShotStats};
use crate::track::Track;
use crate::tracker::CentroidTracker;
use crate::trajectory::{TrajectoryAnalyzer, TrajectorySummary};
use crate::{Detect, ObjectId};

use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, trace};

/// End of run record, everything a report writer needs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub last_frame: Option<u64>,
    pub trajectories: Vec<TrajectorySummary>,
    /// absent when no hoop is configured
    pub shot_detection: Option<ShotStats>,
}

/// Runs detect -> track -> analyze -> shot update -> cleanup once per frame
pub struct BallAnalytics<D = BallDetector> {
    detector: D,
    tracker: CentroidTracker,
    trajectory: TrajectoryAnalyzer,
    shots: ShotStateMachine,
    process_width: Option<i32>,
    last_frame: Option<u64>,
    frames_processed: u64,
}

impl BallAnalytics<BallDetector> {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let detector = BallDetector::new(&config.detector)?;

        Ok(Self::assemble(config, detector))
    }
}

impl<D: Detect> BallAnalytics<D> {
    pub fn with_detector(config: &Config, detector: D) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::assemble(config, detector))
    }

    /// `config` must already be validated
    fn assemble(config: &Config, detector: D) -> Self {
        Self {
            detector,
            tracker: CentroidTracker::new(&config.tracker),
            trajectory: TrajectoryAnalyzer::new(&config.trajectory),
            shots: ShotStateMachine::new(config.shot.hoop_roi),
            process_width: config.process_width,
            last_frame: None,
            frames_processed: 0,
        }
    }

    #[inline]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    #[inline]
    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    #[inline]
    pub fn trajectory(&self) -> &TrajectoryAnalyzer {
        &self.trajectory
    }

    #[inline]
    pub fn shots(&self) -> &ShotStateMachine {
        &self.shots
    }

    /// The hoop may be picked once the first frame has been seen
    #[inline]
    pub fn shots_mut(&mut self) -> &mut ShotStateMachine {
        &mut self.shots
    }

    #[inline]
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Scales `frame` down (or up) to the processing width keeping its aspect ratio.
    /// Hoop coordinates are expected in the resized space.
    pub fn prepare(&self, frame: &Mat) -> Result<Option<Mat>, Error> {
        let width = match self.process_width {
            Some(width) if !frame.empty() && frame.cols() != width => width,
            _ => return Ok(None),
        };

        let scale = width as f64 / frame.cols() as f64;
        let height = ((frame.rows() as f64 * scale) as i32).max(1);

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            core::Size::new(width, height),
            0.0,
            0.0,
            imgproc::INTER_AREA,
        )?;

        Ok(Some(resized))
    }

    pub fn process_frame(&mut self, index: u64, frame: &Mat) -> Result<Frame, Error> {
        if let Some(last) = self.last_frame {
            if index <= last {
                return Err(Error::NonMonotonicFrame { last, got: index });
            }
        }

        let resized = self.prepare(frame)?;
        let frame = resized.as_ref().unwrap_or(frame);

        let detections = self.detector.detect(frame)?;

        let objects = self.tracker.update(&detections);
        self.trajectory.update(objects);
        self.shots.update(objects, &self.trajectory, index);

        let active: HashSet<ObjectId> = objects.keys().copied().collect();
        self.trajectory.cleanup(&active);
        self.shots.cleanup(&active);

        let objects = objects.iter().map(|(id, p)| (*id, *p)).collect();

        self.last_frame = Some(index);
        self.frames_processed += 1;

        trace!(
            frame = index,
            detections = detections.len(),
            tracked = active.len(),
            "frame processed"
        );

        if self.frames_processed % 100 == 0 {
            debug!(
                frames = self.frames_processed,
                taken = self.shots.shots_taken(),
                made = self.shots.shots_made(),
                "progress"
            );
        }

        Ok(Frame {
            index,
            dims: (frame.cols(), frame.rows()),
            detections,
            objects,
        })
    }

    /// Snapshot of every live identity
    pub fn tracks(&self) -> Vec<Track> {
        self.tracker
            .objects()
            .iter()
            .map(|(&id, p)| {
                let velocity = self.trajectory.get_velocity(id);
                let acceleration = self.trajectory.get_acceleration(id);

                Track {
                    track_id: id,
                    position: (p.x, p.y),
                    time_since_update: self.tracker.disappeared(id).unwrap_or(0),
                    velocity: (velocity.x, velocity.y),
                    acceleration: (acceleration.x, acceleration.y),
                    speed: self.trajectory.get_speed(id),
                    curvature: self
                        .trajectory
                        .fit_trajectory(id)
                        .and_then(|fit| fit.curvature())
                        .map(|a| a as f32),
                    shot_state: self.shots.state(id),
                }
            })
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames_processed: self.frames_processed,
            last_frame: self.last_frame,
            trajectories: self
                .trajectory
                .object_ids()
                .into_iter()
                .map(|id| self.trajectory.get_summary(id))
                .collect(),
            shot_detection: if self.shots.is_enabled() {
                Some(self.shots.stats())
            } else {
                None
            },
        }
    }
}
