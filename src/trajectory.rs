use std::collections::{BTreeMap, HashMap, HashSet};

use crate::circular_queue::CircularQueue;
use crate::config::TrajectoryConfig;
use crate::math;
use crate::ObjectId;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Per-object motion record
#[derive(Debug, Clone, PartialEq)]
pub struct PositionHistory {
    pub positions: CircularQueue<na::Point2<f32>>,
    pub total_distance: f64,
    pub max_speed: f64,
    pub frame_count: u32,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: CircularQueue::with_capacity(capacity),
            total_distance: 0.0,
            max_speed: 0.0,
            frame_count: 0,
        }
    }

    pub fn push(&mut self, pos: na::Point2<f32>) {
        if let Some(last) = self.positions.top() {
            let speed = math::distance(last, &pos) as f64;
            self.total_distance += speed;

            if speed > self.max_speed {
                self.max_speed = speed;
            }
        }

        self.positions.push(pos);
        self.frame_count += 1;
    }
}

/// Fitted `y = p(x)`, coefficients from the highest power down
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Polynomial {
    pub coeffs: Vec<f64>,
}

impl Polynomial {
    #[inline]
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, c| acc * x + c)
    }

    /// Leading coefficient of a parabola, `None` for other degrees
    pub fn curvature(&self) -> Option<f64> {
        if self.degree() == 2 {
            self.coeffs.first().copied()
        } else {
            None
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrajectorySummary {
    pub object_id: ObjectId,
    pub frames_tracked: u32,
    pub total_distance_px: f64,
    pub avg_speed_px_per_frame: f64,
    pub max_speed_px_per_frame: f64,
    pub positions_in_buffer: usize,
}

#[derive(Debug, Clone)]
pub struct TrajectoryAnalyzer {
    config: TrajectoryConfig,
    histories: HashMap<ObjectId, PositionHistory>,
}

impl TrajectoryAnalyzer {
    pub fn new(config: &TrajectoryConfig) -> Self {
        Self {
            config: config.clone(),
            histories: HashMap::new(),
        }
    }

    pub fn update(&mut self, objects: &BTreeMap<ObjectId, na::Point2<f32>>) {
        let capacity = self.config.history_length;

        for (id, pos) in objects {
            self.histories
                .entry(*id)
                .or_insert_with(|| PositionHistory::new(capacity))
                .push(*pos);
        }
    }

    #[inline]
    pub fn history(&self, id: ObjectId) -> Option<&PositionHistory> {
        self.histories.get(&id)
    }

    /// Ids with recorded history, ascending
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.histories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn get_velocity(&self, id: ObjectId) -> na::Vector2<f32> {
        match self.last_two(id) {
            Some((prev, last)) => math::displacement(prev, last),
            None => na::Vector2::zeros(),
        }
    }

    pub fn get_speed(&self, id: ObjectId) -> f32 {
        match self.last_two(id) {
            Some((prev, last)) => math::distance(prev, last),
            None => 0.0,
        }
    }

    /// Second difference over the last three positions
    pub fn get_acceleration(&self, id: ObjectId) -> na::Vector2<f32> {
        let positions = match self.histories.get(&id) {
            Some(h) => &h.positions,
            None => return na::Vector2::zeros(),
        };

        match (
            positions.nth_newest(0),
            positions.nth_newest(1),
            positions.nth_newest(2),
        ) {
            (Some(p2), Some(p1), Some(p0)) => p2.coords - p1.coords * 2.0 + p0.coords,
            _ => na::Vector2::zeros(),
        }
    }

    /// Buffered positions, oldest first
    pub fn get_trail_points(&self, id: ObjectId) -> Vec<na::Point2<f32>> {
        self.histories
            .get(&id)
            .map(|h| h.positions.asc_iter().copied().collect())
            .unwrap_or_default()
    }

    /// Least squares fit of `y` over `x` across the buffered positions.
    ///
    /// `None` means "not fittable yet": fewer than three points, nearly
    /// vertical motion (x range under a pixel) or a degenerate system.
    pub fn fit_trajectory(&self, id: ObjectId) -> Option<Polynomial> {
        let positions = &self.histories.get(&id)?.positions;
        if positions.len() < 3 {
            return None;
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = positions
            .asc_iter()
            .map(|p| (p.x as f64, p.y as f64))
            .unzip();

        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max_x - min_x < 1.0 {
            return None;
        }

        let coeffs = math::polynomial_ls(
            &na::DVector::from_vec(xs),
            &na::DVector::from_vec(ys),
            self.config.polyfit_degree,
        )?;

        Some(Polynomial {
            coeffs: coeffs.iter().copied().collect(),
        })
    }

    pub fn get_summary(&self, id: ObjectId) -> TrajectorySummary {
        let (frames, total, max_speed, buffered) = match self.histories.get(&id) {
            Some(h) => (
                h.frame_count,
                h.total_distance,
                h.max_speed,
                h.positions.len(),
            ),
            None => (0, 0.0, 0.0, 0),
        };

        TrajectorySummary {
            object_id: id,
            frames_tracked: frames,
            total_distance_px: total,
            avg_speed_px_per_frame: if frames > 1 { total / frames as f64 } else { 0.0 },
            max_speed_px_per_frame: max_speed,
            positions_in_buffer: buffered,
        }
    }

    /// Drops everything recorded for ids missing from `active_ids`
    pub fn cleanup(&mut self, active_ids: &HashSet<ObjectId>) {
        self.histories.retain(|id, _| active_ids.contains(id));
    }

    fn last_two(&self, id: ObjectId) -> Option<(&na::Point2<f32>, &na::Point2<f32>)> {
        let positions = &self.histories.get(&id)?.positions;

        Some((positions.nth_newest(1)?, positions.nth_newest(0)?))
    }
}
