use std::collections::BTreeMap;

use crate::config::TrackerConfig;
use crate::{Detection, ObjectId};

use nalgebra as na;
use ndarray::Array2;
use tracing::debug;

/// Identity preserving centroid tracker.
///
/// Ids are allocated monotonically, so the id-ordered map is also the
/// registration order.
#[derive(Debug, Clone)]
pub struct CentroidTracker {
    config: TrackerConfig,
    next_id: ObjectId,
    objects: BTreeMap<ObjectId, na::Point2<f32>>,
    disappeared: BTreeMap<ObjectId, u32>,
}

impl CentroidTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            next_id: 0,
            objects: BTreeMap::new(),
            disappeared: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn objects(&self) -> &BTreeMap<ObjectId, na::Point2<f32>> {
        &self.objects
    }

    /// Consecutive unmatched frames, `None` for unknown ids
    #[inline]
    pub fn disappeared(&self, id: ObjectId) -> Option<u32> {
        self.disappeared.get(&id).copied()
    }

    #[inline]
    pub fn next_id(&self) -> ObjectId {
        self.next_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn register(&mut self, centroid: na::Point2<f32>) {
        let id = self.next_id;
        self.objects.insert(id, centroid);
        self.disappeared.insert(id, 0);
        self.next_id += 1;

        debug!(id, x = centroid.x, y = centroid.y, "registered object");
    }

    fn deregister(&mut self, id: ObjectId) {
        self.objects.remove(&id);
        self.disappeared.remove(&id);

        debug!(id, "deregistered object");
    }

    fn mark_missing(&mut self, id: ObjectId) {
        let count = match self.disappeared.get_mut(&id) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => return,
        };

        if count > self.config.max_disappeared {
            self.deregister(id);
        }
    }

    pub fn update(&mut self, detections: &[Detection]) -> &BTreeMap<ObjectId, na::Point2<f32>> {
        let input: Vec<na::Point2<f32>> = detections.iter().map(Detection::center).collect();

        if input.is_empty() {
            let ids: Vec<ObjectId> = self.disappeared.keys().copied().collect();
            for id in ids {
                self.mark_missing(id);
            }

            return &self.objects;
        }

        if self.objects.is_empty() {
            for centroid in input {
                self.register(centroid);
            }

            return &self.objects;
        }

        let (object_ids, existing): (Vec<ObjectId>, Vec<na::Point2<f32>>) =
            self.objects.iter().map(|(id, p)| (*id, *p)).unzip();

        let dist = Array2::from_shape_fn((existing.len(), input.len()), |(r, c)| {
            na::distance(&existing[r], &input[c])
        });

        let mut pairs: Vec<(usize, usize)> = (0..existing.len())
            .flat_map(|r| (0..input.len()).map(move |c| (r, c)))
            .collect();

        // stable: equal distances keep row-major order
        pairs.sort_by(|a, b| dist[*a].total_cmp(&dist[*b]));

        let mut used_rows = vec![false; existing.len()];
        let mut used_cols = vec![false; input.len()];

        for (row, col) in pairs {
            if used_rows[row] || used_cols[col] {
                continue;
            }

            if dist[(row, col)] > self.config.max_distance {
                break;
            }

            let id = object_ids[row];
            self.objects.insert(id, input[col]);
            self.disappeared.insert(id, 0);

            used_rows[row] = true;
            used_cols[col] = true;
        }

        for (row, id) in object_ids.iter().enumerate() {
            if !used_rows[row] {
                self.mark_missing(*id);
            }
        }

        for (col, centroid) in input.into_iter().enumerate() {
            if !used_cols[col] {
                self.register(centroid);
            }
        }

        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionMethod;

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(x, y, 15.0, 0.8, DetectionMethod::Contour)
    }

    fn tracker(max_disappeared: u32, max_distance: f32) -> CentroidTracker {
        CentroidTracker::new(&TrackerConfig {
            max_disappeared,
            max_distance,
        })
    }

    #[test]
    fn registers_in_input_order() {
        let mut t = tracker(5, 100.0);
        let objects = t.update(&[det(10.0, 10.0), det(300.0, 10.0), det(10.0, 300.0)]);

        let ids: Vec<_> = objects.keys().copied().collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(objects[&1], na::Point2::new(300.0, 10.0));
        assert_eq!(t.next_id(), 3);
    }

    #[test]
    fn reassociates_nearby_detection() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(100.0, 100.0)]);
        let objects = t.update(&[det(130.0, 140.0)]);

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[&0], na::Point2::new(130.0, 140.0));
        assert_eq!(t.disappeared(0), Some(0));
    }

    #[test]
    fn far_detection_registers_new_identity() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(0.0, 0.0)]);
        let objects = t.update(&[det(500.0, 500.0)]);

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[&0], na::Point2::new(0.0, 0.0));
        assert_eq!(objects[&1], na::Point2::new(500.0, 500.0));
        assert_eq!(t.disappeared(0), Some(1));
    }

    #[test]
    fn match_exactly_at_max_distance_is_accepted() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(0.0, 0.0)]);

        let objects = t.update(&[det(60.0, 80.0)]);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[&0], na::Point2::new(60.0, 80.0));
        assert_eq!(t.next_id(), 1);
    }

    #[test]
    fn match_just_past_max_distance_is_rejected() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(0.0, 0.0)]);

        let objects = t.update(&[det(100.5, 0.0)]);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[&0], na::Point2::new(0.0, 0.0));
        assert_eq!(objects[&1], na::Point2::new(100.5, 0.0));
        assert_eq!(t.disappeared(0), Some(1));
    }

    #[test]
    fn closest_pairs_are_taken_first() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(0.0, 0.0), det(50.0, 0.0)]);

        // (48, 0) is closest to id 1, leaving (10, 0) for id 0
        let objects = t.update(&[det(10.0, 0.0), det(48.0, 0.0)]);

        assert_eq!(objects[&0], na::Point2::new(10.0, 0.0));
        assert_eq!(objects[&1], na::Point2::new(48.0, 0.0));
    }

    #[test]
    fn equal_distances_resolve_in_enumeration_order() {
        let mut t = tracker(5, 100.0);
        t.update(&[det(0.0, 0.0), det(20.0, 0.0)]);

        // both existing objects are 10px from the only detection
        let objects = t.update(&[det(10.0, 0.0)]);

        assert_eq!(objects[&0], na::Point2::new(10.0, 0.0));
        assert_eq!(objects[&1], na::Point2::new(20.0, 0.0));
        assert_eq!(t.disappeared(1), Some(1));
    }

    #[test]
    fn deregisters_after_max_disappeared() {
        let mut t = tracker(3, 100.0);
        t.update(&[det(0.0, 0.0)]);

        for _ in 0..3 {
            t.update(&[]);
        }
        assert_eq!(t.disappeared(0), Some(3));
        assert_eq!(t.len(), 1);

        t.update(&[]);
        assert!(t.is_empty());
        assert_eq!(t.disappeared(0), None);
    }

    #[test]
    fn unmatched_objects_also_expire_when_others_match() {
        let mut t = tracker(0, 100.0);
        t.update(&[det(0.0, 0.0), det(400.0, 0.0)]);

        let objects = t.update(&[det(5.0, 0.0)]);

        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut t = tracker(0, 100.0);
        t.update(&[det(0.0, 0.0)]);
        t.update(&[]);
        assert!(t.is_empty());

        let objects = t.update(&[det(0.0, 0.0)]);
        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn queries_do_not_create_entries() {
        let t = tracker(3, 100.0);

        assert_eq!(t.disappeared(42), None);
        assert!(t.objects().is_empty());
    }
}
