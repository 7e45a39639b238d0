use crate::config::DetectorConfig;
use crate::detection::{Detection, DetectionMethod};
use crate::error::Error;
use crate::math;

use opencv::{
    core::{self, Mat, Vector},
    imgproc,
    prelude::*,
};
use tracing::trace;

const HOUGH_CONFIDENCE: f32 = 0.5;

/// Color mask -> contour filter -> hough circles -> fusion
pub struct BallDetector {
    config: DetectorConfig,
    kernel: Mat,
}

impl BallDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self, Error> {
        let size = config.morph_kernel_size;
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            core::Size::new(size, size),
            core::Point::new(-1, -1),
        )?;

        Ok(Self {
            config: config.clone(),
            kernel,
        })
    }

    #[inline]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn check_frame(frame: &Mat) -> Result<(), Error> {
        let reason = if frame.empty() {
            "empty buffer".to_string()
        } else if frame.channels() != 3 {
            format!("expected 3 channels, got {}", frame.channels())
        } else if frame.depth() != core::CV_8U {
            format!("expected 8-bit channels, got depth {}", frame.depth())
        } else {
            return Ok(());
        };

        Err(Error::InvalidFrame { reason })
    }

    /// Binary-ish mask of the pixels within the configured HSV range
    pub fn color_mask(&self, frame: &Mat) -> Result<Mat, Error> {
        Self::check_frame(frame)?;

        let mut hsv = Mat::default();
        imgproc::cvt_color(frame, &mut hsv, imgproc::COLOR_BGR2HSV, 0)?;

        let [lh, ls, lv] = self.config.hsv_lower;
        let [uh, us, uv] = self.config.hsv_upper;
        let lower = core::Scalar::new(lh as f64, ls as f64, lv as f64, 0.0);
        let upper = core::Scalar::new(uh as f64, us as f64, uv as f64, 0.0);

        let mut mask = Mat::default();
        core::in_range(&hsv, &lower, &upper, &mut mask)?;

        let blur = self.config.blur_kernel_size;
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            &mask,
            &mut blurred,
            core::Size::new(blur, blur),
            0.0,
            0.0,
            core::BORDER_DEFAULT,
        )?;

        let anchor = core::Point::new(-1, -1);
        let border_value = imgproc::morphology_default_border_value()?;

        let mut closed = Mat::default();
        imgproc::morphology_ex(
            &blurred,
            &mut closed,
            imgproc::MORPH_CLOSE,
            &self.kernel,
            anchor,
            self.config.morph_close_iterations,
            core::BORDER_CONSTANT,
            border_value,
        )?;

        let mut opened = Mat::default();
        imgproc::morphology_ex(
            &closed,
            &mut opened,
            imgproc::MORPH_OPEN,
            &self.kernel,
            anchor,
            self.config.morph_open_iterations,
            core::BORDER_CONSTANT,
            border_value,
        )?;

        Ok(opened)
    }

    pub fn contour_candidates(&self, mask: &Mat) -> Result<Vec<Detection>, Error> {
        let mut contours = Vector::<Vector<core::Point>>::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            core::Point::new(0, 0),
        )?;

        let min_area = self.config.min_contour_area;
        let mut detections = Vec::new();

        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area < min_area {
                continue;
            }

            let perimeter = imgproc::arc_length(&contour, true)?;
            let circularity = math::circularity(area, perimeter);
            if circularity < self.config.min_circularity {
                continue;
            }

            let mut center = core::Point2f::default();
            let mut radius = 0.0f32;
            imgproc::min_enclosing_circle(&contour, &mut center, &mut radius)?;

            if radius < self.config.min_radius || radius > self.config.max_radius {
                continue;
            }

            let size_score = if min_area > 0.0 {
                (area / (min_area * 10.0)).min(1.0)
            } else {
                1.0
            };

            detections.push(Detection::new(
                center.x.trunc(),
                center.y.trunc(),
                radius,
                (circularity.min(1.0) * size_score) as f32,
                DetectionMethod::Contour,
            ));
        }

        Ok(detections)
    }

    pub fn hough_candidates(&self, mask: &Mat) -> Result<Vec<Detection>, Error> {
        let mut circles = Vector::<core::Vec3f>::new();
        imgproc::hough_circles(
            mask,
            &mut circles,
            imgproc::HOUGH_GRADIENT,
            self.config.hough_dp,
            self.config.hough_min_dist,
            self.config.hough_param1,
            self.config.hough_param2,
            self.config.hough_min_radius,
            self.config.hough_max_radius,
        )?;

        Ok(circles
            .iter()
            .map(|c| {
                Detection::new(
                    c[0].round(),
                    c[1].round(),
                    c[2].round(),
                    HOUGH_CONFIDENCE,
                    DetectionMethod::Hough,
                )
            })
            .collect())
    }

    pub fn detect(&self, frame: &Mat) -> Result<Vec<Detection>, Error> {
        let mask = self.color_mask(frame)?;
        let contour_dets = self.contour_candidates(&mask)?;
        let hough_dets = self.hough_candidates(&mask)?;

        trace!(
            contours = contour_dets.len(),
            circles = hough_dets.len(),
            "ball candidates"
        );

        Ok(fuse_detections(
            contour_dets,
            hough_dets,
            self.config.fusion_distance,
        ))
    }
}

impl crate::Detect for BallDetector {
    #[inline]
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, Error> {
        BallDetector::detect(self, frame)
    }
}

/// Greedy, order dependent matching of contour candidates against hough
/// circles. Each contour candidate takes the nearest unused circle closer
/// than `max_distance`; leftover circles are appended at the end.
pub fn fuse_detections(
    contour_dets: Vec<Detection>,
    hough_dets: Vec<Detection>,
    max_distance: f32,
) -> Vec<Detection> {
    if hough_dets.is_empty() {
        return contour_dets;
    }

    if contour_dets.is_empty() {
        return hough_dets;
    }

    let mut used = vec![false; hough_dets.len()];
    let mut fused = Vec::with_capacity(contour_dets.len() + hough_dets.len());

    for c_det in contour_dets {
        let mut best_match = None;
        let mut best_dist = max_distance;

        for (idx, h_det) in hough_dets.iter().enumerate() {
            if used[idx] {
                continue;
            }

            let dist = c_det.distance(h_det);
            if dist < best_dist {
                best_dist = dist;
                best_match = Some(idx);
            }
        }

        match best_match {
            Some(idx) => {
                used[idx] = true;
                fused.push(c_det.fuse(&hough_dets[idx]));
            }
            None => fused.push(c_det),
        }
    }

    fused.extend(
        hough_dets
            .into_iter()
            .zip(used)
            .filter_map(|(det, used)| if used { None } else { Some(det) }),
    );

    fused
}
