use serde_derive::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;
use crate::shot::HoopRoi;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// HSV bounds of the ball color, OpenCV ranges (H in 0..180)
    pub hsv_lower: [u8; 3],
    pub hsv_upper: [u8; 3],

    pub min_radius: f32,
    pub max_radius: f32,
    pub min_contour_area: f64,
    pub min_circularity: f64,

    pub morph_kernel_size: i32,
    pub morph_close_iterations: i32,
    pub morph_open_iterations: i32,
    pub blur_kernel_size: i32,

    pub hough_dp: f64,
    pub hough_min_dist: f64,
    pub hough_param1: f64,
    pub hough_param2: f64,
    pub hough_min_radius: i32,
    pub hough_max_radius: i32,

    /// contour and hough candidates closer than this are fused
    pub fusion_distance: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [5, 100, 100],
            hsv_upper: [25, 255, 255],
            min_radius: 10.0,
            max_radius: 80.0,
            min_contour_area: 300.0,
            min_circularity: 0.5,
            morph_kernel_size: 5,
            morph_close_iterations: 3,
            morph_open_iterations: 2,
            blur_kernel_size: 11,
            hough_dp: 1.2,
            hough_min_dist: 50.0,
            hough_param1: 100.0,
            hough_param2: 30.0,
            hough_min_radius: 10,
            hough_max_radius: 80,
            fusion_distance: 30.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_disappeared: u32,
    pub max_distance: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_disappeared: 15,
            max_distance: 100.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub history_length: usize,
    pub polyfit_degree: usize,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            history_length: 64,
            polyfit_degree: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ShotConfig {
    /// no roi, no shot detection
    pub hoop_roi: Option<HoopRoi>,
    pub flash_duration: u64,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            hoop_roi: None,
            flash_duration: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub trajectory: TrajectoryConfig,
    pub shot: ShotConfig,

    /// frames are resized to this width before processing, `None` keeps them as is
    pub process_width: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            tracker: TrackerConfig::default(),
            trajectory: TrajectoryConfig::default(),
            shot: ShotConfig::default(),
            process_width: Some(960),
        }
    }
}

impl Config {
    pub fn from_json_str(src: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let d = &self.detector;

        let problem = if d.blur_kernel_size <= 0 || d.blur_kernel_size % 2 == 0 {
            Some(format!(
                "blur kernel size must be odd and positive, got {}",
                d.blur_kernel_size
            ))
        } else if d.morph_kernel_size <= 0 {
            Some(format!(
                "morph kernel size must be positive, got {}",
                d.morph_kernel_size
            ))
        } else if d.morph_close_iterations < 0 || d.morph_open_iterations < 0 {
            Some("morph iteration counts must not be negative".to_string())
        } else if d.min_radius > d.max_radius {
            Some(format!(
                "min radius {} exceeds max radius {}",
                d.min_radius, d.max_radius
            ))
        } else if d.hough_min_radius > d.hough_max_radius {
            Some(format!(
                "hough min radius {} exceeds hough max radius {}",
                d.hough_min_radius, d.hough_max_radius
            ))
        } else if d.hough_dp <= 0.0 {
            Some(format!("hough dp must be positive, got {}", d.hough_dp))
        } else if d.fusion_distance < 0.0 || self.tracker.max_distance < 0.0 {
            Some("distances must not be negative".to_string())
        } else if self.trajectory.history_length == 0 {
            Some("history length must be positive".to_string())
        } else if self.trajectory.polyfit_degree == 0 {
            Some("polyfit degree must be positive".to_string())
        } else if matches!(self.process_width, Some(w) if w <= 0) {
            Some("process width must be positive".to_string())
        } else {
            match &self.shot.hoop_roi {
                Some(roi) if roi.width <= 0.0 || roi.height <= 0.0 => {
                    Some(format!("hoop roi must have positive size, got {:?}", roi))
                }
                _ => None,
            }
        };

        match problem {
            Some(msg) => {
                warn!("rejecting config: {}", msg);
                Err(Error::InvalidConfig(msg))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = Config::from_json_str(
            r#"{ "tracker": { "max_disappeared": 4 }, "shot": { "hoop_roi": { "x": 10, "y": 20, "width": 30, "height": 15 } } }"#,
        )
        .unwrap();

        assert_eq!(config.tracker.max_disappeared, 4);
        assert_eq!(config.tracker.max_distance, 100.0);
        assert_eq!(config.detector, DetectorConfig::default());
        assert_eq!(config.shot.hoop_roi, Some(HoopRoi::new(10.0, 20.0, 30.0, 15.0)));
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let mut config = Config::default();
        config.detector.blur_kernel_size = 10;

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn inverted_radius_bounds_are_rejected() {
        let mut config = Config::default();
        config.detector.min_radius = 90.0;

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_hoop_is_rejected() {
        let mut config = Config::default();
        config.shot.hoop_roi = Some(HoopRoi::new(0.0, 0.0, 0.0, 10.0));

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Config::from_json_str("{ not json"),
            Err(Error::ConfigParse(_))
        ));
    }
}
