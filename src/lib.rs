pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod math;
pub mod pipeline;
pub mod shot;
pub mod tracker;
pub mod trajectory;

mod circular_queue;
mod track;

pub use circular_queue::CircularQueue;
pub use config::Config;
pub use detection::{Detection, DetectionMethod};
pub use detector::BallDetector;
pub use error::Error;
pub use frame::Frame;
pub use pipeline::{BallAnalytics, RunSummary};
pub use shot::{HoopRoi, ShotOutcome, ShotState, ShotStateMachine};
pub use track::Track;
pub use tracker::CentroidTracker;
pub use trajectory::TrajectoryAnalyzer;

use opencv::core::Mat;

pub type ObjectId = u32;

/// Turns a BGR frame into ball candidates
pub trait Detect {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, Error>;
}
