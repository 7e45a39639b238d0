use std::collections::VecDeque;

use hoopvision::{
    BallAnalytics, Config, Detect, Detection, DetectionMethod, Error, HoopRoi, ShotOutcome,
};
use opencv::{
    core::{self, Mat},
    imgproc,
};

struct ScriptedDetector {
    frames: VecDeque<Vec<Detection>>,
}

impl ScriptedDetector {
    fn new(script: &[&[(f32, f32)]]) -> Self {
        Self {
            frames: script
                .iter()
                .map(|dets| {
                    dets.iter()
                        .map(|&(x, y)| Detection::new(x, y, 12.0, 0.9, DetectionMethod::Fused))
                        .collect()
                })
                .collect(),
        }
    }
}

impl Detect for ScriptedDetector {
    fn detect(&mut self, _frame: &Mat) -> Result<Vec<Detection>, Error> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

fn config(hoop: Option<HoopRoi>) -> Config {
    let mut config = Config::default();
    config.process_width = None;
    config.tracker.max_disappeared = 2;
    config.shot.hoop_roi = hoop;
    config
}

fn hoop() -> HoopRoi {
    HoopRoi::new(100.0, 200.0, 40.0, 20.0)
}

#[test]
fn scored_shot_end_to_end() {
    let detector = ScriptedDetector::new(&[
        &[(120.0, 150.0), (400.0, 400.0)],
        &[(120.0, 180.0), (402.0, 400.0)],
        &[(121.0, 210.0), (404.0, 400.0)],
        &[(122.0, 240.0), (406.0, 400.0)],
        &[(408.0, 400.0)],
        &[(410.0, 400.0)],
        &[(412.0, 400.0)],
    ]);
    let mut analytics = BallAnalytics::with_detector(&config(Some(hoop())), detector).unwrap();

    for index in 1..=4 {
        analytics.process_frame(index, &Mat::default()).unwrap();
    }

    let shots = analytics.shots();
    assert_eq!(shots.shots_taken(), 1);
    assert_eq!(shots.shots_made(), 1);
    assert_eq!(shots.shot_log()[0].object_id, 0);
    assert_eq!(shots.shot_log()[0].frame, 4);
    assert_eq!(
        shots.get_recent_shot_result(10, 30),
        Some((ShotOutcome::Scored, 6))
    );

    let tracks = analytics.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].velocity, (1.0, 30.0));

    // ball 0 vanishes; after max_disappeared + 1 frames every trace of it is gone
    for index in 5..=7 {
        let frame = analytics.process_frame(index, &Mat::default()).unwrap();
        assert_eq!(frame.len(), 1);
    }

    assert_eq!(analytics.tracker().len(), 1);
    assert!(analytics.trajectory().history(0).is_none());
    assert_eq!(analytics.trajectory().object_ids(), vec![1]);

    let summary = analytics.summary();
    assert_eq!(summary.frames_processed, 7);
    assert_eq!(summary.last_frame, Some(7));
    assert_eq!(summary.trajectories.len(), 1);
    assert_eq!(summary.trajectories[0].frames_tracked, 7);
    assert_eq!(summary.shot_detection.as_ref().unwrap().shots_made, 1);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["shot_detection"]["shot_log"][0]["result"], "scored");
}

#[test]
fn shot_detection_disabled_is_observable() {
    let detector = ScriptedDetector::new(&[&[(120.0, 150.0)], &[(120.0, 210.0)], &[(120.0, 260.0)]]);
    let mut analytics = BallAnalytics::with_detector(&config(None), detector).unwrap();

    for index in 1..=3 {
        analytics.process_frame(index, &Mat::default()).unwrap();
    }

    assert!(!analytics.shots().is_enabled());
    assert_eq!(analytics.shots().shots_taken(), 0);
    assert!(analytics.summary().shot_detection.is_none());
}

#[test]
fn frame_indices_must_increase() {
    let detector = ScriptedDetector::new(&[]);
    let mut analytics = BallAnalytics::with_detector(&config(None), detector).unwrap();

    analytics.process_frame(5, &Mat::default()).unwrap();

    assert!(matches!(
        analytics.process_frame(5, &Mat::default()),
        Err(Error::NonMonotonicFrame { last: 5, got: 5 })
    ));
    assert!(analytics.process_frame(6, &Mat::default()).is_ok());
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = config(None);
    config.trajectory.history_length = 0;

    assert!(matches!(
        BallAnalytics::new(&config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn detector_settings_are_checked_before_building_the_detector() {
    let mut config = config(None);
    config.detector.morph_kernel_size = 0;

    assert!(matches!(
        BallAnalytics::new(&config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn tracks_synthetic_ball_flight() {
    let mut analytics = BallAnalytics::new(&config(None)).unwrap();
    let n = 10;

    for i in 0..n {
        let x = 40 + i * 25;
        let y = 200 - i * 30 + i * i * 3;

        let mut frame =
            Mat::new_rows_cols_with_default(240, 320, core::CV_8UC3, core::Scalar::all(0.0))
                .unwrap();
        imgproc::circle(
            &mut frame,
            core::Point::new(x, y),
            15,
            core::Scalar::new(0.0, 128.0, 255.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let report = analytics.process_frame(i as u64 + 1, &frame).unwrap();
        let pos = report.object(0).expect("ball keeps its identity");

        assert!((pos.x - x as f32).abs() < 5.0);
        assert!((pos.y - y as f32).abs() < 5.0);
    }

    let summary = analytics.trajectory().get_summary(0);
    assert_eq!(summary.frames_tracked, n as u32);
    assert!(analytics.trajectory().fit_trajectory(0).is_some());
}
