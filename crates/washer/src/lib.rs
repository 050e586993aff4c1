//! # Washer Sequence Detection Library
//!
//! Guides an assembly station through a fixed sequence of colored washers.
//! Each frame is masked to the active stage's HSV range, searched for circles,
//! and the stage advances only once a washer of that color is confirmed.
//!
//! ## Core Features
//!
//! - **Color gating**: HSV range masks in the 8-bit convention
//! - **Circle search**: gradient Hough transform over Canny edges
//! - **Stage table**: ordered stages with `next` pointers and per-stage camera reopen
//! - **Session loop**: bounded read retries, pacing, stop signal, pluggable status sinks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use washer::{
//!     AssemblySession, DetectionSequencer, LogSink, StageTable, WasherDetector,
//!     source::ImageSequenceSource, stage::station_stages,
//! };
//!
//! let sequencer = DetectionSequencer::new(
//!     StageTable::new(station_stages())?,
//!     WasherDetector::default(),
//! );
//! let source = ImageSequenceSource::open("frames/")?;
//!
//! let report = AssemblySession::new(source, sequencer, LogSink::default()).run()?;
//! println!("{}", report.outcome);
//! # Ok::<(), washer::WasherError>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod stage;
pub mod sequencer;
pub mod source;
pub mod session;
pub mod presentation;

// Re-exports for convenience
pub use error::{Result, WasherError};
pub use types::{Circle, ColorRange, DetectionResult, StageStatus};
pub use traits::*;
pub use pipeline::{
    WasherDetector,
    builder::{DetectorBuilder, DetectorConfig, DetectorProfile},
};
pub use stage::{StageSpec, StageTable, WasherStage};
pub use sequencer::{ActiveStage, DetectionSequencer, FrameOutcome, SequencerState, StageAction};
pub use session::{AssemblySession, RetryPolicy, SessionOutcome, SessionReport, StopSignal};
pub use presentation::{FrameDirectorySink, LogSink, MultiSink};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithms::{HoughCircleFinder, HoughParams},
        source::{ScriptedSource, SyntheticWasher, render_washer_frame},
        stage::{bench_stages, station_stages},
    };
    use image::Rgb;

    #[test]
    fn test_detector_finds_blue_washer_only_in_blue_range() {
        let detector = WasherDetector::default();
        let frame = render_washer_frame(
            320,
            240,
            &[SyntheticWasher::new(100, 100, 35, Rgb([40, 90, 230]))],
        );

        let blue = detector.detect(&frame, &stage::ranges::blue()).unwrap();
        assert_eq!(blue.circles.len(), 1);
        assert_eq!(blue.mask_frame.get_pixel(100, 100), &Rgb([40, 90, 230]));
        assert_eq!(blue.mask_frame.get_pixel(5, 5), &Rgb([0, 0, 0]));

        let red = detector.detect(&frame, &stage::ranges::red()).unwrap();
        assert!(red.circles.is_empty());
        assert!(red.mask_frame.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }

    #[test]
    fn test_general_profile_finds_large_washer() {
        let frame = render_washer_frame(
            400,
            300,
            &[SyntheticWasher::new(200, 150, 100, Rgb([220, 30, 30]))],
        );

        let small = WasherDetector::default();
        assert!(small.detect(&frame, &stage::ranges::red()).unwrap().circles.is_empty());

        let general = DetectorBuilder::new()
            .set_circle_finder(HoughCircleFinder::new(HoughParams::general()))
            .build();
        let found = general.detect(&frame, &stage::ranges::red()).unwrap();
        assert_eq!(found.circles.len(), 1, "found {:?}", found.circles);
        assert!((found.circles[0].radius - 100).abs() <= 3);
    }

    #[test]
    fn test_bench_sequence_with_deep_teal() {
        let frames = [Rgb([40, 90, 230]), Rgb([20, 160, 90]), Rgb([220, 30, 30])]
            .into_iter()
            .map(|color| render_washer_frame(320, 240, &[SyntheticWasher::new(160, 120, 40, color)]));
        let mut source = ScriptedSource::default();
        for frame in frames {
            source.push_frame(frame);
        }

        let detector = DetectorConfig {
            profile: DetectorProfile::General,
            ..DetectorConfig::default()
        }
        .build()
        .unwrap();
        let sequencer = DetectionSequencer::new(StageTable::new(bench_stages()).unwrap(), detector);

        let mut session = AssemblySession::new(source, sequencer, MultiSink::new())
            .with_policy(RetryPolicy::immediate(3));
        let report = session.run().unwrap();

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.reinitializations, 0);
        assert_eq!(report.frames_processed, 3);
    }

    #[test]
    fn test_station_table_is_valid() {
        assert_eq!(StageTable::new(station_stages()).unwrap().len(), 3);
    }
}
