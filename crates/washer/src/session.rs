use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, WasherError},
    sequencer::DetectionSequencer,
    traits::{FrameSource, StatusSink},
    types::StageStatus,
};

/// Read-failure tolerance and loop pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetryPolicy {
    /// Consecutive failed reads after which the session gives up
    #[schemars(range(min = 1))]
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Pause between processed frames
    pub frame_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_backoff_ms: 100,
            frame_interval_ms: 30,
        }
    }
}

impl RetryPolicy {
    /// No sleeping at all; for replaying recorded frames and tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_backoff_ms: 0,
            frame_interval_ms: 0,
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Cloneable flag checked once per loop iteration
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Every stage confirmed
    Completed,
    /// Stop signal raised before completion
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub frames_processed: u64,
    pub read_failures: u64,
    pub reinitializations: u64,
    pub status: Vec<StageStatus>,
}

/// The frame loop: read, detect, advance, present
pub struct AssemblySession<S: FrameSource, K: StatusSink> {
    source: S,
    sequencer: DetectionSequencer,
    policy: RetryPolicy,
    sink: K,
    stop: StopSignal,
    frames_processed: u64,
    read_failures: u64,
    reinitializations: u64,
}

impl<S: FrameSource, K: StatusSink> AssemblySession<S, K> {
    pub fn new(source: S, sequencer: DetectionSequencer, sink: K) -> Self {
        Self {
            source,
            sequencer,
            policy: RetryPolicy::default(),
            sink,
            stop: StopSignal::new(),
            frames_processed: 0,
            read_failures: 0,
            reinitializations: 0,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn sequencer(&self) -> &DetectionSequencer {
        &self.sequencer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run until every stage is confirmed, the stop signal is raised, or an error escalates
    pub fn run(&mut self) -> Result<SessionReport> {
        info!("Starting session on {}", self.source.description());

        loop {
            if self.stop.is_raised() {
                info!("Stop requested");
                return Ok(self.report(SessionOutcome::Stopped));
            }
            if self.sequencer.is_done() {
                info!("All washers confirmed");
                return Ok(self.report(SessionOutcome::Completed));
            }
            self.step()?;
        }
    }

    /// One loop iteration: a read attempt and, if it succeeds, one detection pass
    pub fn step(&mut self) -> Result<()> {
        let frame = match self.source.read() {
            Ok(frame) => {
                self.sequencer.note_read_success();
                frame
            }
            Err(e) if e.is_transient_read() => {
                self.read_failures += 1;
                let attempts = self.sequencer.note_read_failure();
                warn!("Could not read frame ({}), attempt {}/{}", e, attempts, self.policy.max_retries);
                if attempts >= self.policy.max_retries {
                    return Err(WasherError::MaxRetriesExceeded { attempts });
                }
                thread::sleep(self.policy.retry_backoff());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.frames_processed += 1;

        let presented = match self.sequencer.update(&frame) {
            Ok(outcome) => {
                if outcome.needs_reinitialize() {
                    debug!("Reinitializing {}", self.source.description());
                    self.source.reinitialize()?;
                    self.reinitializations += 1;
                }
                outcome.annotated
            }
            Err(WasherError::InvalidFrame(reason)) => {
                warn!("Skipping detection on malformed frame: {}", reason);
                frame
            }
            Err(e) => return Err(e),
        };

        self.sink.present(&presented, &self.sequencer.status())?;

        if !self.sequencer.is_done() {
            thread::sleep(self.policy.frame_interval());
        }
        Ok(())
    }

    /// Snapshot of the counters and stage flags so far
    pub fn report(&self, outcome: SessionOutcome) -> SessionReport {
        SessionReport {
            outcome,
            frames_processed: self.frames_processed,
            read_failures: self.read_failures,
            reinitializations: self.reinitializations,
            status: self.sequencer.status(),
        }
    }

    /// Give back the owned source and sink
    pub fn into_parts(self) -> (S, DetectionSequencer, K) {
        (self.source, self.sequencer, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::WasherDetector,
        sequencer::ActiveStage,
        source::{ScriptStep, ScriptedSource, SyntheticWasher, render_washer_frame},
        stage::{StageTable, station_stages},
    };
    use image::{Rgb, RgbImage};

    const BLUE: Rgb<u8> = Rgb([40, 90, 230]);
    const TEAL: Rgb<u8> = Rgb([20, 130, 140]);
    const RED: Rgb<u8> = Rgb([220, 30, 30]);

    #[derive(Default)]
    struct RecordingSink {
        presented: Vec<Vec<StageStatus>>,
    }

    impl StatusSink for RecordingSink {
        fn present(&mut self, _frame: &RgbImage, status: &[StageStatus]) -> Result<()> {
            self.presented.push(status.to_vec());
            Ok(())
        }
    }

    fn washer(color: Rgb<u8>) -> RgbImage {
        render_washer_frame(320, 240, &[SyntheticWasher::new(100, 100, 35, color)])
    }

    fn blank() -> RgbImage {
        render_washer_frame(320, 240, &[])
    }

    fn session(source: ScriptedSource, max_retries: u32) -> AssemblySession<ScriptedSource, RecordingSink> {
        let sequencer = DetectionSequencer::new(
            StageTable::new(station_stages()).unwrap(),
            WasherDetector::default(),
        );
        AssemblySession::new(source, sequencer, RecordingSink::default())
            .with_policy(RetryPolicy::immediate(max_retries))
    }

    #[test]
    fn test_full_sequence_completes() {
        let source = ScriptedSource::new([
            ScriptStep::Frame(washer(BLUE)),
            ScriptStep::Frame(blank()),
            ScriptStep::Frame(washer(TEAL)),
            ScriptStep::Frame(washer(RED)),
        ]);
        let mut session = session(source, 10);

        let report = session.run().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.frames_processed, 4);
        assert_eq!(report.reinitializations, 1);
        assert!(report.status.iter().all(|s| s.detected));
        assert_eq!(session.source().reinitializations(), 1);
        assert_eq!(session.source().remaining(), 0);
        assert_eq!(session.sink().presented.len(), 4);
    }

    #[test]
    fn test_always_failing_source_exhausts_retries_exactly() {
        for max_retries in [1, 3, 10] {
            let mut session = session(ScriptedSource::always_failing(), max_retries);
            let err = session.run().unwrap_err();

            assert!(matches!(err, WasherError::MaxRetriesExceeded { attempts } if attempts == max_retries));
            assert_eq!(session.source().reads(), max_retries as usize);
            assert!(session.sink().presented.is_empty());
        }
    }

    #[test]
    fn test_recovery_after_transient_failures() {
        let mut source = ScriptedSource::new([ScriptStep::Frame(washer(BLUE))]);
        source.push_failures(3);
        source.push_frame(blank());
        let mut session = session(source, 10);

        session.step().unwrap();
        assert_eq!(session.sequencer().state().active, ActiveStage::Stage(1));

        for expected in 1..=3 {
            session.step().unwrap();
            assert_eq!(session.sequencer().state().retry_count(), expected);
        }

        session.step().unwrap();
        assert_eq!(session.sequencer().state().retry_count(), 0);
        assert_eq!(session.sequencer().state().active, ActiveStage::Stage(1));
    }

    #[test]
    fn test_failures_below_ceiling_are_not_fatal() {
        let mut source = ScriptedSource::default();
        source.push_failures(9);
        source.push_frame(washer(BLUE));
        source.push_failures(9);
        source.push_frame(washer(TEAL));
        source.push_frame(washer(RED));

        let report = session(source, 10).run().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.read_failures, 18);
    }

    #[test]
    fn test_reinitialize_failure_escalates() {
        let source = ScriptedSource::new([ScriptStep::Frame(washer(BLUE))]).failing_reinitialize();
        let mut session = session(source, 10);

        let err = session.run().unwrap_err();
        assert!(matches!(err, WasherError::DeviceUnavailable(_)));
        assert_eq!(session.sequencer().is_detected("blue"), Some(true));
    }

    #[test]
    fn test_stop_signal_ends_session() {
        let source = ScriptedSource::default().repeating(blank());
        let mut session = session(source, 10);
        let stop = session.stop_signal();

        session.step().unwrap();
        stop.raise();

        let report = session.run().unwrap();
        assert_eq!(report.outcome, SessionOutcome::Stopped);
        assert_eq!(report.frames_processed, 1);
        assert!(report.status.iter().all(|s| !s.detected));
    }

    #[test]
    fn test_malformed_frame_is_a_miss() {
        let source = ScriptedSource::new([
            ScriptStep::Frame(RgbImage::new(0, 0)),
            ScriptStep::Frame(washer(BLUE)),
        ]);
        let mut session = session(source, 10);

        session.step().unwrap();
        assert_eq!(session.sequencer().state().active, ActiveStage::Stage(0));
        session.step().unwrap();
        assert_eq!(session.sequencer().state().active, ActiveStage::Stage(1));
        assert_eq!(session.sink().presented.len(), 2);
    }
}
