use image::RgbImage;
use tracing::{debug, info};

use crate::{
    algorithms::CircleAnnotator,
    error::Result,
    pipeline::WasherDetector,
    stage::{StageTable, WasherStage},
    types::{DetectionResult, StageStatus, display_name},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveStage {
    /// Index into the stage table
    Stage(usize),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    /// Active stage not confirmed on this frame
    Hold,
    Advance {
        confirmed: String,
        next: Option<String>,
        reinitialize: bool,
    },
    /// Sequence already complete
    Inert,
}

impl ActiveStage {
    pub fn transition(&self, circle_count: usize, table: &StageTable) -> (ActiveStage, StageAction) {
        let index = match self {
            ActiveStage::Done => return (ActiveStage::Done, StageAction::Inert),
            ActiveStage::Stage(index) => *index,
        };

        let Some(stage) = table.get(index) else {
            return (ActiveStage::Done, StageAction::Inert);
        };

        if !stage.accepts(circle_count) {
            return (*self, StageAction::Hold);
        }

        let next_state = match table.next_index(index) {
            Some(next) => ActiveStage::Stage(next),
            None => ActiveStage::Done,
        };

        (
            next_state,
            StageAction::Advance {
                confirmed: stage.id.clone(),
                next: stage.next.clone(),
                reinitialize: stage.reinitialize_after,
            },
        )
    }
}

/// The only state that survives from one frame to the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerState {
    pub active: ActiveStage,
    detected: Vec<bool>,
    retry_count: u32,
}

impl SequencerState {
    pub fn new(stage_count: usize) -> Self {
        Self {
            active: if stage_count == 0 {
                ActiveStage::Done
            } else {
                ActiveStage::Stage(0)
            },
            detected: vec![false; stage_count],
            retry_count: 0,
        }
    }

    pub fn detected(&self) -> &[bool] {
        &self.detected
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

/// What one call to [`DetectionSequencer::update`] produced
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// The input frame with every found circle drawn on it
    pub annotated: RgbImage,
    /// `None` once the sequence is complete
    pub detection: Option<DetectionResult>,
    pub action: StageAction,
}

impl FrameOutcome {
    pub fn needs_reinitialize(&self) -> bool {
        matches!(self.action, StageAction::Advance { reinitialize: true, .. })
    }
}

pub struct DetectionSequencer {
    table: StageTable,
    detector: WasherDetector,
    annotator: CircleAnnotator,
    state: SequencerState,
    frame_counter: u64,
}

impl DetectionSequencer {
    pub fn new(table: StageTable, detector: WasherDetector) -> Self {
        let state = SequencerState::new(table.len());
        Self {
            table,
            detector,
            annotator: CircleAnnotator::default(),
            state,
            frame_counter: 0,
        }
    }

    pub fn with_annotator(mut self, annotator: CircleAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Detect the active stage's washer in `frame` and advance when it is confirmed
    pub fn update(&mut self, frame: &RgbImage) -> Result<FrameOutcome> {
        self.frame_counter += 1;

        let Some(stage) = self.active_stage().cloned() else {
            return Ok(FrameOutcome {
                annotated: frame.clone(),
                detection: None,
                action: StageAction::Inert,
            });
        };

        let detection = self.detector.detect(frame, &stage.range)?;

        let mut annotated = frame.clone();
        self.annotator.annotate(&mut annotated, &detection.circles);

        let action = self.apply(detection.circles.len());
        if action == StageAction::Hold && !detection.is_empty() {
            debug!(
                stage = %stage.id,
                circles = detection.circles.len(),
                expected = ?stage.expected_count,
                "circle count does not confirm stage"
            );
        }

        Ok(FrameOutcome {
            annotated,
            detection: Some(detection),
            action,
        })
    }

    /// Feed a circle count for the active stage into the state machine
    pub fn apply(&mut self, circle_count: usize) -> StageAction {
        let (next_state, action) = self.state.active.transition(circle_count, &self.table);

        if let StageAction::Advance { confirmed, next, .. } = &action {
            if let Some(index) = self.table.position(confirmed) {
                self.state.detected[index] = true;
            }
            match next {
                Some(next) => info!(
                    "{} washer detected, go for {} washer",
                    display_name(confirmed),
                    display_name(next)
                ),
                None => info!("{} washer detected", display_name(confirmed)),
            }
        }

        self.state.active = next_state;
        action
    }

    /// Count a failed frame read, returning the consecutive failure count
    pub fn note_read_failure(&mut self) -> u32 {
        self.state.retry_count += 1;
        self.state.retry_count
    }

    pub fn note_read_success(&mut self) {
        self.state.retry_count = 0;
    }

    pub fn active_stage(&self) -> Option<&WasherStage> {
        match self.state.active {
            ActiveStage::Stage(index) => self.table.get(index),
            ActiveStage::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state.active == ActiveStage::Done
    }

    pub fn status(&self) -> Vec<StageStatus> {
        self.table
            .iter()
            .zip(&self.state.detected)
            .map(|(stage, detected)| StageStatus {
                stage: stage.id.clone(),
                detected: *detected,
            })
            .collect()
    }

    pub fn is_detected(&self, id: &str) -> Option<bool> {
        self.table.position(id).map(|i| self.state.detected[i])
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn table(&self) -> &StageTable {
        &self.table
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }
}
