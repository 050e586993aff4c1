use std::collections::VecDeque;

use image::{Rgb, RgbImage};

use crate::{
    error::{Result, WasherError},
    traits::FrameSource,
};

/// Background used for synthetic frames: fully desaturated, so it never matches a washer range
pub const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);

/// A solid colored disc to paint into a synthetic frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticWasher {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub color: Rgb<u8>,
}

impl SyntheticWasher {
    pub fn new(x: i32, y: i32, radius: i32, color: Rgb<u8>) -> Self {
        Self { x, y, radius, color }
    }
}

/// Paint washers as filled discs over a neutral background
pub fn render_washer_frame(width: u32, height: u32, washers: &[SyntheticWasher]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        washers
            .iter()
            .rev()
            .find(|w| {
                let dx = x as i32 - w.x;
                let dy = y as i32 - w.y;
                dx * dx + dy * dy <= w.radius * w.radius
            })
            .map_or(BACKGROUND, |w| w.color)
    })
}

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Frame(RgbImage),
    ReadFailure,
}

/// In-memory frame source replaying a fixed script.
///
/// Once the script is exhausted every read fails with `FrameUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    reads: usize,
    reinitializations: usize,
    fail_reinitialize: bool,
    repeat_last: Option<RgbImage>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A source that never yields a frame
    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: RgbImage) {
        self.steps.push_back(ScriptStep::Frame(frame));
    }

    pub fn push_failures(&mut self, count: usize) {
        self.steps
            .extend(std::iter::repeat_n(ScriptStep::ReadFailure, count));
    }

    /// Keep yielding this frame after the script runs out
    pub fn repeating(mut self, frame: RgbImage) -> Self {
        self.repeat_last = Some(frame);
        self
    }

    pub fn failing_reinitialize(mut self) -> Self {
        self.fail_reinitialize = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn reinitializations(&self) -> usize {
        self.reinitializations
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Result<RgbImage> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(frame)) => Ok(frame),
            Some(ScriptStep::ReadFailure) => Err(WasherError::FrameUnavailable(format!(
                "scripted failure on read {}",
                self.reads
            ))),
            None => self.repeat_last.clone().ok_or_else(|| {
                WasherError::FrameUnavailable("script exhausted".to_string())
            }),
        }
    }

    fn reinitialize(&mut self) -> Result<()> {
        if self.fail_reinitialize {
            return Err(WasherError::DeviceUnavailable(
                "scripted device refused to reopen".to_string(),
            ));
        }
        self.reinitializations += 1;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Scripted source ({} steps queued)", self.steps.len())
    }
}
