//! Replay of pulse schedules against an external device abstraction.
//!
//! ```text
//!   on_start(duration) ──→ apply(instruction)* ──→ on_finish()
//! ```
//!
//! | Method | Required | Purpose |
//! |--------|----------|---------|
//! | `name()` | yes | Device identifier for logs |
//! | `apply()` | yes | Consume one instruction |
//! | `on_start()` | provided | Called once with the schedule duration |
//! | `on_finish()` | provided | Called once after the last instruction |
//!
//! Replay is record-and-forward only; no physical dynamics are simulated.

use std::collections::BTreeMap;

use psi_ir::{PulseInstruction, PulseSchedule, Time};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::PulseResult;

/// A consumer of pulse instructions.
pub trait PulseDevice {
    /// Device identifier.
    fn name(&self) -> &str;

    /// Called once before the first instruction.
    fn on_start(&mut self, _duration: Time) -> PulseResult<()> {
        Ok(())
    }

    /// Consume one instruction.
    fn apply(&mut self, instruction: &PulseInstruction) -> PulseResult<()>;

    /// Called once after the last instruction.
    fn on_finish(&mut self) -> PulseResult<()> {
        Ok(())
    }
}

/// Device that records every instruction it receives.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    applied: Vec<PulseInstruction>,
    started: bool,
    finished: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions in the order they were applied.
    pub fn applied(&self) -> &[PulseInstruction] {
        &self.applied
    }

    /// Whether a full replay ran to completion.
    pub fn is_complete(&self) -> bool {
        self.started && self.finished
    }
}

impl PulseDevice for RecordingDevice {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_start(&mut self, _duration: Time) -> PulseResult<()> {
        self.applied.clear();
        self.started = true;
        self.finished = false;
        Ok(())
    }

    fn apply(&mut self, instruction: &PulseInstruction) -> PulseResult<()> {
        self.applied.push(instruction.clone());
        Ok(())
    }

    fn on_finish(&mut self) -> PulseResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// What a replay did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    /// Device name.
    pub device: String,
    /// Instructions applied.
    pub applied: usize,
    /// Schedule duration in nanoseconds.
    pub duration: Time,
    /// Applied instruction count per kind.
    pub per_kind: BTreeMap<&'static str, usize>,
}

/// Drive `device` with every instruction, ordered by start time then wire.
#[instrument(skip_all, fields(device = device.name()))]
pub fn replay<D: PulseDevice + ?Sized>(
    schedule: &PulseSchedule,
    device: &mut D,
) -> PulseResult<ReplaySummary> {
    let duration = schedule.duration();
    device.on_start(duration)?;

    let mut per_kind = BTreeMap::new();
    let mut applied = 0;
    for instruction in schedule.ordered() {
        device.apply(instruction)?;
        *per_kind.entry(instruction.kind.name()).or_insert(0) += 1;
        applied += 1;
    }
    device.on_finish()?;

    debug!("replayed {} instructions over {} ns", applied, duration);
    Ok(ReplaySummary {
        device: device.name().to_string(),
        applied,
        duration,
        per_kind,
    })
}
