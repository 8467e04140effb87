//! Per-wire pulse scheduling.
//!
//! Every wire owns a local time cursor and a reference frame. Instructions are
//! placed at the cursor of their wire and advance it by their duration. Align
//! blocks start all participating wires at a common time and pad shorter
//! branches so that every wire leaves the block at the same end time.

use psi_ir::{
    ClassicalCondition, Frame, PulseInstruction, PulseKind, PulseSchedule, RotationAxis, Span,
    Time, WireId,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PulseError, PulseResult};

/// A pulse-layer operation before placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PulseOp {
    Rotate {
        axis: RotationAxis,
        angle: f64,
        duration: Time,
        shape: Option<String>,
    },
    Wait {
        duration: Time,
    },
    ShiftPhase {
        angle: f64,
    },
    SetFreq {
        hz: f64,
    },
    Play {
        waveform: String,
        channel: Option<String>,
        duration: Option<Time>,
    },
    Acquire {
        duration: Time,
        kernel: Option<String>,
    },
}

impl PulseOp {
    /// Time the operation occupies on its wire.
    pub fn duration(&self) -> Time {
        match self {
            PulseOp::Rotate { duration, .. }
            | PulseOp::Wait { duration }
            | PulseOp::Acquire { duration, .. } => *duration,
            PulseOp::Play { duration, .. } => duration.unwrap_or(0.0),
            PulseOp::ShiftPhase { .. } | PulseOp::SetFreq { .. } => 0.0,
        }
    }

    fn into_kind(self) -> PulseKind {
        match self {
            PulseOp::Rotate {
                axis, angle, shape, ..
            } => PulseKind::Rotate { axis, angle, shape },
            PulseOp::Wait { .. } => PulseKind::Wait { padding: false },
            PulseOp::ShiftPhase { angle } => PulseKind::ShiftPhase { angle },
            PulseOp::SetFreq { hz } => PulseKind::SetFreq { hz },
            PulseOp::Play {
                waveform, channel, ..
            } => PulseKind::Play { waveform, channel },
            PulseOp::Acquire { kernel, .. } => PulseKind::Acquire { kernel },
        }
    }
}

/// What opened a pulse scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `Analog(target: w) { ... }`
    Analog,
    /// `branch w { ... }` inside Align.
    Branch,
}

/// An open pulse scope on one wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenScope {
    pub kind: ScopeKind,
    /// Source-level label of the wire, e.g. `q[0]`.
    pub label: String,
    /// Where the scope was opened.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
struct AlignFrame {
    start: Time,
    wires: Vec<(WireId, String)>,
    ends: FxHashMap<WireId, Time>,
    span: Span,
}

/// Start and end time of a reconciled Align block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignSummary {
    pub start: Time,
    pub end: Time,
    /// Number of trailing padding idles inserted.
    pub padded: usize,
}

/// Saved scheduler state for rolling back a failed statement.
#[derive(Debug, Clone)]
pub struct PulseCheckpoint {
    len: usize,
    cursors: FxHashMap<WireId, Time>,
    frames: FxHashMap<WireId, Frame>,
    scopes: FxHashMap<WireId, Vec<OpenScope>>,
    aligns: Vec<AlignFrame>,
}

/// Lowers pulse operations into a timestamped [`PulseSchedule`].
#[derive(Debug, Default)]
pub struct PulseScheduler {
    schedule: PulseSchedule,
    cursors: FxHashMap<WireId, Time>,
    frames: FxHashMap<WireId, Frame>,
    scopes: FxHashMap<WireId, Vec<OpenScope>>,
    aligns: Vec<AlignFrame>,
}

impl PulseScheduler {
    /// Create an empty scheduler with every cursor at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor of a wire.
    pub fn cursor(&self, wire: WireId) -> Time {
        self.cursors.get(&wire).copied().unwrap_or(0.0)
    }

    /// Current frame of a wire.
    pub fn frame(&self, wire: WireId) -> Frame {
        self.frames.get(&wire).copied().unwrap_or_default()
    }

    /// The schedule built so far.
    pub fn schedule(&self) -> &PulseSchedule {
        &self.schedule
    }

    /// Innermost open scope on a wire.
    pub fn open_scope_on(&self, wire: WireId) -> Option<&OpenScope> {
        self.scopes.get(&wire).and_then(|stack| stack.last())
    }

    /// Whether any scope or Align block is still open.
    pub fn has_open_scopes(&self) -> bool {
        !self.aligns.is_empty() || self.scopes.values().any(|s| !s.is_empty())
    }

    /// Open an Analog scope on a wire.
    pub fn open_scope(&mut self, wire: WireId, label: impl Into<String>, span: Span) {
        self.push_scope(wire, ScopeKind::Analog, label.into(), span);
    }

    /// Close the innermost scope on a wire.
    pub fn close_scope(&mut self, wire: WireId) -> PulseResult<OpenScope> {
        self.scopes
            .get_mut(&wire)
            .and_then(Vec::pop)
            .ok_or_else(|| PulseError::UnbalancedScope(format!("no open scope on {wire}")))
    }

    fn push_scope(&mut self, wire: WireId, kind: ScopeKind, label: String, span: Span) {
        debug!("open {:?} scope on {} at {}", kind, label, span);
        self.scopes
            .entry(wire)
            .or_default()
            .push(OpenScope { kind, label, span });
    }

    /// Reject a predicate-guarded logic operation on a wire with an open scope.
    pub fn ensure_unscoped(&self, wire: WireId, usage: Span) -> PulseResult<()> {
        match self.scopes.get(&wire).and_then(|stack| stack.first()) {
            Some(scope) => Err(PulseError::ScopeConflict {
                wire: scope.label.clone(),
                scope: scope.span,
                usage,
            }),
            None => Ok(()),
        }
    }

    /// Place an operation at the wire's cursor and advance the cursor.
    pub fn emit(
        &mut self,
        wire: WireId,
        label: impl Into<String>,
        op: PulseOp,
        origin: Span,
        conditions: Vec<ClassicalCondition>,
    ) -> PulseResult<&PulseInstruction> {
        let duration = op.duration();
        if !duration.is_finite() || duration < 0.0 {
            return Err(PulseError::InvalidDuration {
                duration,
                span: origin,
            });
        }

        let frame = self.frames.entry(wire).or_default();
        match &op {
            PulseOp::ShiftPhase { angle } => frame.shift_phase(*angle),
            PulseOp::SetFreq { hz } => frame.set_frequency(*hz),
            _ => {}
        }
        let frame = *frame;

        let start = self.cursor(wire);
        let instruction = PulseInstruction {
            wire,
            label: label.into(),
            kind: op.into_kind(),
            start,
            duration,
            frame,
            branch: self.branch_label(wire),
            conditions,
            origin: Some(origin),
        };
        debug!(
            "{} {} at {} for {}",
            instruction.label,
            instruction.kind.name(),
            start,
            duration
        );
        self.cursors.insert(wire, start + duration);
        Ok(self.push(instruction))
    }

    fn push(&mut self, instruction: PulseInstruction) -> &PulseInstruction {
        self.schedule.push(instruction);
        let last = self.schedule.len() - 1;
        &self.schedule.instructions()[last]
    }

    fn branch_label(&self, wire: WireId) -> Option<String> {
        self.scopes.get(&wire).and_then(|stack| {
            stack
                .iter()
                .rev()
                .find(|s| s.kind == ScopeKind::Branch)
                .map(|s| s.label.clone())
        })
    }

    fn pad(&mut self, wire: WireId, label: &str, until: Time, origin: Span) {
        let start = self.cursor(wire);
        if until <= start {
            return;
        }
        let instruction = PulseInstruction {
            wire,
            label: label.to_string(),
            kind: PulseKind::Wait { padding: true },
            start,
            duration: until - start,
            frame: self.frame(wire),
            branch: self.branch_label(wire),
            conditions: vec![],
            origin: Some(origin),
        };
        self.cursors.insert(wire, until);
        self.push(instruction);
    }

    /// Open an Align block over `wires`.
    ///
    /// The common start is the latest cursor among the participating wires.
    pub fn begin_align(&mut self, wires: &[(WireId, String)], span: Span) -> PulseResult<Time> {
        let mut seen: Vec<WireId> = Vec::with_capacity(wires.len());
        for (wire, label) in wires {
            if seen.contains(wire) {
                return Err(PulseError::DuplicateBranch {
                    wire: label.clone(),
                    span,
                });
            }
            seen.push(*wire);
        }

        let start = wires
            .iter()
            .map(|(wire, _)| self.cursor(*wire))
            .fold(0.0, f64::max);
        debug!("align over {} wires starts at {}", wires.len(), start);
        self.aligns.push(AlignFrame {
            start,
            wires: wires.to_vec(),
            ends: FxHashMap::default(),
            span,
        });
        Ok(start)
    }

    /// Open the branch for `wire` in the innermost Align block.
    ///
    /// A wire whose cursor trails the common start gets a leading padding idle.
    pub fn begin_branch(&mut self, wire: WireId, span: Span) -> PulseResult<()> {
        let Some(align) = self.aligns.last() else {
            return Err(PulseError::UnbalancedScope("branch outside Align".into()));
        };
        let Some((_, label)) = align.wires.iter().find(|(w, _)| *w == wire) else {
            return Err(PulseError::BranchWireMismatch {
                wire: wire.to_string(),
                span,
            });
        };
        if align.ends.contains_key(&wire) {
            return Err(PulseError::DuplicateBranch {
                wire: label.clone(),
                span,
            });
        }
        let label = label.clone();
        let start = align.start;

        self.push_scope(wire, ScopeKind::Branch, label.clone(), span);
        self.pad(wire, &label, start, span);
        Ok(())
    }

    /// Close the branch for `wire`, recording its end time.
    pub fn end_branch(&mut self, wire: WireId) -> PulseResult<Time> {
        let scope = self.close_scope(wire)?;
        if scope.kind != ScopeKind::Branch {
            return Err(PulseError::UnbalancedScope(format!(
                "expected branch scope on {}",
                scope.label
            )));
        }
        let end = self.cursor(wire);
        let align = self
            .aligns
            .last_mut()
            .ok_or_else(|| PulseError::UnbalancedScope("branch outside Align".into()))?;
        align.ends.insert(wire, end);
        Ok(end)
    }

    /// Reconcile the innermost Align block.
    ///
    /// The end time is the maximum branch end; shorter branches get a trailing
    /// padding idle so every participating cursor sits at the common end.
    pub fn end_align(&mut self) -> PulseResult<AlignSummary> {
        let align = self
            .aligns
            .pop()
            .ok_or_else(|| PulseError::UnbalancedScope("no open Align block".into()))?;

        let end = align
            .wires
            .iter()
            .map(|(wire, _)| self.cursor(*wire))
            .fold(align.start, f64::max);

        let mut padded = 0;
        for (wire, label) in &align.wires {
            if self.cursor(*wire) < end {
                // Trailing padding belongs to the branch that just closed.
                self.push_scope(*wire, ScopeKind::Branch, label.clone(), align.span);
                self.pad(*wire, label, end, align.span);
                self.close_scope(*wire)?;
                padded += 1;
            }
            self.cursors.insert(*wire, end);
        }

        debug!("align reconciled: {} -> {} ({} padded)", align.start, end, padded);
        Ok(AlignSummary {
            start: align.start,
            end,
            padded,
        })
    }

    /// Save the scheduler state.
    pub fn checkpoint(&self) -> PulseCheckpoint {
        PulseCheckpoint {
            len: self.schedule.len(),
            cursors: self.cursors.clone(),
            frames: self.frames.clone(),
            scopes: self.scopes.clone(),
            aligns: self.aligns.clone(),
        }
    }

    /// Restore a saved state, discarding everything scheduled since.
    pub fn rollback(&mut self, checkpoint: PulseCheckpoint) {
        self.schedule.truncate(checkpoint.len);
        self.cursors = checkpoint.cursors;
        self.frames = checkpoint.frames;
        self.scopes = checkpoint.scopes;
        self.aligns = checkpoint.aligns;
    }

    /// Finish scheduling. Every scope and Align block must be closed.
    pub fn finish(self) -> PulseResult<PulseSchedule> {
        if self.has_open_scopes() {
            return Err(PulseError::UnbalancedScope(
                "scope still open at end of program".into(),
            ));
        }
        Ok(self.schedule)
    }
}
