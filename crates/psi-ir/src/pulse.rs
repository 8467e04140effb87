//! Pulse-level IR: timestamped per-wire instructions.
//!
//! Times and durations are in nanoseconds. Abstract `dt` ticks are folded in
//! by the front end at one tick per nanosecond.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use crate::error::IrResult;
use crate::gate::ClassicalCondition;
use crate::span::Span;
use crate::wire::WireId;

/// Time in nanoseconds.
pub type Time = f64;

/// Rotation axis for a physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationAxis {
    /// In-phase drive.
    X,
    /// Quadrature drive.
    Y,
    /// Virtual Z (frame) rotation.
    Z,
}

impl fmt::Display for RotationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationAxis::X => write!(f, "X"),
            RotationAxis::Y => write!(f, "Y"),
            RotationAxis::Z => write!(f, "Z"),
        }
    }
}

/// Per-wire reference frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Accumulated virtual phase offset in radians.
    pub phase: f64,
    /// Current drive frequency in Hz, once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

impl Frame {
    /// Add `angle` to the virtual phase.
    pub fn shift_phase(&mut self, angle: f64) {
        self.phase += angle;
    }

    /// Replace the drive frequency.
    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = Some(hz);
    }
}

/// What a pulse instruction does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PulseKind {
    /// Physical rotation.
    Rotate {
        /// Drive axis.
        axis: RotationAxis,
        /// Rotation angle in radians.
        angle: f64,
        /// Envelope shape reference.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shape: Option<String>,
    },
    /// Idle. `padding` marks idles inserted by alignment.
    Wait {
        /// Inserted by the scheduler rather than written in the source.
        #[serde(default)]
        padding: bool,
    },
    /// Zero-duration virtual phase shift.
    ShiftPhase {
        /// Shift in radians.
        angle: f64,
    },
    /// Zero-duration frequency change.
    SetFreq {
        /// New frequency in Hz.
        hz: f64,
    },
    /// Play an opaque waveform.
    Play {
        /// Waveform reference.
        waveform: String,
        /// Output channel reference.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
    /// Readout acquisition.
    Acquire {
        /// Integration kernel reference.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kernel: Option<String>,
    },
}

impl PulseKind {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            PulseKind::Rotate { .. } => "rotate",
            PulseKind::Wait { .. } => "wait",
            PulseKind::ShiftPhase { .. } => "shiftphase",
            PulseKind::SetFreq { .. } => "setfreq",
            PulseKind::Play { .. } => "play",
            PulseKind::Acquire { .. } => "acquire",
        }
    }

    /// Whether this is a scheduler-inserted idle.
    pub fn is_padding(&self) -> bool {
        matches!(self, PulseKind::Wait { padding: true })
    }

    /// Whether the instruction only mutates the frame.
    pub fn is_frame_change(&self) -> bool {
        matches!(self, PulseKind::ShiftPhase { .. } | PulseKind::SetFreq { .. })
    }
}

/// One timestamped pulse instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseInstruction {
    /// Wire the instruction acts on.
    pub wire: WireId,
    /// Source-level wire label, e.g. `q[0]`.
    pub label: String,
    /// What the instruction does.
    #[serde(flatten)]
    pub kind: PulseKind,
    /// Absolute start time.
    pub start: Time,
    /// Duration.
    pub duration: Time,
    /// Frame state after this instruction.
    pub frame: Frame,
    /// Align branch this instruction belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Classical guards.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClassicalCondition>,
    /// Source statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Span>,
}

impl PulseInstruction {
    /// End time.
    pub fn end(&self) -> Time {
        self.start + self.duration
    }

    fn details(&self) -> String {
        let mut details = vec![];
        match &self.kind {
            PulseKind::Rotate { axis, angle, shape } => {
                details.push(format!("axis={axis}"));
                details.push(format!("angle={angle:.6}"));
                if let Some(shape) = shape {
                    details.push(format!("shape={shape}"));
                }
            }
            PulseKind::Wait { padding } => {
                if *padding {
                    details.push("padding".to_string());
                }
            }
            PulseKind::ShiftPhase { angle } => details.push(format!("angle={angle:.6}")),
            PulseKind::SetFreq { hz } => details.push(format!("freq={hz}")),
            PulseKind::Play { waveform, channel } => {
                details.push(format!("waveform={waveform}"));
                if let Some(channel) = channel {
                    details.push(format!("channel={channel}"));
                }
            }
            PulseKind::Acquire { kernel } => {
                if let Some(kernel) = kernel {
                    details.push(format!("kernel={kernel}"));
                }
            }
        }
        if let Some(branch) = &self.branch {
            details.push(format!("branch={branch}"));
        }
        for cond in &self.conditions {
            details.push(format!("when={cond}"));
        }
        details.join(", ")
    }
}

/// A complete pulse schedule in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseSchedule {
    instructions: Vec<PulseInstruction>,
}

impl PulseSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: PulseInstruction) {
        self.instructions.push(instruction);
    }

    /// Instructions in emission order.
    pub fn instructions(&self) -> &[PulseInstruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the schedule is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Drop instructions past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.instructions.truncate(len);
    }

    /// Latest end time over all instructions.
    pub fn duration(&self) -> Time {
        self.instructions
            .iter()
            .map(PulseInstruction::end)
            .fold(0.0, f64::max)
    }

    /// Instructions grouped by wire, each group sorted by start time.
    pub fn per_wire(&self) -> BTreeMap<WireId, Vec<&PulseInstruction>> {
        let mut grouped: BTreeMap<WireId, Vec<&PulseInstruction>> = BTreeMap::new();
        for inst in &self.instructions {
            grouped.entry(inst.wire).or_default().push(inst);
        }
        for group in grouped.values_mut() {
            group.sort_by(|a, b| a.start.total_cmp(&b.start));
        }
        grouped
    }

    /// Instructions ordered by start time, then wire, then emission order.
    pub fn ordered(&self) -> Vec<&PulseInstruction> {
        let mut ordered: Vec<_> = self.instructions.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.wire.cmp(&b.wire)));
        ordered
    }

    /// Render as a flat fixed-width table.
    pub fn to_table(&self) -> String {
        if self.instructions.is_empty() {
            return "(no pulse instructions)".to_string();
        }
        let header = format!(
            "{:>10} {:>8} {:>8} {:>10} details",
            "start(ns)", "dur(ns)", "wire", "kind"
        );
        let mut out = String::new();
        let _ = writeln!(out, "{header}");
        let _ = writeln!(out, "{}", "-".repeat(header.len()));
        for inst in self.ordered() {
            let _ = writeln!(
                out,
                "{:>10.1} {:>8.1} {:>8} {:>10} {}",
                inst.start,
                inst.duration,
                inst.label,
                inst.kind.name(),
                inst.details()
            );
        }
        let _ = write!(out, "Total duration: {:.1} ns", self.duration());
        out
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(&self.instructions)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(wire: u32, start: Time, duration: Time) -> PulseInstruction {
        PulseInstruction {
            wire: WireId(wire),
            label: format!("q[{wire}]"),
            kind: PulseKind::Wait { padding: false },
            start,
            duration,
            frame: Frame::default(),
            branch: None,
            conditions: vec![],
            origin: None,
        }
    }

    #[test]
    fn test_duration_and_grouping() {
        let mut schedule = PulseSchedule::new();
        schedule.push(wait(1, 10.0, 5.0));
        schedule.push(wait(0, 0.0, 30.0));
        schedule.push(wait(1, 0.0, 10.0));

        assert!((schedule.duration() - 30.0).abs() < 1e-12);
        let grouped = schedule.per_wire();
        assert_eq!(grouped[&WireId(1)].len(), 2);
        assert!(grouped[&WireId(1)][0].start < grouped[&WireId(1)][1].start);
    }

    #[test]
    fn test_table_has_total() {
        let mut schedule = PulseSchedule::new();
        schedule.push(wait(0, 0.0, 12.5));
        let table = schedule.to_table();
        assert!(table.contains("wait"));
        assert!(table.ends_with("Total duration: 12.5 ns"));
        assert_eq!(PulseSchedule::new().to_table(), "(no pulse instructions)");
    }

    #[test]
    fn test_json_export_is_flat() {
        let mut schedule = PulseSchedule::new();
        let mut inst = wait(0, 0.0, 4.0);
        inst.kind = PulseKind::Play {
            waveform: "Gaussian(amp: 0.2)".into(),
            channel: Some("d0".into()),
        };
        schedule.push(inst);

        let json = schedule.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["kind"], "play");
        assert_eq!(value[0]["channel"], "d0");
        assert_eq!(value[0]["label"], "q[0]");
    }

    #[test]
    fn test_frame_mutation() {
        let mut frame = Frame::default();
        frame.shift_phase(0.5);
        frame.shift_phase(0.25);
        frame.set_frequency(5.1e9);
        assert!((frame.phase - 0.75).abs() < 1e-12);
        assert_eq!(frame.frequency, Some(5.1e9));
    }
}
