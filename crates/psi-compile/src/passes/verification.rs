//! Whole-circuit ancilla audit.
//!
//! Synthesis already verifies every ancilla block when it releases the
//! ancilla. This pass repeats the check on the final circuit, after routing
//! has interleaved SWAPs, so that a defect in a later pass cannot leave an
//! ancilla entangled either.

use serde::Serialize;
use tracing::debug;

use psi_ir::{Circuit, Instruction, WireId};

use super::statement_runs;
use crate::ancilla::{Verification, verify_clean};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Outcome of the ancilla audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AncillaAuditReport {
    /// Ancilla-touching segments checked.
    pub segments: usize,
    /// Segments checked by enumerating basis inputs.
    pub exhaustive: usize,
    /// Segments accepted by mirror structure.
    pub structural: usize,
}

/// Analysis pass that re-verifies ancilla cleanliness.
///
/// Instructions are grouped into runs sharing one origin and one set of
/// classical guards, i.e. one lowered statement, and runs are cut at
/// unsupported markers, which act on no wire. Within each piece, the
/// stretch from the first to the last instruction touching an ancilla wire
/// must return every ancilla to |0⟩.
pub struct AncillaAudit;

impl Pass for AncillaAudit {
    fn name(&self) -> &'static str {
        "ancilla_audit"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let mut report = AncillaAuditReport::default();
        let instructions = circuit.instructions();

        let pieces = statement_runs(instructions)
            .into_iter()
            .flat_map(|range| instructions[range].split(Instruction::is_unsupported));
        for group in pieces {
            let touches = |inst: &Instruction| inst.wires().any(|w| circuit.is_ancilla(w));
            let (Some(first), Some(last)) = (
                group.iter().position(touches),
                group.iter().rposition(touches),
            ) else {
                continue;
            };
            let segment = &group[first..=last];
            let mut ancillas: Vec<WireId> = vec![];
            for wire in segment.iter().flat_map(Instruction::wires) {
                if circuit.is_ancilla(wire) && !ancillas.contains(&wire) {
                    ancillas.push(wire);
                }
            }

            report.segments += 1;
            match verify_clean(segment, &ancillas) {
                Ok(Verification::Exhaustive { .. }) => report.exhaustive += 1,
                Ok(Verification::Structural) => report.structural += 1,
                Err(leak) => {
                    let origin = segment[0].origin;
                    let allocation = circuit
                        .ancillas()
                        .iter()
                        .rev()
                        .find(|a| a.wire == leak.wire && a.origin == origin)
                        .or_else(|| circuit.ancillas().iter().rev().find(|a| a.wire == leak.wire));
                    return Err(match allocation {
                        Some(a) => CompileError::AncillaLeak {
                            ancilla: a.id,
                            slot: a.slot,
                            detail: leak.detail,
                        },
                        None => CompileError::PassFailed {
                            name: self.name().into(),
                            reason: format!(
                                "{} is not in the allocation table: {}",
                                circuit.wire_label(leak.wire),
                                leak.detail
                            ),
                        },
                    });
                }
            }
        }

        debug!(
            "ancilla audit: {} segments ({} exhaustive, {} structural)",
            report.segments, report.exhaustive, report.structural
        );
        properties.insert(report);
        Ok(())
    }
}
