//! Built-in post-lowering passes.
//!
//! - [`TrivialLayout`]: identity placement of wires onto the coupling map.
//! - [`SwapRouting`]: SWAP insertion until every gate's wires are connected.
//! - [`AncillaAudit`]: whole-circuit re-check of ancilla cleanliness.

mod layout;
mod routing;
mod verification;

pub use layout::TrivialLayout;
pub use routing::{RoutingReport, SwapRouting};
pub use verification::{AncillaAudit, AncillaAuditReport};

use std::ops::Range;

use psi_ir::Instruction;

/// Split `instructions` into runs sharing one origin and one set of
/// classical guards, i.e. one lowered statement.
pub(crate) fn statement_runs(instructions: &[Instruction]) -> Vec<Range<usize>> {
    let mut runs = vec![];
    let mut start = 0;
    while let Some(head) = instructions.get(start) {
        let end = instructions[start..]
            .iter()
            .position(|inst| inst.origin != head.origin || inst.conditions != head.conditions)
            .map_or(instructions.len(), |offset| start + offset);
        runs.push(start..end);
        start = end;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_ir::{ClassicalCondition, ClbitId, Span, StandardGate, WireId};

    #[test]
    fn test_statement_runs_split_on_origin_and_guards() {
        let a = Span::new(0, 1, 1, 1);
        let b = Span::new(2, 3, 2, 1);
        let h = |span| Instruction::single(StandardGate::H, WireId(0)).with_origin(span);
        let guarded = h(b).with_conditions([ClassicalCondition::bit(ClbitId(0), true)]);
        let instructions = vec![h(a), h(a), h(b), guarded, h(a)];

        assert_eq!(statement_runs(&instructions), vec![0..2, 2..3, 3..4, 4..5]);
        assert!(statement_runs(&[]).is_empty());
    }
}
