//! SWAP routing with mandatory swap-back.

use serde::Serialize;
use tracing::{debug, warn};

use psi_ir::{Circuit, Instruction, Span, WireId};

use super::statement_runs;
use crate::config::ErrorPolicy;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

/// What routing did to the circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingReport {
    /// Gates that needed SWAPs.
    pub routed_gates: usize,
    /// SWAPs inserted, both directions counted.
    pub inserted_swaps: usize,
    /// Statements replaced by a marker because some gate of theirs has no
    /// path (collect policy).
    pub unroutable: usize,
}

/// Routing pass.
///
/// A gate is routable once the positions of its wires form a connected
/// subgraph of the coupling map. The last wire (the target) stays put; every
/// other wire that does not yet touch the gathered set is moved along a
/// shortest path that avoids it. The gate is applied and the SWAPs are
/// replayed in reverse, so the layout is the same before and after every
/// routed gate and logical addressing never changes. The SWAPs inherit the
/// gate's origin and classical guards.
///
/// Statements are routed whole. Under [`ErrorPolicy::Collect`], a statement
/// with an unreachable pair is replaced by a single marker carrying its
/// guards, so no ancilla block is ever cut in half.
pub struct SwapRouting {
    policy: ErrorPolicy,
}

/// Two wires with no coupling path between them.
struct Unreachable {
    wires: (WireId, WireId),
    origin: Option<Span>,
}

#[derive(Default)]
struct RoutedRun {
    instructions: Vec<Instruction>,
    routed_gates: usize,
    inserted_swaps: usize,
}

impl SwapRouting {
    /// Create a routing pass reporting unreachable pairs per `policy`.
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    fn route_run(
        &self,
        run: &[Instruction],
        map: &CouplingMap,
        layout: &mut Layout,
    ) -> CompileResult<Result<RoutedRun, Unreachable>> {
        let snapshot = layout.clone();
        let mut routed = RoutedRun::default();

        for inst in run {
            let wires: Vec<WireId> = inst.wires().collect();
            if !inst.is_gate() || wires.len() < 2 {
                let mut inst = inst.clone();
                remap(&mut inst, layout)?;
                routed.instructions.push(inst);
                continue;
            }

            let hops = match gather(map, layout, &wires)? {
                Ok(hops) => hops,
                Err(wires) => {
                    return Ok(Err(Unreachable {
                        wires,
                        origin: inst.origin,
                    }));
                }
            };
            if !hops.is_empty() {
                debug!("routing {} on {} wires with {} swaps", inst.name(), wires.len(), hops.len());
            }

            // `gather` already applied the hops to the layout.
            for &(p1, p2) in &hops {
                routed.instructions.push(transient_swap(inst, p1, p2));
            }
            let mut gate = inst.clone();
            remap(&mut gate, layout)?;
            routed.instructions.push(gate);
            for &(p1, p2) in hops.iter().rev() {
                routed.instructions.push(transient_swap(inst, p1, p2));
                layout.swap(p1, p2);
            }

            if *layout != snapshot {
                return Err(CompileError::PassFailed {
                    name: self.name().into(),
                    reason: format!("layout changed across the routed {}", inst.name()),
                });
            }
            if !hops.is_empty() {
                routed.routed_gates += 1;
                routed.inserted_swaps += 2 * hops.len();
            }
        }
        Ok(Ok(routed))
    }
}

impl Pass for SwapRouting {
    fn name(&self) -> &'static str {
        "swap_routing"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let mut layout = properties
            .layout
            .clone()
            .ok_or(CompileError::MissingLayout)?;
        let snapshot = layout.clone();
        let mut report = RoutingReport::default();

        let instructions = circuit.take_instructions();
        for range in statement_runs(&instructions) {
            let run = &instructions[range];
            match self.route_run(run, coupling_map, &mut layout)? {
                Ok(routed) => {
                    for inst in routed.instructions {
                        circuit.push(inst)?;
                    }
                    report.routed_gates += routed.routed_gates;
                    report.inserted_swaps += routed.inserted_swaps;
                }
                Err(Unreachable { wires: (a, b), origin }) => {
                    let labels = (circuit.wire_label(a), circuit.wire_label(b));
                    if self.policy == ErrorPolicy::Halt {
                        return Err(CompileError::Topology {
                            wires: labels,
                            span: origin,
                        });
                    }
                    warn!("no coupling path between {} and {}", labels.0, labels.1);
                    layout = snapshot.clone();
                    report.unroutable += 1;
                    let reason = format!("no coupling path between {} and {}", labels.0, labels.1);
                    let marker = Instruction::unsupported(reason, origin.unwrap_or_default())
                        .with_conditions(run[0].conditions.iter().cloned());
                    circuit.push(marker)?;
                }
            }
        }

        if report.inserted_swaps > 0 {
            warn!(
                "routing inserted {} swaps for {} gates",
                report.inserted_swaps, report.routed_gates
            );
        }
        properties.insert(report);
        Ok(())
    }

    fn should_run(&self, _circuit: &Circuit, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.layout.is_some()
    }
}

fn physical(layout: &Layout, wire: WireId) -> CompileResult<u32> {
    layout.get_physical(wire).ok_or(CompileError::MissingLayout)
}

/// Move the wires of one gate onto connected positions.
///
/// Returns the SWAPs applied to `layout`, or the first wire that cannot
/// reach the gathered set together with the gate's target.
fn gather(
    map: &CouplingMap,
    layout: &mut Layout,
    wires: &[WireId],
) -> CompileResult<Result<Vec<(u32, u32)>, (WireId, WireId)>> {
    let positions = wires
        .iter()
        .map(|&w| physical(layout, w))
        .collect::<CompileResult<Vec<_>>>()?;
    if map.is_connected_set(&positions) {
        return Ok(Ok(vec![]));
    }

    let Some((&anchor, rest)) = wires.split_last() else {
        return Ok(Ok(vec![]));
    };
    let mut placed = vec![physical(layout, anchor)?];
    let mut pending = rest.to_vec();
    let mut hops = vec![];

    while !pending.is_empty() {
        let mut next = None;
        for (i, &wire) in pending.iter().enumerate() {
            let p = physical(layout, wire)?;
            if placed.iter().any(|&q| map.is_connected(p, q)) {
                next = Some((i, p));
                break;
            }
        }
        if let Some((i, p)) = next {
            pending.remove(i);
            placed.push(p);
            continue;
        }

        let wire = pending.remove(0);
        let Some(path) = map.path_to_group(physical(layout, wire)?, &placed) else {
            return Ok(Err((wire, anchor)));
        };
        for step in path.windows(2) {
            hops.push((step[0], step[1]));
            layout.swap(step[0], step[1]);
        }
        placed.extend(path.last().copied());
    }
    Ok(Ok(hops))
}

fn remap(inst: &mut Instruction, layout: &Layout) -> CompileResult<()> {
    let mut missing = false;
    inst.map_wires(|w| match layout.get_physical(w) {
        Some(p) => WireId(p),
        None => {
            missing = true;
            w
        }
    });
    if missing {
        return Err(CompileError::MissingLayout);
    }
    Ok(())
}

fn transient_swap(gate: &Instruction, p1: u32, p2: u32) -> Instruction {
    let mut swap = Instruction::swap(WireId(p1), WireId(p2))
        .with_conditions(gate.conditions.iter().cloned());
    swap.origin = gate.origin;
    swap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::TrivialLayout;
    use psi_ir::{ClassicalCondition, Control, Span, StandardGate};

    fn route(
        circuit: &mut Circuit,
        map: CouplingMap,
        policy: ErrorPolicy,
    ) -> CompileResult<PropertySet> {
        let mut props = PropertySet::new().with_coupling_map(map);
        TrivialLayout.run(circuit, &mut props)?;
        SwapRouting::new(policy).run(circuit, &mut props)?;
        Ok(props)
    }

    #[test]
    fn test_adjacent_gate_is_untouched() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit.h(q[0]).unwrap().cx(q[0], q[1]).unwrap();

        let props = route(&mut circuit, CouplingMap::linear(2), ErrorPolicy::Halt).unwrap();
        assert_eq!(circuit.num_ops(), 2);
        assert_eq!(props.get::<RoutingReport>(), Some(&RoutingReport::default()));
    }

    #[test]
    fn test_swap_chain_is_mirrored() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 4).unwrap();
        let span = Span::new(0, 4, 1, 1);
        let cx = Instruction::controlled(StandardGate::X, [Control::positive(q[0])], q[3]);
        circuit.push(cx.with_origin(span)).unwrap();

        let props = route(&mut circuit, CouplingMap::linear(4), ErrorPolicy::Halt).unwrap();
        let names: Vec<_> = circuit.instructions().iter().map(Instruction::name).collect();
        assert_eq!(names, vec!["swap", "swap", "cx", "swap", "swap"]);

        let insts = circuit.instructions();
        assert_eq!(insts[0].targets, vec![WireId(0), WireId(1)]);
        assert_eq!(insts[1].targets, vec![WireId(1), WireId(2)]);
        assert_eq!(insts[2].controls[0].wire, WireId(2));
        assert_eq!(insts[2].targets, vec![WireId(3)]);
        assert_eq!(insts[3].targets, vec![WireId(1), WireId(2)]);
        assert_eq!(insts[4].targets, vec![WireId(0), WireId(1)]);
        assert!(insts.iter().all(|i| i.origin == Some(span)));

        let report = props.get::<RoutingReport>().unwrap();
        assert_eq!(report.routed_gates, 1);
        assert_eq!(report.inserted_swaps, 4);
        assert_eq!(props.layout, Some(Layout::trivial(4)));
    }

    #[test]
    fn test_no_path_halts_with_topology_error() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 3).unwrap();
        circuit.cz(q[0], q[2]).unwrap();

        let map = CouplingMap::from_edges(3, [(0, 1)]);
        let err = route(&mut circuit, map, ErrorPolicy::Halt).unwrap_err();
        let CompileError::Topology { wires, .. } = err else {
            panic!("expected topology error");
        };
        assert_eq!(wires, ("q[0]".to_string(), "q[2]".to_string()));
    }

    #[test]
    fn test_no_path_collects_marker() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 3).unwrap();
        let cz = Instruction::controlled(StandardGate::Z, [Control::positive(q[0])], q[2]);
        circuit.push(cz.with_origin(Span::new(0, 4, 1, 1))).unwrap();
        circuit
            .push(Instruction::single(StandardGate::H, q[1]).with_origin(Span::new(5, 9, 2, 1)))
            .unwrap();

        let map = CouplingMap::from_edges(3, [(0, 1)]);
        let props = route(&mut circuit, map, ErrorPolicy::Collect).unwrap();
        assert!(circuit.instructions()[0].is_unsupported());
        assert_eq!(circuit.num_ops(), 2);
        assert_eq!(props.get::<RoutingReport>().unwrap().unroutable, 1);
    }

    #[test]
    fn test_unroutable_statement_becomes_one_guarded_marker() {
        // A compute/uncompute block whose middle gate cannot be routed.
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 4).unwrap();
        let c = circuit.add_clbit();
        let guard = ClassicalCondition::bit(c, true);
        let span = Span::new(0, 9, 3, 1);
        let ccx = |a: WireId, b: WireId, t: WireId| {
            Instruction::controlled(StandardGate::X, [Control::positive(a), Control::positive(b)], t)
                .with_origin(span)
                .with_conditions([guard.clone()])
        };
        circuit.push(ccx(q[0], q[1], q[2])).unwrap();
        circuit.push(ccx(q[1], q[2], q[3])).unwrap();
        circuit.push(ccx(q[0], q[1], q[2])).unwrap();

        let map = CouplingMap::from_edges(4, [(0, 1), (1, 2)]);
        let props = route(&mut circuit, map, ErrorPolicy::Collect).unwrap();
        let insts = circuit.instructions();
        assert_eq!(insts.len(), 1);
        assert!(insts[0].is_unsupported());
        assert_eq!(insts[0].origin, Some(span));
        assert_eq!(insts[0].conditions, vec![guard]);
        assert_eq!(props.get::<RoutingReport>().unwrap().unroutable, 1);
        assert_eq!(props.layout, Some(Layout::trivial(4)));
    }

    #[test]
    fn test_three_wire_gate_is_gathered() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 5).unwrap();
        circuit.ccx(q[0], q[4], q[2]).unwrap();

        let map = CouplingMap::linear(5);
        let props = route(&mut circuit, map.clone(), ErrorPolicy::Halt).unwrap();
        let insts = circuit.instructions();
        let gate = insts.iter().find(|i| i.controls.len() == 2).unwrap();
        let positions: Vec<u32> = gate.wires().map(|w| w.0).collect();
        assert!(map.is_connected_set(&positions), "{positions:?}");
        assert_eq!(gate.targets, vec![WireId(2)]);

        // q[0] walks to 1, q[4] walks to 3, then both walk back.
        let report = props.get::<RoutingReport>().unwrap();
        assert_eq!(report.routed_gates, 1);
        assert_eq!(report.inserted_swaps, 4);
        assert_eq!(props.layout, Some(Layout::trivial(5)));
    }

    #[test]
    fn test_connected_multi_wire_gate_is_untouched() {
        // On a star, hub plus two leaves is connected even though the
        // leaves are not adjacent.
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 4).unwrap();
        circuit.ccx(q[1], q[3], q[0]).unwrap();

        let props = route(&mut circuit, CouplingMap::star(4), ErrorPolicy::Halt).unwrap();
        assert_eq!(circuit.num_ops(), 1);
        assert_eq!(props.get::<RoutingReport>().unwrap().routed_gates, 0);
    }

    #[test]
    fn test_leaf_target_pulls_controls_through_the_hub() {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_qreg("q", 4).unwrap();
        circuit.ccx(q[1], q[2], q[3]).unwrap();

        let map = CouplingMap::star(4);
        route(&mut circuit, map.clone(), ErrorPolicy::Halt).unwrap();
        for inst in circuit.instructions() {
            let positions: Vec<u32> = inst.wires().map(|w| w.0).collect();
            assert!(map.is_connected_set(&positions), "{} on {positions:?}", inst.name());
        }
        let swaps = circuit.count_ops().get("swap").copied().unwrap_or(0);
        assert_eq!(swaps % 2, 0);
        assert!(swaps > 0);
    }
}
