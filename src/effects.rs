//! Stand-in for the action/instruction program an entry carries, and the
//! `output_ports` extraction `ft_flow_set_effects`/
//! `out_port_list_populate_from_actions`/`_instructions` perform in
//! `original_source/.../ft.c`.

/// Egress port number.
pub type PortNo = u32;

/// A wildcard out-port, matching any port (never excluded by the out-port
/// filter in the meta-match predicate).
pub const PORT_WILDCARD: PortNo = u32::MAX;

/// A single OpenFlow-1.0-style action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Output(PortNo),
    /// Any other action kind; carried but not inspected for output ports.
    Other,
}

/// A single OpenFlow-1.1+-style instruction. Only `ApplyActions` /
/// `WriteActions` carry actions that contribute output ports, matching the
/// source's `out_port_list_populate_from_instructions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    ApplyActions(Vec<Action>),
    WriteActions(Vec<Action>),
    /// Any other instruction kind (goto-table, metadata, meter...).
    Other,
}

/// The action program installed on an entry: the v1.0 actions-list vs.
/// v1.1+ instructions-list split `ft_flow_set_effects` handles in `ft.c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effects {
    Actions(Vec<Action>),
    Instructions(Vec<Instruction>),
}

impl Effects {
    /// Derive the output-port list the same way
    /// `out_port_list_populate_from_actions`/`_instructions` do, recomputed
    /// on every effects change. Order is insertion order; duplicates are
    /// preserved since filtering only asks "contains".
    pub fn output_ports(&self) -> Vec<PortNo> {
        let mut ports = Vec::new();
        match self {
            Effects::Actions(actions) => collect_from_actions(actions, &mut ports),
            Effects::Instructions(instructions) => {
                for instr in instructions {
                    match instr {
                        Instruction::ApplyActions(actions) | Instruction::WriteActions(actions) => {
                            collect_from_actions(actions, &mut ports)
                        }
                        Instruction::Other => {}
                    }
                }
            }
        }
        ports
    }
}

fn collect_from_actions(actions: &[Action], out: &mut Vec<PortNo>) {
    for action in actions {
        if let Action::Output(port) = action {
            out.push(*port);
        }
    }
}
