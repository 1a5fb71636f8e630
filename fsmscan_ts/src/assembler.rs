use crate::annotation::parse_chain;
use crate::source::Declaration;
use fsmscan_core::{InvokeSpec, StateNode, TransitionSpec};
use log::{debug, trace};

/// Builds the chart node of one state definition.
///
/// Every member initialized with an annotation chain contributes:
/// an invoked service goes to `invoke`, a target to `on` under the member name.
/// One member can contribute both. Other members are ordinary behavior and are left out.
pub fn assemble_state(declaration: &Declaration<'_>) -> StateNode {
    let mut node = StateNode::default();
    for member in declaration.members() {
        let Some(initializer) = member.initializer else {
            trace!(target: "extractor", "{}.{} has no initializer", declaration.name, member.name);
            continue;
        };
        let Some(metadata) = parse_chain(initializer) else {
            debug!(
                target: "extractor",
                "{}.{} (line {}) is not an annotated transition",
                declaration.name,
                member.name,
                member.line
            );
            continue;
        };
        if !metadata.is_emittable() {
            debug!(
                target: "extractor",
                "{}.{} (line {}) declares neither a target nor a service",
                declaration.name,
                member.name,
                member.line
            );
            continue;
        }
        if let Some(service) = &metadata.invoke {
            node.invoke.push(InvokeSpec::from(service));
        }
        if let Some(transition) = TransitionSpec::from_metadata(&metadata) {
            if node.on.insert(member.name.clone(), transition).is_some() {
                debug!(target: "extractor", "{}.{} is declared twice, the last one is kept", declaration.name, member.name);
            }
        }
    }
    node
}
