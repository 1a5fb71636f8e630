//! Parsing of nested annotation chains such as
//! `describe("go", guard({ name: "ready" }, target(Green, impl)))`.

use crate::literal::{parse_descriptor, parse_literal, property_key, string_value};
use crate::resolver::{UNKNOWN, resolve_name};
use crate::syntax::Syntax;
use fsmscan_core::{Metadata, ServiceDescriptor};
use log::{debug, trace, warn};
use serde_json::Value;
use std::fmt;

/// The annotation forms recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// `target(State, impl)`: declares the destination state.
    Target,
    /// `describe(text, inner)`
    Describe,
    /// `guard(descriptor, inner)`
    Guard,
    /// `invoke(service, impl)`: an asynchronous service.
    Invoke,
    /// `action(descriptor, inner)`
    Action,
}

impl Primitive {
    /// The primitive called `name`, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "target" => Some(Primitive::Target),
            "describe" => Some(Primitive::Describe),
            "guard" => Some(Primitive::Guard),
            "invoke" => Some(Primitive::Invoke),
            "action" => Some(Primitive::Action),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Target => "target",
            Primitive::Describe => "describe",
            Primitive::Guard => "guard",
            Primitive::Invoke => "invoke",
            Primitive::Action => "action",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A call to one of the primitives.
#[derive(Debug)]
struct Annotation<'a> {
    primitive: Primitive,
    call: Syntax<'a>,
    args: Vec<Syntax<'a>>,
}

impl<'a> Annotation<'a> {
    /// Recognizes `node` as a call to a primitive, either bare (`target(..)`)
    /// or through a member access (`fsm.target(..)`).
    fn from_syntax(node: Syntax<'a>) -> Option<Self> {
        let call = node.unwrap_transparent();
        if call.kind() != "call_expression" {
            return None;
        }
        let callee = call.field("function")?.unwrap_transparent();
        let name = match callee.kind() {
            "identifier" => callee.text(),
            "member_expression" => callee.field("property")?.text(),
            _ => return None,
        };
        let primitive = Primitive::from_name(name)?;
        let args = call
            .field("arguments")
            .map(|args| args.named_children())
            .unwrap_or_default();
        Some(Annotation {
            primitive,
            call,
            args,
        })
    }

    fn arg(&self, index: usize) -> Option<Syntax<'a>> {
        let arg = self.args.get(index).copied();
        if arg.is_none() {
            debug!(target: "extractor", "`{}` call at line {} has no argument {index}", self.primitive, self.call.line());
        }
        arg
    }

    /// The partial record contributed by this call, and the wrapped expression to continue with.
    fn contribution(&self) -> (Metadata, Option<Syntax<'a>>) {
        match self.primitive {
            Primitive::Target => {
                // `target(State, impl)` names the state first, `target<typeof State>(impl)` only in its type
                let type_argument = || {
                    self.call
                        .field("type_arguments")
                        .and_then(|types| types.first_named_child())
                };
                let reference = if self.args.len() >= 2 {
                    self.arg(0)
                } else {
                    type_argument().or_else(|| self.arg(0))
                };
                let target = reference.map_or_else(
                    || {
                        warn!(target: "extractor", "`target` call at line {} names no state", self.call.line());
                        UNKNOWN.to_string()
                    },
                    resolve_name,
                );
                (Metadata::with_target(target), None)
            }
            Primitive::Describe => {
                let description = self.arg(0).map(Syntax::unwrap_transparent).and_then(string_value);
                if description.is_none() {
                    debug!(target: "extractor", "`describe` at line {} has no string description", self.call.line());
                }
                let metadata = description.map(Metadata::with_description).unwrap_or_default();
                (metadata, self.arg(1))
            }
            Primitive::Guard => {
                let metadata = self.descriptor().map(Metadata::with_guard).unwrap_or_default();
                (metadata, self.arg(1))
            }
            Primitive::Action => {
                let metadata = self.descriptor().map(Metadata::with_action).unwrap_or_default();
                (metadata, self.arg(1))
            }
            Primitive::Invoke => {
                let metadata = self
                    .arg(0)
                    .and_then(parse_service)
                    .map(Metadata::with_invoke)
                    .unwrap_or_default();
                // the second argument is usually the implementation, only an annotation continues the chain
                let next = self
                    .args
                    .get(1)
                    .copied()
                    .filter(|arg| Annotation::from_syntax(*arg).is_some());
                (metadata, next)
            }
        }
    }

    fn descriptor(&self) -> Option<fsmscan_core::Descriptor> {
        let descriptor = self.arg(0).and_then(parse_descriptor);
        if descriptor.is_none() {
            debug!(target: "extractor", "malformed `{}` descriptor at line {}", self.primitive, self.call.line());
        }
        descriptor
    }
}

/// Reads `{ src, onDone, onError, description? }`.
/// A service without `src` is malformed; missing transitions resolve to `"unknown"`.
fn parse_service(node: Syntax<'_>) -> Option<ServiceDescriptor> {
    let node = node.unwrap_transparent();
    if node.kind() != "object" {
        debug!(target: "extractor", "invoked service {node:?} is not an object");
        return None;
    }
    let mut src = None;
    let mut on_done = None;
    let mut on_error = None;
    let mut description = None;
    for property in node.named_children() {
        let (key, value) = match property.kind() {
            "pair" => match (property.field("key").and_then(property_key), property.field("value")) {
                (Some(key), Some(value)) => (key, value),
                _ => continue,
            },
            "shorthand_property_identifier" => (property.text().to_string(), property),
            _ => continue,
        };
        match key.as_str() {
            "src" => {
                if let Some(Value::String(name)) = parse_literal(value) {
                    src = Some(name);
                }
            }
            "onDone" => on_done = Some(resolve_name(value)),
            "onError" => on_error = Some(resolve_name(value)),
            "description" => description = string_value(value),
            other => trace!(target: "extractor", "ignoring service property `{other}`"),
        }
    }
    let Some(src) = src.filter(|src| !src.is_empty()) else {
        debug!(target: "extractor", "invoked service at line {} has no `src`", node.line());
        return None;
    };
    Some(ServiceDescriptor {
        on_done: on_done.unwrap_or_else(|| UNKNOWN.to_string()),
        on_error: on_error.unwrap_or_else(|| UNKNOWN.to_string()),
        src,
        description,
    })
}

/// Whether `node` is a call to one of the primitives.
pub fn is_annotation(node: Syntax<'_>) -> bool {
    Annotation::from_syntax(node).is_some()
}

/// Recovers the metadata declared by an annotation chain.
///
/// The chain is walked from the outermost call inwards; an unknown callee,
/// a non-call argument or a missing argument ends the walk and keeps what was collected.
/// Partial records are merged innermost first, see [`Metadata::merge`].
///
/// Returns `None` when `node` itself is not a call to a primitive.
pub fn parse_chain(node: Syntax<'_>) -> Option<Metadata> {
    let mut annotation = Annotation::from_syntax(node)?;
    let mut partials = Vec::new();
    loop {
        trace!(target: "extractor", "parsing `{}` at line {}", annotation.primitive, annotation.call.line());
        let (partial, next) = annotation.contribution();
        partials.push(partial);
        let Some(next) = next else {
            break;
        };
        match Annotation::from_syntax(next) {
            Some(inner) => annotation = inner,
            None => {
                trace!(target: "extractor", "chain ends at {next:?}");
                break;
            }
        }
    }
    partials
        .into_iter()
        .rev()
        .reduce(|inner, outer| outer.merge(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::testing::*;
    use fsmscan_core::Descriptor;

    fn chain(expr: &str) -> Option<Metadata> {
        let file = parse(&format!("const x = {expr};"));
        parse_chain(value_of(&file, "x"))
    }

    #[test]
    fn primitive_names() {
        for name in ["target", "describe", "guard", "invoke", "action"] {
            let primitive = Primitive::from_name(name).expect("known primitive");
            assert_eq!(primitive.name(), name);
        }
        assert_eq!(Primitive::from_name("transition"), None);
    }

    #[test]
    fn describe_action_target() {
        let metadata =
            chain(r#"describe("go green", action({ name: "log" }, target(Green, (ctx) => ctx)))"#)
                .expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Green"));
        assert_eq!(metadata.description.as_deref(), Some("go green"));
        assert_eq!(metadata.actions, vec![Descriptor::new("log")]);
        assert!(metadata.guards.is_empty());
        assert!(metadata.invoke.is_none());
    }

    #[test]
    fn composition_order_is_irrelevant() {
        let a = chain(r#"describe("d", guard({ name: "g" }, target(A, f)))"#);
        let b = chain(r#"guard({ name: "g" }, describe("d", target(A, f)))"#);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn guards_accumulate_outer_first() {
        let metadata = chain(r#"guard({ name: "a" }, guard({ name: "b" }, target(X, f)))"#)
            .expect("annotation chain");
        assert_eq!(metadata.cond().as_deref(), Some("a && b"));
    }

    #[test]
    fn typed_target() {
        let metadata = chain("target<typeof Green>((ctx) => ctx)").expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Green"));
        let metadata = chain("fsm.target(typeof Yellow, f)").expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Yellow"));
    }

    #[test]
    fn state_argument_wins_over_context_type() {
        let metadata = chain("target<Ctx>(Green, (ctx) => ctx)").expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Green"));
        let metadata = chain("target(Green)").expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Green"));
    }

    #[test]
    fn unresolvable_target() {
        let metadata = chain("target(states[0], f)").expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some(UNKNOWN));
    }

    #[test]
    fn invoke_with_target() {
        let metadata = chain(
            r#"invoke({ src: "fetchUser", onDone: Loaded, onError: typeof Failed, description: "load" },
                      target(Loading, f))"#,
        )
        .expect("annotation chain");
        assert_eq!(metadata.target.as_deref(), Some("Loading"));
        assert_eq!(
            metadata.invoke,
            Some(ServiceDescriptor {
                src: "fetchUser".to_string(),
                on_done: "Loaded".to_string(),
                on_error: "Failed".to_string(),
                description: Some("load".to_string()),
            })
        );
    }

    #[test]
    fn invoke_alone() {
        let metadata = chain(r#"invoke({ src: "poll" }, async () => fetch())"#).expect("annotation chain");
        assert!(!metadata.is_transition());
        let service = metadata.invoke.expect("invoked service");
        assert_eq!(service.on_done, UNKNOWN);
        assert_eq!(service.on_error, UNKNOWN);
        assert!(chain(r#"invoke({ onDone: A }, f)"#).is_some_and(|metadata| !metadata.is_emittable()));
    }

    #[test]
    fn unknown_callees_stop_the_chain() {
        assert_eq!(chain("transition(Green, f)"), None);
        assert_eq!(chain("42"), None);
        let metadata = chain(r#"describe("kept", wrap(target(Green, f)))"#).expect("annotation chain");
        assert_eq!(metadata.description.as_deref(), Some("kept"));
        assert!(!metadata.is_emittable());
    }

    #[test]
    fn malformed_descriptors_are_absent() {
        let metadata = chain(r#"guard({ description: "nameless" }, action(42, target(A, f)))"#)
            .expect("annotation chain");
        assert!(metadata.guards.is_empty());
        assert!(metadata.actions.is_empty());
        assert_eq!(metadata.target.as_deref(), Some("A"));
    }

    #[test]
    fn detects_annotations() {
        let file = parse("const a = describe(\"x\", target(A, f)); const b = compute(1);");
        assert!(is_annotation(value_of(&file, "a")));
        assert!(!is_annotation(value_of(&file, "b")));
    }
}
