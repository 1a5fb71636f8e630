use log::trace;

/// A named label with optional documentation, used for guards and actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// The label shown in the chart.
    pub name: String,
    /// Free-text documentation.
    pub description: Option<String>,
}

impl Descriptor {
    /// Creates a descriptor with no documentation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// An asynchronous service invoked while in a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Name of the service source.
    pub src: String,
    /// Name of the state entered when the service completes.
    pub on_done: String,
    /// Name of the state entered when the service fails.
    pub on_error: String,
    /// Free-text documentation.
    pub description: Option<String>,
}

/// Declarative metadata recovered from one annotation chain.
///
/// Each annotation primitive contributes a partial record;
/// partial records of a chain are combined with [`Metadata::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Resolved name of the destination state.
    pub target: Option<String>,
    /// Free-text documentation of the transition.
    pub description: Option<String>,
    /// Guards, composed as a logical AND, outermost first.
    pub guards: Vec<Descriptor>,
    /// Side-effect actions, outermost first.
    pub actions: Vec<Descriptor>,
    /// Invoked service, at most one per member.
    pub invoke: Option<ServiceDescriptor>,
}

impl Metadata {
    /// A record setting only the target state.
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// A record setting only the description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// A record holding a single guard.
    pub fn with_guard(guard: Descriptor) -> Self {
        Self {
            guards: vec![guard],
            ..Self::default()
        }
    }

    /// A record holding a single action.
    pub fn with_action(action: Descriptor) -> Self {
        Self {
            actions: vec![action],
            ..Self::default()
        }
    }

    /// A record holding only an invoked service.
    pub fn with_invoke(invoke: ServiceDescriptor) -> Self {
        Self {
            invoke: Some(invoke),
            ..Self::default()
        }
    }

    /// Combines `self`, the record of an outer annotation, with the record of the annotation it wraps.
    ///
    /// Scalar fields set by the inner record are kept, the outer value only fills the gaps.
    /// Guards and actions are concatenated, outer ones first.
    pub fn merge(self, inner: Metadata) -> Metadata {
        trace!(target: "extractor", "merging {self:?} over {inner:?}");
        let mut guards = self.guards;
        guards.extend(inner.guards);
        let mut actions = self.actions;
        actions.extend(inner.actions);
        Metadata {
            target: inner.target.or(self.target),
            description: inner.description.or(self.description),
            guards,
            actions,
            invoke: inner.invoke.or(self.invoke),
        }
    }

    /// Whether the record describes a transition, i.e. has a target state.
    pub fn is_transition(&self) -> bool {
        self.target.is_some()
    }

    /// Whether the record carries anything the chart can represent.
    ///
    /// Records with neither target nor invoked service are discarded.
    pub fn is_emittable(&self) -> bool {
        self.target.is_some() || self.invoke.is_some()
    }

    /// The guard condition string: guard names joined with `" && "`.
    pub fn cond(&self) -> Option<String> {
        if self.guards.is_empty() {
            None
        } else {
            Some(
                self.guards
                    .iter()
                    .map(|guard| guard.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" && "),
            )
        }
    }

    /// Action names in declaration order.
    pub fn action_names(&self) -> Option<Vec<String>> {
        if self.actions.is_empty() {
            None
        } else {
            Some(self.actions.iter().map(|action| action.name.clone()).collect())
        }
    }
}
