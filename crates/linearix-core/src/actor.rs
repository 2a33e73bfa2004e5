//! Operations and actors.
//!
//! An [`Actor`] is one concrete operation invocation inside a scenario:
//! an operation identity plus bound arguments. Operation identities are
//! indices into an [`OperationCatalog`], the explicit-registration seam that
//! replaces reflective discovery — the engine only ever sees catalog entries
//! and actor values, never metadata about the structure under test.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{ExceptionName, Value};

/// Identity of an operation within an [`OperationCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub usize);

impl OperationId {
    /// Create a new operation id.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw index.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Description of one operation the structure under test exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Human-readable operation name, used in reports.
    pub name: String,
    /// Number of arguments the operation takes.
    pub arity: usize,
    /// Whether the operation may suspend (cooperatively park) mid-call.
    ///
    /// Suspendable operations constrain scenario shape: see
    /// [`ExecutionScenario::validate`](crate::scenario::ExecutionScenario::validate).
    pub suspendable: bool,
    /// Exception kinds this operation may produce as legitimate results.
    pub handled_exceptions: Vec<ExceptionName>,
}

impl OperationDescriptor {
    /// Descriptor for an ordinary (non-suspendable) operation.
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            suspendable: false,
            handled_exceptions: Vec::new(),
        }
    }

    /// Mark the operation as suspendable.
    pub fn suspendable(mut self) -> Self {
        self.suspendable = true;
        self
    }

    /// Declare an exception kind as a legitimate result.
    pub fn handles(mut self, exception: impl Into<ExceptionName>) -> Self {
        self.handled_exceptions.push(exception.into());
        self
    }
}

/// Immutable registry of the operations a test exposes.
///
/// Populated once, up front, by whoever assembles the test (builder code,
/// a derive layer, declarative config). Everything downstream — generator,
/// strategy, verifier — resolves [`OperationId`]s against it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationCatalog {
    operations: Vec<OperationDescriptor>,
}

impl OperationCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation, returning its id.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> OperationId {
        let id = OperationId::new(self.operations.len());
        self.operations.push(descriptor);
        id
    }

    /// Look up a descriptor.
    pub fn get(&self, id: OperationId) -> Option<&OperationDescriptor> {
        self.operations.get(id.as_usize())
    }

    /// All registered operations, in registration order.
    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether any registered operation is suspendable.
    pub fn has_suspendable_operations(&self) -> bool {
        self.operations.iter().any(|op| op.suspendable)
    }

    /// Build an actor for `id` with the given arguments.
    ///
    /// Copies the descriptor's suspendability flag and handled exceptions
    /// onto the actor so scenarios stay self-contained values.
    pub fn actor(&self, id: OperationId, args: Vec<Value>) -> Actor {
        let descriptor = &self.operations[id.as_usize()];
        Actor {
            op: id,
            args,
            handled_exceptions: descriptor.handled_exceptions.clone(),
            suspendable: descriptor.suspendable,
        }
    }

    /// Render an actor as `name(arg, arg)` for reports.
    pub fn render(&self, actor: &Actor) -> String {
        let name = self
            .get(actor.op)
            .map(|d| d.name.as_str())
            .unwrap_or("<unknown>");
        let args = actor
            .args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{name}({args})")
    }
}

/// One operation invocation: operation identity plus bound arguments.
///
/// Immutable once constructed. The handled-exception list and the
/// suspendability flag are denormalized from the catalog so a scenario can
/// be validated and minimized without consulting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// The operation to invoke.
    pub op: OperationId,
    /// Bound argument values, in declaration order.
    pub args: Vec<Value>,
    /// Exception kinds treated as legitimate results for this invocation.
    pub handled_exceptions: Vec<ExceptionName>,
    /// Whether the operation may suspend mid-call.
    pub suspendable: bool,
}

impl Actor {
    /// Create an ordinary actor with no handled exceptions.
    pub fn new(op: OperationId, args: Vec<Value>) -> Self {
        Self {
            op,
            args,
            handled_exceptions: Vec::new(),
            suspendable: false,
        }
    }

    /// Whether this actor declares any exception as a legitimate result.
    pub fn handles_exceptions(&self) -> bool {
        !self.handled_exceptions.is_empty()
    }

    /// Whether `exception` is declared as a legitimate result.
    pub fn handles(&self, exception: &ExceptionName) -> bool {
        self.handled_exceptions.contains(exception)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.op, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (OperationCatalog, OperationId, OperationId) {
        let mut catalog = OperationCatalog::new();
        let push = catalog.register(OperationDescriptor::new("push", 1));
        let pop = catalog.register(OperationDescriptor::new("pop", 0).handles("Empty"));
        (catalog, push, pop)
    }

    #[test]
    fn test_register_and_lookup() {
        let (catalog, push, pop) = catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(push).unwrap().name, "push");
        assert_eq!(catalog.get(pop).unwrap().handled_exceptions.len(), 1);
    }

    #[test]
    fn test_actor_inherits_descriptor_flags() {
        let (catalog, _, pop) = catalog();
        let actor = catalog.actor(pop, vec![]);
        assert!(actor.handles_exceptions());
        assert!(actor.handles(&"Empty".into()));
        assert!(!actor.suspendable);
    }

    #[test]
    fn test_render() {
        let (catalog, push, _) = catalog();
        let actor = catalog.actor(push, vec![Value::Int(7)]);
        assert_eq!(catalog.render(&actor), "push(7)");
    }

    #[test]
    fn test_suspendable_descriptor() {
        let mut catalog = OperationCatalog::new();
        let recv = catalog.register(OperationDescriptor::new("receive", 0).suspendable());
        assert!(catalog.has_suspendable_operations());
        assert!(catalog.actor(recv, vec![]).suspendable);
    }
}
