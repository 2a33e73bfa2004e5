//! Operation argument and return values.
//!
//! The engine never inspects the data structure under test directly; it only
//! ever sees self-describing [`Value`]s flowing in (actor arguments) and
//! [`OpResult`]s flowing out (observed outcomes). Keeping both closed enums
//! gives the verifier a total, structural equality to compare against the
//! sequential model — no user-supplied `equals` contract to get wrong.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A self-describing operation argument or return value.
///
/// Deliberately small: concurrent data-structure operations overwhelmingly
/// take and return integers, booleans and short strings. Anything richer
/// belongs in the strategy layer, encoded down to these primitives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// The unit value (operations with no interesting payload).
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A short text value.
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

/// Name of an exception kind an operation may legitimately produce.
///
/// An exception listed in an actor's handled set is a *result*, not a test
/// failure: the sequential model is expected to produce the same exception
/// at the same point for the execution to be linearizable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExceptionName(pub String);

impl ExceptionName {
    /// Create an exception name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The underlying name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExceptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExceptionName {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

/// The observed outcome of a single actor.
///
/// `NoResult` marks an operation that never ran because the invocation was
/// cut short (for example the strategy aborted the schedule after detecting
/// a failure in another thread). The verifier treats a thread as exhausted
/// at its first `NoResult`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpResult {
    /// The operation returned a value.
    Value(Value),
    /// The operation returned without a value.
    Void,
    /// The operation raised an exception declared as a legitimate result.
    Exception(ExceptionName),
    /// The operation never ran.
    NoResult,
}

impl OpResult {
    /// Whether this outcome represents an operation that actually ran.
    pub fn ran(&self) -> bool {
        !matches!(self, OpResult::NoResult)
    }
}

impl fmt::Display for OpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpResult::Value(v) => write!(f, "{v}"),
            OpResult::Void => write!(f, "void"),
            OpResult::Exception(e) => write!(f, "{e}!"),
            OpResult::NoResult => write!(f, "<no result>"),
        }
    }
}

impl From<Value> for OpResult {
    fn from(v: Value) -> Self {
        OpResult::Value(v)
    }
}
