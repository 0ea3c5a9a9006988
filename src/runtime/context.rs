use serde_json::{Map, Value as JsonValue};

use crate::{FlowbaseError, Result, common::Vars};

/// The append-only variable namespace of one run.
///
/// Each node reads the context produced so far and contributes new variables
/// under names no earlier node has used; nothing is ever overwritten or
/// removed. [`WorkflowContext::insert`] returns a new context rather than
/// mutating in place, so a node failure leaves the run's state untouched.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    vars: Map<String, JsonValue>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&JsonValue> {
        self.vars.get(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Resolve a dotted path like `httpResponse.data.title` against the
    /// context. Returns `None` when any segment is missing or the value at
    /// an intermediate segment is not an object.
    pub fn lookup_path(
        &self,
        path: &str,
    ) -> Option<&JsonValue> {
        let mut segments = path.split('.');
        let mut current = self.vars.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Return a new context extended with `name`; rejects names already
    /// bound by an earlier node.
    pub fn insert(
        &self,
        name: &str,
        value: JsonValue,
    ) -> Result<WorkflowContext> {
        if self.vars.contains_key(name) {
            return Err(FlowbaseError::DuplicateVariable(name.to_string()));
        }
        let mut vars = self.vars.clone();
        vars.insert(name.to_string(), value);
        Ok(Self {
            vars,
        })
    }

    /// Merge an executor's result object into a new context; every key of
    /// `result` must be unbound.
    pub fn merge(
        &self,
        result: Map<String, JsonValue>,
    ) -> Result<WorkflowContext> {
        let mut next = self.clone();
        for (name, value) in result {
            next = next.insert(&name, value)?;
        }
        Ok(next)
    }
}

impl From<Vars> for WorkflowContext {
    fn from(vars: Vars) -> Self {
        Self {
            vars: vars.into(),
        }
    }
}

impl From<&WorkflowContext> for Vars {
    fn from(ctx: &WorkflowContext) -> Self {
        Vars::from(ctx.vars.clone())
    }
}
