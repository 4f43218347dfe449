use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, ScriptError, SourceSpan},
    value::Value,
};

pub type EnvironmentRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Binding>,
}

/// Outcome of assigning to a name that no scope declares.
pub enum Undeclared {
    /// Strict code: the assignment is an error.
    Reject,
    /// Sloppy code: the name is created in the outermost scope.
    DefineGlobal,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    pub fn define(&mut self, name: String, value: Value, mutable: bool) {
        self.bindings.insert(name, Binding { value, mutable });
    }

    pub fn assign(
        env: &EnvironmentRef,
        name: &str,
        value: Value,
        span: SourceSpan,
        undeclared: Undeclared,
    ) -> Result<(), ScriptError> {
        let mut scope = Rc::clone(env);
        loop {
            let parent = {
                let mut current = scope.borrow_mut();
                if let Some(binding) = current.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(ScriptError::from(
                            Diagnostic::runtime(format!(
                                "cannot assign to immutable binding `{name}`"
                            ))
                            .with_span(span),
                        ));
                    }
                    binding.value = value;
                    return Ok(());
                }
                current.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }

        match undeclared {
            Undeclared::DefineGlobal => {
                scope.borrow_mut().define(name.to_string(), value, true);
                Ok(())
            }
            Undeclared::Reject => Err(ScriptError::from(
                Diagnostic::runtime(format!("assignment to undeclared variable `{name}`"))
                    .with_span(span)
                    .with_note("declare it first with `var` or `const`"),
            )),
        }
    }

    pub fn get(env: &EnvironmentRef, name: &str, span: SourceSpan) -> Result<Value, ScriptError> {
        if let Some(binding) = env.borrow().bindings.get(name) {
            return Ok(binding.value.clone());
        }
        if let Some(parent) = env.borrow().parent.clone() {
            return Environment::get(&parent, name, span);
        }
        Err(ScriptError::from(
            Diagnostic::runtime(format!("undefined variable `{name}`")).with_span(span),
        ))
    }
}

pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}
