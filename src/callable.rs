//! Callable values other than classes: host-provided natives and user
//! functions/methods.  Invocation itself lives in the interpreter, which
//! owns the environment stack a call runs on.

use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::value::Value;

/// A function implemented by the host.  Errors are plain messages; the
/// interpreter attaches the call site's line.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}

/// Natives predefined in the global environment.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args: &[Value]| {
            let seconds = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| format!("Clock error: {}", e))?
                .as_secs_f64();

            Ok(Value::Number(seconds))
        },
    }]
}

/// A user function or method together with the environment it closes over.
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    /// `init` methods always yield `this`.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure has an extra frame binding
    /// `this` to `instance`.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        debug!("Binding 'this' for method '{}'", self.name());

        let mut env = Environment::with_enclosing(self.closure.clone());
        env.define("this", instance);

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: env.into_ref(),
            is_initializer: self.is_initializer,
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}/{}>", self.name(), self.arity())
    }
}
