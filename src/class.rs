use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::LoxFunction;
use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Name of the method run when a class is called.
pub const INITIALIZER: &str = "init";

/// A class: its own methods plus an optional superclass to fall back on.
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    initializer: Option<Rc<LoxFunction>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// `methods` must not contain the initializer; pass it separately.
    pub fn new(
        name: &str,
        superclass: Option<Rc<LoxClass>>,
        initializer: Option<Rc<LoxFunction>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            superclass,
            initializer,
            methods,
        }
    }

    /// Looks in this class first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        let own = if name == INITIALIZER {
            self.initializer.clone()
        } else {
            self.methods.get(name).cloned()
        };

        own.or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// The initializer, possibly inherited.
    pub fn find_initializer(&self) -> Option<Rc<LoxFunction>> {
        self.find_method(INITIALIZER)
    }

    /// Number of arguments a constructor call takes.
    pub fn arity(&self) -> usize {
        self.find_initializer().map_or(0, |init| init.arity())
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| &superclass.name),
            )
            .finish()
    }
}

/// An object created by calling a class.  Fields spring into existence on
/// first assignment.
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: fields shadow methods; a method comes back bound to
    /// `instance`.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = instance.borrow().class.clone();

        match class.find_method(&name.lexeme) {
            Some(method) => {
                let bound = method.bind(Value::Instance(instance.clone()));
                Ok(Value::Function(Rc::new(bound)))
            }
            None => Err(LoxError::runtime(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();

        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
