//! Tree‑walking evaluator.
//!
//! Statements execute against `self.environment`, the innermost frame of
//! the current scope chain.  Executing a statement yields a [`Flow`]:
//! either it completed normally or a `return` is unwinding towards the
//! enclosing call.  Errors travel separately through `Result`, so a runtime
//! error aborts the whole program while a `return` stops at exactly one
//! call boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{natives, LoxFunction};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::diagnostics::Diagnostics;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nesting limit for user-level calls.  Deeper recursion is reported as a
/// runtime error instead of exhausting the native stack.
pub const MAX_CALL_DEPTH: usize = 1000;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    out: Box<dyn Write>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Environment::new().into_ref();

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: globals.clone(),
            globals,
            out: Box::new(out),
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Replace the default [`MAX_CALL_DEPTH`].
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// The global frame; it persists across calls to [`interpret`](Self::interpret).
    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Run `statements`, reporting a runtime error (if any) to `diagnostics`.
    /// Execution stops at the first error.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        if let Err(e) = self.execute_all(statements) {
            debug!("Runtime error aborted the program: {}", e);
            diagnostics.report(e);
        }
    }

    /// Run `statements` in the current environment, stopping at the first error.
    pub fn execute_all(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            // A top-level `return` is rejected before evaluation; if one slips
            // through it simply ends the program.
            if let Flow::Return(_) = self.execute(stmt)? {
                break;
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────────── statements ──────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(self.environment.clone()).into_ref();

                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = LoxFunction::new(decl.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.declare_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` in `env`, restoring the previous environment
    /// afterwards whether or not they succeeded.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, env);

        let result = self.execute_sequence(statements);

        self.environment = previous;

        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Token>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass = match superclass {
            Some(token) => match self.environment.borrow().get(token)? {
                Value::Class(class) => Some(class),
                _ => return Err(LoxError::runtime(token, "Superclass must be a class.")),
            },
            None => None,
        };

        // Bound first so methods can refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra frame holding `super`.
        let closure = match &superclass {
            Some(superclass) => {
                let mut env = Environment::with_enclosing(self.environment.clone());
                env.define("super", Value::Class(superclass.clone()));
                env.into_ref()
            }
            None => self.environment.clone(),
        };

        let mut initializer = None;
        let mut table = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == INITIALIZER;
            let function = Rc::new(LoxFunction::new(
                method.clone(),
                closure.clone(),
                is_initializer,
            ));

            if is_initializer {
                initializer = Some(function);
            } else {
                table.insert(method.name.lexeme.clone(), function);
            }
        }

        let class = LoxClass::new(&name.lexeme, superclass, initializer, table);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ──────────────────────────── expressions ──────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable(name) => self.environment.borrow().get(name),

            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;

                self.environment.borrow_mut().assign(name, value.clone())?;

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.invoke_callable(callee, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;

                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This(keyword) => self.environment.borrow().get(keyword),

            Expr::Super { keyword, method } => self.evaluate_super(keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right = self.evaluate(right)?;

        match (&operator.token_type, right) {
            (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
            (TokenType::MINUS, _) => Err(LoxError::runtime(operator, "Operand must be a number.")),
            (_, right) => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme,
            left.type_name(),
            right.type_name()
        );

        match &operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left.equals(&right))),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(!left.equals(&right))),
            _ => {}
        }

        match (&operator.token_type, left, right) {
            (TokenType::PLUS, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (TokenType::PLUS, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (TokenType::PLUS, _, _) => Err(LoxError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),

            (TokenType::MINUS, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (TokenType::STAR, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            // IEEE semantics: x / 0 is ±Infinity or NaN, never an error.
            (TokenType::SLASH, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

            (TokenType::GREATER, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
            (TokenType::GREATER_EQUAL, Value::Number(a), Value::Number(b)) => {
                Ok(Value::Bool(a >= b))
            }
            (TokenType::LESS, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
            (TokenType::LESS_EQUAL, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

            _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
        }
    }

    fn evaluate_super(&mut self, keyword: &Token, method: &Token) -> Result<Value> {
        let superclass = self.environment.borrow().get(keyword)?;
        let instance = self
            .environment
            .borrow()
            .lookup("this")
            .ok_or_else(|| LoxError::runtime(keyword, "Undefined variable 'this'."))?;

        let Value::Class(superclass) = superclass else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    // ─────────────────────────────── calls ─────────────────────────────────

    fn invoke_callable(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);
                check_arity(native.arity, args.len(), paren)?;

                (native.func)(&args).map_err(|message| LoxError::runtime(paren, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;

                self.call_function(&function, args, paren)
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);
                check_arity(class.arity(), args.len(), paren)?;

                let instance = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(
                    class.clone(),
                ))));

                if let Some(initializer) = class.find_initializer() {
                    self.call_function(&initializer.bind(instance.clone()), args, paren)?;
                }

                Ok(instance)
            }

            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Run `function`'s body in a fresh frame whose parent is its closure.
    /// Arity has already been checked; `paren` locates a depth overflow.
    pub fn call_function(
        &mut self,
        function: &LoxFunction,
        args: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        if self.call_depth >= self.max_call_depth {
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        debug!("Calling function '{}' at depth {}", function.name(), self.call_depth);

        self.call_depth += 1;
        let result = self.execute_call(function, args);
        self.call_depth -= 1;

        result
    }

    fn execute_call(&mut self, function: &LoxFunction, args: Vec<Value>) -> Result<Value> {
        let mut env = Environment::with_enclosing(function.closure.clone());

        for (param, arg) in function.declaration.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        let flow = self.execute_block(&function.declaration.body, env.into_ref())?;

        if function.is_initializer {
            return Ok(function.closure.borrow().lookup("this").unwrap_or(Value::Nil));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            paren,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}
