//! Static context checks for the **Rox** interpreter.
//!
//! One AST walk after parsing that tracks whether the walk is inside a
//! function and inside a (sub)class, and reports constructs that can never
//! run correctly:
//! - `return` outside any function,
//! - `this` outside a class,
//! - `super` outside a class or in a class without a superclass,
//! - a class naming itself as its superclass.
//!
//! Variable lookup itself stays dynamic (the interpreter walks the scope
//! chain), so redeclaring a name in the same scope is not an error here.
//! Every problem is reported; the walk never stops early.

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::diagnostics::Diagnostics;
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'d> {
    diagnostics: &'d mut Diagnostics,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Resolver {
            diagnostics,
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.report(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { initializer, .. } => {
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
            }

            Stmt::Block(statements) => {
                for s in statements {
                    self.resolve_stmt(s);
                }
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Function(decl) => self.resolve_function(decl),

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Resolving class '{}'", name.lexeme);

                let enclosing = self.current_class;
                self.current_class = ClassType::Class;

                if let Some(superclass) = superclass {
                    if superclass.lexeme == name.lexeme {
                        self.error(superclass, "A class can't inherit from itself.");
                    }

                    self.current_class = ClassType::Subclass;
                }

                for method in methods {
                    self.resolve_function(method);
                }

                self.current_class = enclosing;
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Variable(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Assign { value, .. } => self.resolve_expr(value),

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                }
            }

            Expr::Super { keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::Subclass => {}
            },
        }
    }
}
