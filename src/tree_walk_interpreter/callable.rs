use std::{cell::RefCell, fmt::Display, rc::Rc};

use crate::ast::{FunctionDecl, MethodDecl};

use super::{environment::Environment, object::Object, Interpreter, RuntimeError};

pub type BuiltinFn = fn(&mut Interpreter, Vec<Object>) -> Result<Object, RuntimeError>;
pub type NativeFn = dyn Fn(&Object, &mut Interpreter, Vec<Object>) -> Result<Object, RuntimeError>;

pub enum Callable {
    Function(Function),
    BoundMethod { method: Method, this: Object },
    Builtin(Builtin),
}

/// A named function closing over the environment it was declared in.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub function: BuiltinFn,
}

#[derive(Clone)]
pub enum Method {
    Script(Rc<ScriptMethod>),
    Native(NativeMethod),
}

/// A `function(...) {...}` literal. It closes over the global environment of the interpreter that evaluated it,
/// never over the locals around the literal.
pub struct ScriptMethod {
    pub decl: Rc<MethodDecl>,
    pub global: Rc<RefCell<Environment>>,
}

/// A method implemented by the host, receiving the object it was bound to.
#[derive(Clone)]
pub struct NativeMethod {
    pub name: &'static str,
    pub arity: usize,
    function: Rc<NativeFn>,
}

impl NativeMethod {
    pub fn new(
        name: &'static str,
        arity: usize,
        function: impl Fn(&Object, &mut Interpreter, Vec<Object>) -> Result<Object, RuntimeError> + 'static,
    ) -> Self {
        Self {
            name,
            arity,
            function: Rc::new(function),
        }
    }
}

impl Method {
    pub fn arity(&self) -> usize {
        match self {
            Method::Script(script) => script.decl.params.len(),
            Method::Native(native) => native.arity,
        }
    }

    pub fn bind(&self, this: Object) -> Result<Callable, RuntimeError> {
        if matches!(self, Method::Script(_)) && !matches!(this, Object::Instance(_)) {
            return Err(RuntimeError::IllegalArgument(format!(
                "{} cannot be binding target for object method",
                this.type_name()
            )));
        }
        Ok(Callable::BoundMethod {
            method: self.clone(),
            this,
        })
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Method::Script(a), Method::Script(b)) => Rc::ptr_eq(a, b),
            (Method::Native(a), Method::Native(b)) => Rc::ptr_eq(&a.function, &b.function),
            _ => false,
        }
    }

    fn call(
        &self,
        this: &Object,
        interpreter: &mut Interpreter,
        args: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        match self {
            Method::Script(script) => {
                tracing::trace!(params = script.decl.params.len(), "calling method");
                let receiver = Environment::boxed(Some(script.global.clone()));
                receiver.borrow_mut().declare("this", this.clone());
                let scope = Environment::boxed(Some(receiver));
                bind_params(&scope, &script.decl.params, args);
                interpreter.execute_body(&script.decl.body, scope)
            }
            Method::Native(native) => {
                tracing::trace!(method = native.name, "calling native method");
                (native.function)(this, interpreter, args)
            }
        }
    }
}

fn bind_params(scope: &Rc<RefCell<Environment>>, params: &[String], args: Vec<Object>) {
    let mut scope = scope.borrow_mut();
    for (param, arg) in params.iter().zip(args) {
        scope.declare(param.clone(), arg);
    }
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.decl.params.len(),
            Callable::BoundMethod { method, .. } => method.arity(),
            Callable::Builtin(builtin) => builtin.arity,
        }
    }

    pub fn check_arity(&self, given: usize) -> Result<(), RuntimeError> {
        if given != self.arity() {
            return Err(RuntimeError::IllegalArgument(format!(
                "{} accepts {} parameters but was provided {} arguments",
                self,
                self.arity(),
                given
            )));
        }
        Ok(())
    }

    /// Calls from the host, where the arguments have not been checked against the arity yet.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        self.check_arity(args.len())?;
        self.invoke(interpreter, args)
    }

    /// Calls with arguments already checked by [`Callable::check_arity`].
    pub(super) fn invoke(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        match self {
            Callable::Function(function) => {
                tracing::trace!(function = %function.decl.name, "calling function");
                let scope = Environment::boxed(Some(function.closure.clone()));
                bind_params(&scope, &function.decl.params, args);
                interpreter.execute_body(&function.decl.body, scope)
            }
            Callable::BoundMethod { method, this } => method.call(this, interpreter, args),
            Callable::Builtin(builtin) => (builtin.function)(interpreter, args),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Script(_) => write!(f, "method"),
            Method::Native(native) => write!(f, "builtin:{}", native.name),
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "function:{}", function.decl.name),
            Callable::BoundMethod { method, .. } => write!(f, "{}", method),
            Callable::Builtin(builtin) => write!(f, "builtin:{}", builtin.name),
        }
    }
}
