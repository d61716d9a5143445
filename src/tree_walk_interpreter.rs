mod builder;
mod builtins;
mod callable;
mod environment;
mod object;

use std::{
    cell::RefCell,
    fmt::Debug,
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{
    ast::{Expression, InfixOperator, Literal, LogicalOperator, PrefixOperator, Program, Statement},
    parser::{parse_str, ParseErrors},
};

pub use self::{
    builder::{from_json, from_xml},
    callable::{Builtin, Callable, Function, Method, NativeMethod, ScriptMethod},
    environment::Environment,
    object::{List, Object, ObjectInstance},
};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("unrecognized operand type: {0}")]
    UnrecognizedOperandType(String),
    #[error("variable not declared: {0}")]
    ObjectNotDeclared(String),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("illegal operation: {0}")]
    IllegalOperation(String),
    #[error("assertion failed")]
    FailedAssertion,
    #[error("panic: {0}")]
    Panic(String),
    #[error("unexpected unwinder: {0}")]
    UnexpectedUnwinder(&'static str),
    #[error("cyclic import of {}", .0.display())]
    CyclicImport(PathBuf),
    #[error("failed to parse imported file {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ParseErrors,
    },
    #[error("failed to decode body: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of executing a statement. Anything but `Normal` unwinds until a loop or a call consumes it.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Object),
    Break,
    Continue,
}

impl Completion {
    fn name(&self) -> &'static str {
        match self {
            Completion::Normal => "normal",
            Completion::Return(_) => "return",
            Completion::Break => "break",
            Completion::Continue => "continue",
        }
    }
}

pub struct Interpreter {
    working_dir: PathBuf,
    exports: FxHashMap<String, Object>,
    builtins: Rc<RefCell<Environment>>,
    global: Rc<RefCell<Environment>>,
    scope: Rc<RefCell<Environment>>,
    stdout: Rc<RefCell<dyn Write>>,
    /// Files currently being executed by this interpreter and the interpreters that imported it.
    imports: Vec<PathBuf>,
}

impl Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("working_dir", &self.working_dir)
            .field("scope", &self.scope)
            .field("imports", &self.imports)
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(".", Rc::new(RefCell::new(std::io::stdout())))
    }
}

impl Interpreter {
    /// Creates an interpreter resolving imports relative to `working_dir` and printing to `stdout`.
    pub fn new(working_dir: impl Into<PathBuf>, stdout: Rc<RefCell<dyn Write>>) -> Self {
        let builtins = Environment::boxed(None);
        builtins::declare_builtins(&mut builtins.borrow_mut());
        let global = Environment::boxed(Some(builtins.clone()));

        Self {
            working_dir: working_dir.into(),
            exports: FxHashMap::default(),
            builtins,
            scope: global.clone(),
            global,
            stdout,
            imports: Vec::new(),
        }
    }

    /// Makes `value` visible to scripts under `name`, alongside the builtins.
    pub fn declare(&mut self, name: impl Into<String>, value: Object) {
        self.builtins.borrow_mut().declare(name, value);
    }

    pub fn resolve(&self, name: &str, level: usize) -> Option<Object> {
        Environment::get_at(&self.scope, level, name)
    }

    pub fn exports(&self) -> &FxHashMap<String, Object> {
        &self.exports
    }

    pub fn into_exports(self) -> FxHashMap<String, Object> {
        self.exports
    }

    pub fn execute(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for statement in program.0.iter() {
            let completion = self.execute_statement(statement).map_err(|err| {
                tracing::debug!(%statement, %err, "execution failed");
                err
            })?;
            if !matches!(completion, Completion::Normal) {
                return Err(RuntimeError::UnexpectedUnwinder(completion.name()));
            }
        }
        Ok(())
    }

    /// Parses and executes the file at `path`, resolving its imports relative to the file's directory.
    pub fn execute_file(&mut self, path: impl AsRef<Path>) -> Result<(), crate::Error> {
        let path = path.as_ref().canonicalize()?;
        let source = std::fs::read_to_string(&path)?;
        let program = parse_str(&source)?;
        if let Some(dir) = path.parent() {
            self.working_dir = dir.to_path_buf();
        }
        self.imports.push(path);
        let result = self.execute(&program);
        self.imports.pop();
        Ok(result?)
    }

    fn execute_in_scope<T>(
        &mut self,
        scope: Rc<RefCell<Environment>>,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        tracing::trace!("enter scope");
        let prev = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = prev;
        result
    }

    fn execute_block(
        &mut self,
        statements: &[Statement],
        scope: Rc<RefCell<Environment>>,
    ) -> Result<Completion, RuntimeError> {
        self.execute_in_scope(scope, |this| {
            for statement in statements {
                match this.execute_statement(statement)? {
                    Completion::Normal => {}
                    unwind => return Ok(unwind),
                }
            }
            Ok(Completion::Normal)
        })
    }

    /// Runs a function or method body in `scope`, turning a `return` into the call's value.
    fn execute_body(
        &mut self,
        body: &[Statement],
        scope: Rc<RefCell<Environment>>,
    ) -> Result<Object, RuntimeError> {
        match self.execute_block(body, scope)? {
            Completion::Normal => Ok(Object::Nil),
            Completion::Return(value) => Ok(value),
            unwind => Err(RuntimeError::UnexpectedUnwinder(unwind.name())),
        }
    }

    fn execute_statement(&mut self, statement: &Statement) -> Result<Completion, RuntimeError> {
        let completion = match statement {
            Statement::Expression(expression) => {
                self.evaluate(expression)?;
                Completion::Normal
            }
            Statement::Declaration { name, initializer } => {
                let value = match initializer {
                    Some(expression) => self.evaluate(expression)?,
                    None => Object::Nil,
                };
                self.scope.borrow_mut().declare(name.clone(), value);
                Completion::Normal
            }
            Statement::Block(statements) => {
                self.execute_block(statements, Environment::boxed(Some(self.scope.clone())))?
            }
            Statement::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_statement(then_branch)?
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)?
                } else {
                    Completion::Normal
                }
            }
            Statement::While(condition, body) => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_statement(body)? {
                        Completion::Break => break,
                        Completion::Normal | Completion::Continue => {}
                        unwind @ Completion::Return(_) => return Ok(unwind),
                    }
                }
                Completion::Normal
            }
            Statement::Function(decl) => {
                let function = Callable::Function(Function {
                    decl: decl.clone(),
                    closure: self.scope.clone(),
                });
                self.scope
                    .borrow_mut()
                    .declare(decl.name.clone(), Object::Callable(Rc::new(function)));
                Completion::Normal
            }
            Statement::Return(expression) => {
                let value = match expression {
                    Some(expression) => self.evaluate(expression)?,
                    None => Object::Nil,
                };
                Completion::Return(value)
            }
            Statement::Break => Completion::Break,
            Statement::Continue => Completion::Continue,
            Statement::Import(source) => {
                self.import(source)?;
                Completion::Normal
            }
            Statement::Export { name, value } => {
                let value = self.evaluate(value)?;
                tracing::debug!(%name, "export");
                self.exports.insert(name.clone(), value);
                Completion::Normal
            }
            Statement::Noop => Completion::Normal,
        };

        Ok(completion)
    }

    fn import(&mut self, source: &Expression) -> Result<(), RuntimeError> {
        let file = match self.evaluate(source)? {
            Object::String(file) => file,
            other => {
                return Err(RuntimeError::IllegalArgument(format!(
                    "{} is not a valid import value",
                    other
                )))
            }
        };
        let path = self.working_dir.join(file).canonicalize()?;
        if self.imports.contains(&path) {
            return Err(RuntimeError::CyclicImport(path));
        }
        tracing::debug!(path = %path.display(), "import");

        let source = std::fs::read_to_string(&path)?;
        let program = parse_str(&source).map_err(|source| RuntimeError::Import {
            path: path.clone(),
            source,
        })?;
        let working_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut child = Interpreter::new(working_dir, self.stdout.clone());
        child.imports = self.imports.clone();
        child.imports.push(path);
        child.execute(&program)?;

        let mut scope = self.scope.borrow_mut();
        for (name, value) in child.exports {
            scope.declare(name, value);
        }
        Ok(())
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Object, RuntimeError> {
        match expression {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Integer(n) => Object::Number(*n as f64),
                Literal::Float(n) => Object::Number(*n),
                Literal::String(s) => Object::String(s.clone()),
                Literal::Boolean(b) => Object::Boolean(*b),
                Literal::Nil => Object::Nil,
            }),
            Expression::Grouping(expression) => self.evaluate(expression),
            Expression::Variable { name, level } => self
                .resolve(name, *level)
                .ok_or_else(|| RuntimeError::ObjectNotDeclared(name.clone())),
            Expression::Assignment { name, level, value } => {
                let value = self.evaluate(value)?;
                if !Environment::assign_at(&self.scope, *level, name, value.clone()) {
                    return Err(RuntimeError::ObjectNotDeclared(name.clone()));
                }
                Ok(value)
            }
            Expression::GetIndex { target, index } => {
                let list = self.indexable(target)?;
                let index = self.index(&list, index)?;
                Ok(list.get(index).unwrap_or_default())
            }
            Expression::SetIndex {
                target,
                index,
                value,
            } => {
                let value = self.evaluate(value)?;
                let list = self.indexable(target)?;
                let index = self.index(&list, index)?;
                list.set(index, value.clone());
                Ok(value)
            }
            Expression::GetProp { target, property } => {
                self.evaluate(target)?.get_property(property)
            }
            Expression::SetProp {
                target,
                property,
                value,
            } => {
                let value = self.evaluate(value)?;
                self.evaluate(target)?.put_property(property, value)
            }
            Expression::Prefix(operator, operand) => {
                let operand = self.evaluate(operand)?;
                match operator {
                    PrefixOperator::Not => Ok(Object::Boolean(!operand.is_truthy())),
                    PrefixOperator::Negate => {
                        self.infix(operand, InfixOperator::Multiply, Object::Number(-1.0))
                    }
                }
            }
            Expression::Infix(left, operator, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.infix(left, *operator, right)
            }
            Expression::Logical(left, operator, right) => {
                let left = self.evaluate(left)?;
                match operator {
                    LogicalOperator::And if !left.is_truthy() => Ok(left),
                    LogicalOperator::Or if left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            Expression::Call(callee, args) => {
                let callable = match self.evaluate(callee)? {
                    Object::Callable(callable) => callable,
                    other => return Err(RuntimeError::NotCallable(other.to_string())),
                };
                callable.check_arity(args.len())?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                callable.invoke(self, args)
            }
            Expression::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Object::List(List::new(items)))
            }
            Expression::Object(properties) => {
                let instance = ObjectInstance::new();
                for (key, value) in properties {
                    let value = self.evaluate(value)?;
                    instance.put(key.clone(), value);
                }
                Ok(Object::Instance(instance))
            }
            Expression::Method(decl) => Ok(Object::Method(Method::Script(Rc::new(ScriptMethod {
                decl: decl.clone(),
                global: self.global.clone(),
            })))),
        }
    }

    fn indexable(&mut self, target: &Expression) -> Result<List, RuntimeError> {
        match self.evaluate(target)? {
            Object::List(list) => Ok(list),
            other => Err(RuntimeError::IllegalArgument(format!(
                "{} cannot invoke indexing",
                other.type_name()
            ))),
        }
    }

    fn index(&mut self, list: &List, index: &Expression) -> Result<usize, RuntimeError> {
        let n = match self.evaluate(index)? {
            Object::Number(n) => n,
            other => {
                return Err(RuntimeError::IllegalArgument(format!(
                    "{} cannot be used as index",
                    other.type_name()
                )))
            }
        };
        if n < 0.0 || n as usize >= list.len() {
            return Err(RuntimeError::IllegalArgument(format!(
                "index {} out of range",
                n
            )));
        }
        Ok(n as usize)
    }

    fn infix(
        &mut self,
        left: Object,
        operator: InfixOperator,
        right: Object,
    ) -> Result<Object, RuntimeError> {
        let result = match operator {
            InfixOperator::Plus => match (left, right) {
                (Object::String(a), Object::String(b)) => Object::String(a + &b),
                (Object::String(_), b) => {
                    return Err(RuntimeError::UnrecognizedOperandType(format!(
                        "{} is not a string",
                        b.type_name()
                    )))
                }
                (Object::Number(a), b) => Object::Number(a + number(&b)?),
                (a, _) => {
                    return Err(RuntimeError::UnrecognizedOperandType(format!(
                        "cannot add {}",
                        a.type_name()
                    )))
                }
            },
            InfixOperator::Minus => Object::Number(number(&left)? - number(&right)?),
            InfixOperator::Multiply => Object::Number(number(&left)? * number(&right)?),
            InfixOperator::Divide => {
                let (a, b) = (number(&left)?, number(&right)?);
                if b == 0.0 {
                    return Err(RuntimeError::IllegalArgument(
                        "division by zero".to_string(),
                    ));
                }
                Object::Number(a / b)
            }
            InfixOperator::LessThan => Object::Boolean(number(&left)? < number(&right)?),
            InfixOperator::GreaterThan => Object::Boolean(number(&left)? > number(&right)?),
            InfixOperator::LessThanOrEqual => {
                Object::Boolean(number(&left)? < number(&right)? || left == right)
            }
            InfixOperator::GreaterThanOrEqual => {
                Object::Boolean(number(&left)? > number(&right)? || left == right)
            }
            InfixOperator::Equal => Object::Boolean(left == right),
            InfixOperator::NotEqual => Object::Boolean(left != right),
        };
        Ok(result)
    }
}

fn number(object: &Object) -> Result<f64, RuntimeError> {
    match object {
        Object::Number(n) => Ok(*n),
        other => Err(RuntimeError::UnrecognizedOperandType(format!(
            "{} is not a number",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_str;

    fn run(source: &str) -> Result<(Interpreter, String), RuntimeError> {
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(".", out.clone());
        interpreter.execute(&parse_str(source).expect("source should parse"))?;
        let output = String::from_utf8(out.borrow().clone()).expect("output should be utf-8");
        Ok((interpreter, output))
    }

    fn output(source: &str) -> String {
        run(source).expect("source should execute").1
    }

    fn eval(expression: &str) -> Result<Object, RuntimeError> {
        let (interpreter, _) = run(&format!("var result = {};", expression))?;
        Ok(interpreter
            .resolve("result", 0)
            .expect("result should be declared"))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 1").unwrap(), Object::Number(2.0));
        assert_eq!(eval("10 - 2 * 3").unwrap(), Object::Number(4.0));
        assert_eq!(eval("(10 - 2) / 4").unwrap(), Object::Number(2.0));
        assert_eq!(eval("-(3)").unwrap(), Object::Number(-3.0));
        assert_eq!(eval("1.5 + 2").unwrap(), Object::Number(3.5));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("\"a\" + \"b\"").unwrap(), Object::from("ab"));
        assert!(matches!(
            eval("\"a\" + 1"),
            Err(RuntimeError::UnrecognizedOperandType(_))
        ));
        assert!(matches!(
            eval("1 + \"a\""),
            Err(RuntimeError::UnrecognizedOperandType(_))
        ));
        assert!(matches!(
            eval("nil + 1"),
            Err(RuntimeError::UnrecognizedOperandType(_))
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            eval("5 / 0"),
            Err(RuntimeError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_negating_non_number() {
        assert!(matches!(
            eval("-\"a\""),
            Err(RuntimeError::UnrecognizedOperandType(_))
        ));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("1 < 2").unwrap(), Object::Boolean(true));
        assert_eq!(eval("2 <= 2").unwrap(), Object::Boolean(true));
        assert_eq!(eval("3 <= 2").unwrap(), Object::Boolean(false));
        assert_eq!(eval("2 >= 3").unwrap(), Object::Boolean(false));
        assert_eq!(eval("3 > 2").unwrap(), Object::Boolean(true));
        assert!(matches!(
            eval("\"a\" < \"b\""),
            Err(RuntimeError::UnrecognizedOperandType(_))
        ));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("nil == nil").unwrap(), Object::Boolean(true));
        assert_eq!(eval("1 == \"1\"").unwrap(), Object::Boolean(false));
        assert_eq!(eval("\"a\" != \"b\"").unwrap(), Object::Boolean(true));
        assert_eq!(eval("[1] == [1]").unwrap(), Object::Boolean(false));
        assert_eq!(
            output("var a = [1]; var b = a; print(a == b);"),
            "true"
        );
    }

    #[test]
    fn test_logical_yields_deciding_operand() {
        assert_eq!(eval("true and nil").unwrap(), Object::Nil);
        assert_eq!(eval("nil or \"x\"").unwrap(), Object::from("x"));
        assert_eq!(eval("1 and 2").unwrap(), Object::Number(2.0));
        assert_eq!(eval("false or nil").unwrap(), Object::Nil);
        assert_eq!(eval("!nil").unwrap(), Object::Boolean(true));
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(output("false and panic(\"evaluated\"); print(\"ok\");"), "ok");
        assert_eq!(output("true or panic(\"evaluated\"); print(\"ok\");"), "ok");
    }

    #[test]
    fn test_undeclared_variable() {
        assert!(matches!(
            eval("missing"),
            Err(RuntimeError::ObjectNotDeclared(name)) if name == "missing"
        ));
        assert!(matches!(
            run("missing = 1;"),
            Err(RuntimeError::ObjectNotDeclared(_))
        ));
    }

    #[test]
    fn test_assignment_is_an_expression() {
        assert_eq!(output("var a; var b; b = a = 3; print(a + b);"), "6");
    }

    #[test]
    fn test_uninitialized_is_nil() {
        assert_eq!(eval("nil").unwrap(), Object::Nil);
        assert_eq!(output("var a; print(a);"), "nil");
    }

    #[test]
    fn test_block_scoping() {
        assert_eq!(
            output("var a = 1; { var a = 2; print(a); } print(a);"),
            "21"
        );
        assert_eq!(output("var a = 1; { a = 2; } print(a);"), "2");
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            output("if 1 > 2 print(\"yes\"); else print(\"no\");"),
            "no"
        );
        assert_eq!(output("if nil { print(\"yes\"); }"), "");
    }

    #[test]
    fn test_while_break_continue() {
        let source = "
            var i = 0;
            while i < 10 {
                i = i + 1;
                if i == 2 { continue; }
                if i == 5 { break; }
                print(i);
            }
        ";
        assert_eq!(output(source), "134");
    }

    #[test]
    fn test_return_from_loop() {
        let source = "
            function first_over(limit) {
                var i = 0;
                while true {
                    if i > limit { return i; }
                    i = i + 1;
                }
            }
            print(first_over(3));
        ";
        assert_eq!(output(source), "4");
    }

    #[test]
    fn test_recursion() {
        let source = "
            function fib(n) {
                if n < 2 return n;
                return fib(n - 1) + fib(n - 2);
            }
            print(fib(10));
        ";
        assert_eq!(output(source), "55");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output("function f() {} print(f());"), "nil");
    }

    #[test]
    fn test_unwinder_at_top_level() {
        assert!(matches!(
            run("return 1;"),
            Err(RuntimeError::UnexpectedUnwinder("return"))
        ));
        assert!(matches!(
            run("break;"),
            Err(RuntimeError::UnexpectedUnwinder("break"))
        ));
        assert!(matches!(
            run("function f() { continue; } f();"),
            Err(RuntimeError::UnexpectedUnwinder("continue"))
        ));
    }

    #[test]
    fn test_calls() {
        assert!(matches!(
            run("var a = 1; a();"),
            Err(RuntimeError::NotCallable(_))
        ));
        assert!(matches!(
            run("function f(a) {} f(1, 2);"),
            Err(RuntimeError::IllegalArgument(_))
        ));
        assert!(matches!(
            run("var m = function() {}; m();"),
            Err(RuntimeError::NotCallable(_))
        ));
    }

    #[test]
    fn test_arity_checked_before_arguments() {
        assert!(matches!(
            run("function f() {} f(panic(\"evaluated\"));"),
            Err(RuntimeError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_indexing() {
        assert_eq!(eval("[1, 2, 3][1]").unwrap(), Object::Number(2.0));
        assert_eq!(
            output("var l = [1, 2]; l[0] = \"x\"; print(l);"),
            "[x,2]"
        );
        assert!(matches!(
            eval("[1][1]"),
            Err(RuntimeError::IllegalArgument(_))
        ));
        assert!(matches!(
            eval("[1][-1]"),
            Err(RuntimeError::IllegalArgument(_))
        ));
        assert!(matches!(
            eval("\"abc\"[0]"),
            Err(RuntimeError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_properties() {
        assert_eq!(
            output("var o = Object { a: 1 }; o.b = 2; print(o.a + o.b); print(o.c);"),
            "3nil"
        );
        assert!(matches!(
            run("var n = 1; n.a = 2;"),
            Err(RuntimeError::IllegalArgument(_))
        ));
        assert!(matches!(
            run("var l = []; l.add = 2;"),
            Err(RuntimeError::IllegalOperation(_))
        ));
    }

    #[test]
    fn test_methods_see_this_and_globals() {
        let source = "
            var suffix = \"!\";
            var counter = Object {
                count: 0,
                increment: function(by) {
                    this.count = this.count + by;
                    return this.count + 0;
                },
                shout: function() { return \"count\" + suffix; },
            };
            counter.increment(2);
            print(counter.increment(3));
            print(counter.shout());
        ";
        assert_eq!(output(source), "5count!");
    }

    #[test]
    fn test_methods_do_not_capture_locals() {
        let source = "
            {
                var local = 1;
                var o = Object { m: function() { return local; } };
                o.m();
            }
        ";
        assert!(matches!(
            run(source),
            Err(RuntimeError::ObjectNotDeclared(name)) if name == "local"
        ));
    }

    #[test]
    fn test_host_declarations() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(".", out.clone());
        interpreter.declare("greeting", Object::from("hello"));
        interpreter
            .execute(&parse_str("{ print(greeting); }").unwrap())
            .unwrap();
        assert_eq!(String::from_utf8(out.borrow().clone()).unwrap(), "hello");
    }

    #[test]
    fn test_exports() {
        let (interpreter, _) = run("var a = 1; export a; export a + 1 as b;").unwrap();
        assert_eq!(interpreter.exports()["a"], Object::Number(1.0));
        assert_eq!(interpreter.exports()["b"], Object::Number(2.0));
    }

    #[test]
    fn test_import_requires_string() {
        assert!(matches!(
            run("var path = 1; import path;"),
            Err(RuntimeError::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_rendering_callables() {
        assert_eq!(
            output("function f() {} print(f); print(println); print(Object { m: function() {} }.m);"),
            "function:fbuiltin:printlnmethod"
        );
    }

    #[test]
    fn test_clone_builtin() {
        let source = "
            var a = Object { items: [1] };
            var b = clone(a);
            b.items.add(2);
            print(a.items);
            print(b.items);
        ";
        assert_eq!(output(source), "[1][1,2]");
    }

    #[test]
    fn test_assert_builtin() {
        assert!(matches!(
            run("assert(1 == 2);"),
            Err(RuntimeError::FailedAssertion)
        ));
        assert_eq!(output("assert(1 == 1); print(\"ok\");"), "ok");
    }
}
