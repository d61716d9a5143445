use std::{fmt::Display, rc::Rc};

#[derive(Debug, Clone, Default)]
pub struct Program(pub Vec<Statement>);

#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Expression),
    Declaration {
        name: String,
        initializer: Option<Expression>,
    },
    Block(Vec<Statement>),
    If(Expression, Box<Statement>, Option<Box<Statement>>),
    While(Expression, Box<Statement>),
    Function(Rc<FunctionDecl>),
    Return(Option<Expression>),
    Break,
    Continue,
    Import(Expression),
    Export {
        name: String,
        value: Expression,
    },
    Noop,
}

/// A named function. The body statements run directly in the scope holding the parameters.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

/// An anonymous `function(...) {...}` literal, bound to an object on property access.
#[derive(Debug)]
pub struct MethodDecl {
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Variable {
        name: String,
        level: usize,
    },
    Assignment {
        name: String,
        level: usize,
        value: Box<Expression>,
    },
    GetIndex {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    SetIndex {
        target: Box<Expression>,
        index: Box<Expression>,
        value: Box<Expression>,
    },
    GetProp {
        target: Box<Expression>,
        property: String,
    },
    SetProp {
        target: Box<Expression>,
        property: String,
        value: Box<Expression>,
    },
    Literal(Literal),
    Grouping(Box<Expression>),
    Prefix(PrefixOperator, Box<Expression>),
    Infix(Box<Expression>, InfixOperator, Box<Expression>),
    Logical(Box<Expression>, LogicalOperator, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    List(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    Method(Rc<MethodDecl>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for statement in &self.0 {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

fn write_list<T: Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        write!(f, "{item}")?;
        if i != items.len() - 1 {
            write!(f, ", ")?;
        }
    }
    Ok(())
}

fn write_body(f: &mut std::fmt::Formatter<'_>, body: &[Statement]) -> std::fmt::Result {
    writeln!(f, "{{")?;
    for statement in body {
        writeln!(f, "{}", statement)?;
    }
    write!(f, "}}")
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{};", expr),
            Statement::Declaration { name, initializer } => match initializer {
                Some(expr) => write!(f, "var {} = {};", name, expr),
                None => write!(f, "var {};", name),
            },
            Statement::Block(statements) => write_body(f, statements),
            Statement::If(condition, then_branch, else_branch) => {
                write!(f, "if {} {}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            Statement::While(condition, body) => write!(f, "while {} {}", condition, body),
            Statement::Function(decl) => {
                write!(f, "function {}(", decl.name)?;
                write_list(f, &decl.params)?;
                write!(f, ") ")?;
                write_body(f, &decl.body)
            }
            Statement::Return(expr) => match expr {
                Some(expr) => write!(f, "return {};", expr),
                None => write!(f, "return;"),
            },
            Statement::Break => write!(f, "break;"),
            Statement::Continue => write!(f, "continue;"),
            Statement::Import(source) => write!(f, "import {};", source),
            Statement::Export { name, value } => write!(f, "export {} as {};", value, name),
            Statement::Noop => write!(f, ";"),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Variable { name, level } => {
                if *level == 0 {
                    write!(f, "{}", name)
                } else {
                    write!(f, "scope[{}].{}", level, name)
                }
            }
            Expression::Assignment { name, level, value } => {
                if *level == 0 {
                    write!(f, "{} = {}", name, value)
                } else {
                    write!(f, "scope[{}].{} = {}", level, name, value)
                }
            }
            Expression::GetIndex { target, index } => write!(f, "{}[{}]", target, index),
            Expression::SetIndex {
                target,
                index,
                value,
            } => write!(f, "{}[{}] = {}", target, index, value),
            Expression::GetProp { target, property } => write!(f, "{}.{}", target, property),
            Expression::SetProp {
                target,
                property,
                value,
            } => write!(f, "{}.{} = {}", target, property, value),
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Grouping(expr) => write!(f, "({})", expr),
            Expression::Prefix(op, right) => write!(f, "({} {})", op, right),
            Expression::Infix(left, op, right) => write!(f, "({} {} {})", op, left, right),
            Expression::Logical(left, op, right) => write!(f, "({} {} {})", op, left, right),
            Expression::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expression::Object(properties) => {
                write!(f, "Object {{")?;
                for (i, (key, value)) in properties.iter().enumerate() {
                    write!(f, "{}: {}", key, value)?;
                    if i != properties.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
            Expression::Method(decl) => {
                write!(f, "function(")?;
                write_list(f, &decl.params)?;
                write!(f, ") ")?;
                write_body(f, &decl.body)
            }
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

impl Display for InfixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfixOperator::Equal => write!(f, "=="),
            InfixOperator::NotEqual => write!(f, "!="),
            InfixOperator::LessThan => write!(f, "<"),
            InfixOperator::LessThanOrEqual => write!(f, "<="),
            InfixOperator::GreaterThan => write!(f, ">"),
            InfixOperator::GreaterThanOrEqual => write!(f, ">="),
            InfixOperator::Plus => write!(f, "+"),
            InfixOperator::Minus => write!(f, "-"),
            InfixOperator::Multiply => write!(f, "*"),
            InfixOperator::Divide => write!(f, "/"),
        }
    }
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "and"),
            LogicalOperator::Or => write!(f, "or"),
        }
    }
}

impl Display for PrefixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOperator::Negate => write!(f, "-"),
            PrefixOperator::Not => write!(f, "!"),
        }
    }
}
