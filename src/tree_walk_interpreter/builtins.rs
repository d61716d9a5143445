use std::io::Write;

use super::{
    callable::{Builtin, Callable, Method, NativeMethod},
    environment::Environment,
    object::{List, Object},
    Interpreter, RuntimeError,
};

const BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "print",
        arity: 1,
        function: print,
    },
    Builtin {
        name: "println",
        arity: 1,
        function: println,
    },
    Builtin {
        name: "clone",
        arity: 1,
        function: clone,
    },
    Builtin {
        name: "panic",
        arity: 1,
        function: panic,
    },
    Builtin {
        name: "assert",
        arity: 1,
        function: assert,
    },
];

pub(super) fn declare_builtins(env: &mut Environment) {
    for builtin in BUILTINS {
        env.declare(builtin.name, Object::Callable(Callable::Builtin(builtin).into()));
    }
}

/// Arity is checked before any builtin runs, so a missing argument is never observed here.
fn first(args: Vec<Object>) -> Object {
    args.into_iter().next().unwrap_or_default()
}

fn print(interpreter: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    write!(interpreter.stdout.borrow_mut(), "{}", first(args))?;
    Ok(Object::Nil)
}

fn println(interpreter: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    writeln!(interpreter.stdout.borrow_mut(), "{}", first(args))?;
    Ok(Object::Nil)
}

fn clone(_: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    Ok(first(args).deep_clone())
}

fn panic(_: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    Err(RuntimeError::Panic(first(args).to_string()))
}

fn assert(_: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    if first(args).is_truthy() {
        Ok(Object::Nil)
    } else {
        Err(RuntimeError::FailedAssertion)
    }
}

pub(super) fn list_method(name: &str) -> Option<Method> {
    let method = match name {
        "add" => NativeMethod::new("add", 1, add),
        "length" => NativeMethod::new("length", 0, length),
        "find" => NativeMethod::new("find", 1, find),
        "contains" => NativeMethod::new("contains", 1, contains),
        "remove" => NativeMethod::new("remove", 1, remove),
        _ => return None,
    };
    Some(Method::Native(method))
}

fn receiver(this: &Object) -> Result<&List, RuntimeError> {
    match this {
        Object::List(list) => Ok(list),
        other => Err(RuntimeError::IllegalOperation(format!(
            "{} cannot be binding target for list method",
            other.type_name()
        ))),
    }
}

fn add(this: &Object, _: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    receiver(this)?.push(first(args));
    Ok(this.clone())
}

fn length(this: &Object, _: &mut Interpreter, _: Vec<Object>) -> Result<Object, RuntimeError> {
    Ok(Object::Number(receiver(this)?.len() as f64))
}

fn find(this: &Object, _: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    let needle = first(args);
    let index = receiver(this)?
        .items()
        .iter()
        .position(|item| *item == needle)
        .map_or(-1.0, |i| i as f64);
    Ok(Object::Number(index))
}

fn contains(this: &Object, _: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    let needle = first(args);
    let found = receiver(this)?.items().iter().any(|item| *item == needle);
    Ok(Object::Boolean(found))
}

fn remove(this: &Object, _: &mut Interpreter, args: Vec<Object>) -> Result<Object, RuntimeError> {
    let list = receiver(this)?;
    let Object::Number(index) = first(args) else {
        return Err(RuntimeError::IllegalArgument(
            "index must be a number".to_string(),
        ));
    };
    if index < 0.0 || list.remove(index as usize).is_none() {
        return Err(RuntimeError::IllegalArgument(format!(
            "index {} out of range",
            index
        )));
    }
    Ok(this.clone())
}
