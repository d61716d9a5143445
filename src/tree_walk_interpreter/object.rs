use std::{
    cell::{Ref, RefCell},
    fmt::{Debug, Display},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use super::{
    builtins,
    callable::{Callable, Method},
    RuntimeError,
};

/// Every value a script can produce. Lists and object instances are handles to shared storage, everything else
/// is copied on assignment.
#[derive(Clone, Default)]
pub enum Object {
    #[default]
    Nil,
    Number(f64),
    String(String),
    Boolean(bool),
    List(List),
    Instance(ObjectInstance),
    /// A method literal that has not been bound to a receiver yet.
    Method(Method),
    Callable(Rc<Callable>),
}

impl Object {
    /// Only `false` and `nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Nil => false,
            Object::Boolean(b) => *b,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Nil => "nil",
            Object::Number(_) => "number",
            Object::String(_) => "string",
            Object::Boolean(_) => "boolean",
            Object::List(_) => "list",
            Object::Instance(_) => "object",
            Object::Method(_) => "method",
            Object::Callable(_) => "function",
        }
    }

    /// Copies lists and object instances all the way down so that the result shares no storage with `self`.
    /// Callables are behaviour rather than data and are shared. A container reachable more than once, including
    /// through a cycle, is copied once and the copy keeps the same shape.
    pub fn deep_clone(&self) -> Object {
        self.copy(&mut FxHashMap::default())
    }

    fn copy(&self, copies: &mut Copies) -> Object {
        match self {
            Object::List(list) => Object::List(list.copy(copies)),
            Object::Instance(instance) => Object::Instance(instance.copy(copies)),
            other => other.clone(),
        }
    }

    /// Renders `self`, writing `[...]` or `Object {...}` for a container that is already being rendered further
    /// up in `open`.
    fn render(&self, f: &mut std::fmt::Formatter<'_>, open: &mut Vec<usize>) -> std::fmt::Result {
        match self {
            Object::List(list) => list.render(f, open),
            Object::Instance(instance) => instance.render(f, open),
            other => write!(f, "{}", other),
        }
    }

    /// Property access. Missing keys on an instance yield nil, and stored methods come back bound to the instance.
    pub fn get_property(&self, name: &str) -> Result<Object, RuntimeError> {
        let property = match self {
            Object::Instance(instance) => instance.get(name),
            Object::List(_) => builtins::list_method(name).map_or(Object::Nil, Object::Method),
            other => {
                return Err(RuntimeError::IllegalArgument(format!(
                    "{} cannot invoke property getter",
                    other.type_name()
                )))
            }
        };
        match property {
            Object::Method(method) => Ok(Object::Callable(Rc::new(method.bind(self.clone())?))),
            property => Ok(property),
        }
    }

    pub fn put_property(&self, name: &str, value: Object) -> Result<Object, RuntimeError> {
        match self {
            Object::Instance(instance) => {
                instance.put(name, value.clone());
                Ok(value)
            }
            Object::List(_) => Err(RuntimeError::IllegalOperation(
                "cannot mutate prototype of list".to_string(),
            )),
            other => Err(RuntimeError::IllegalArgument(format!(
                "{} cannot invoke property setter",
                other.type_name()
            ))),
        }
    }
}

/// Language equality: primitives compare by value, everything else by identity.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Nil, Object::Nil) => true,
            (Object::Number(a), Object::Number(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::List(a), Object::List(b)) => a.ptr_eq(b),
            (Object::Instance(a), Object::Instance(b)) => a.ptr_eq(b),
            (Object::Method(a), Object::Method(b)) => a.ptr_eq(b),
            (Object::Callable(a), Object::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Nil => write!(f, "nil"),
            Object::Number(n) => write!(f, "{}", n),
            Object::String(s) => write!(f, "{}", s),
            Object::Boolean(b) => write!(f, "{}", b),
            Object::List(_) | Object::Instance(_) => self.render(f, &mut Vec::new()),
            Object::Method(method) => write!(f, "{}", method),
            Object::Callable(callable) => write!(f, "{}", callable),
        }
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Nil => write!(f, "Nil"),
            Object::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Object::String(s) => f.debug_tuple("String").field(s).finish(),
            Object::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Object::List(list) => write!(f, "List({})", list),
            Object::Instance(instance) => write!(f, "Instance({})", instance),
            Object::Method(method) => write!(f, "<{}>", method),
            Object::Callable(callable) => write!(f, "<{}>", callable),
        }
    }
}

/// Copies made so far during one deep clone, keyed by the address of the original container.
type Copies = FxHashMap<usize, Object>;

impl From<f64> for Object {
    fn from(n: f64) -> Self {
        Object::Number(n)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::String(s.to_string())
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::String(s)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

/// Shared, growable sequence of objects.
#[derive(Clone, Default)]
pub struct List(Rc<RefCell<Vec<Object>>>);

impl List {
    pub fn new(items: Vec<Object>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Object> {
        self.0.borrow().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Object) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: Object) {
        self.0.borrow_mut().push(value);
    }

    /// Removes the item at `index`, shifting everything after it one step to the left.
    pub fn remove(&self, index: usize) -> Option<Object> {
        let mut items = self.0.borrow_mut();
        (index < items.len()).then(|| items.remove(index))
    }

    pub fn items(&self) -> Ref<'_, Vec<Object>> {
        self.0.borrow()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn copy(&self, copies: &mut Copies) -> Self {
        if let Some(Object::List(copy)) = copies.get(&self.address()) {
            return copy.clone();
        }
        let copy = Self::default();
        copies.insert(self.address(), Object::List(copy.clone()));
        let items: Vec<Object> = self.items().iter().map(|item| item.copy(copies)).collect();
        *copy.0.borrow_mut() = items;
        copy
    }

    fn render(&self, f: &mut std::fmt::Formatter<'_>, open: &mut Vec<usize>) -> std::fmt::Result {
        if open.contains(&self.address()) {
            return write!(f, "[...]");
        }
        open.push(self.address());
        write!(f, "[")?;
        for (i, item) in self.items().iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            item.render(f, open)?;
        }
        open.pop();
        write!(f, "]")
    }
}

impl Display for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

/// Shared string keyed property table created by `Object { ... }` literals, decoders and the host.
#[derive(Clone, Default)]
pub struct ObjectInstance(Rc<RefCell<FxHashMap<String, Object>>>);

impl ObjectInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Object {
        self.0.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn put(&self, key: impl Into<String>, value: Object) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.0.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn copy(&self, copies: &mut Copies) -> Self {
        if let Some(Object::Instance(copy)) = copies.get(&self.address()) {
            return copy.clone();
        }
        let copy = Self::new();
        copies.insert(self.address(), Object::Instance(copy.clone()));
        let properties: Vec<(String, Object)> = self
            .0
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in properties {
            copy.put(key, value.copy(copies));
        }
        copy
    }

    fn render(&self, f: &mut std::fmt::Formatter<'_>, open: &mut Vec<usize>) -> std::fmt::Result {
        if open.contains(&self.address()) {
            return write!(f, "Object {{...}}");
        }
        open.push(self.address());
        write!(f, "Object {{")?;
        for (i, key) in self.keys().iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ", key)?;
            self.get(key).render(f, open)?;
        }
        open.pop();
        write!(f, "}}")
    }
}

impl FromIterator<(String, Object)> for ObjectInstance {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        Self(Rc::new(RefCell::new(iter.into_iter().collect())))
    }
}

impl Display for ObjectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.render(f, &mut Vec::new())
    }
}
