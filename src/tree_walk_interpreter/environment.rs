use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;

use super::object::Object;

/// A runtime scope. Environments are chained through their parents and shared by every closure created while
/// they were active, so they live exactly as long as the last frame or closure referring to them.
#[derive(Default)]
pub struct Environment {
    table: FxHashMap<String, Object>,
    parent: Option<Rc<RefCell<Environment>>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.table.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("parent", &self.parent.as_ref().map(Rc::as_ptr))
            .finish()
    }
}

impl Environment {
    pub fn boxed(parent: Option<Rc<RefCell<Environment>>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            table: FxHashMap::default(),
            parent,
        }))
    }

    /// Declares `name` in this environment, replacing any earlier value of the same name.
    pub fn declare(&mut self, name: impl Into<String>, value: Object) {
        self.table.insert(name.into(), value);
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    fn ancestor(env: &Rc<RefCell<Self>>, level: usize) -> Option<Rc<RefCell<Self>>> {
        let mut env = env.clone();
        for _ in 0..level {
            let parent = env.borrow().parent.clone()?;
            env = parent;
        }
        Some(env)
    }

    /// Looks `name` up in the environment `level` hops above `env`. Names that are not found there, such as those
    /// brought in by an import or declared after the referring code was parsed, are searched for along the chain.
    pub fn get_at(env: &Rc<RefCell<Self>>, level: usize, name: &str) -> Option<Object> {
        if let Some(scope) = Self::ancestor(env, level) {
            if let Some(value) = scope.borrow().table.get(name) {
                return Some(value.clone());
            }
        }
        Self::lookup(env, name)
    }

    /// Assigns to an existing `name`, resolved the same way as [`Environment::get_at`]. Returns `false` when the
    /// name is not declared anywhere on the chain.
    pub fn assign_at(env: &Rc<RefCell<Self>>, level: usize, name: &str, value: Object) -> bool {
        if let Some(scope) = Self::ancestor(env, level) {
            if let Some(slot) = scope.borrow_mut().table.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        let mut current = Some(env.clone());
        while let Some(scope) = current {
            if let Some(slot) = scope.borrow_mut().table.get_mut(name) {
                *slot = value;
                return true;
            }
            current = scope.borrow().parent.clone();
        }
        false
    }

    fn lookup(env: &Rc<RefCell<Self>>, name: &str) -> Option<Object> {
        let mut current = Some(env.clone());
        while let Some(scope) = current {
            if let Some(value) = scope.borrow().table.get(name) {
                return Some(value.clone());
            }
            current = scope.borrow().parent.clone();
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chain() -> (Rc<RefCell<Environment>>, Rc<RefCell<Environment>>) {
        let global = Environment::boxed(None);
        global.borrow_mut().declare("a", Object::Number(1.0));
        let local = Environment::boxed(Some(global.clone()));
        local.borrow_mut().declare("b", Object::Number(2.0));
        (global, local)
    }

    #[test]
    fn test_get_at_level() {
        let (_, local) = chain();
        assert_eq!(
            Environment::get_at(&local, 1, "a"),
            Some(Object::Number(1.0))
        );
        assert_eq!(
            Environment::get_at(&local, 0, "b"),
            Some(Object::Number(2.0))
        );
    }

    #[test]
    fn test_get_falls_back_to_chain() {
        let (_, local) = chain();
        assert_eq!(
            Environment::get_at(&local, 5, "a"),
            Some(Object::Number(1.0))
        );
        assert_eq!(Environment::get_at(&local, 0, "missing"), None);
    }

    #[test]
    fn test_static_level_wins_over_shadowing() {
        let (global, local) = chain();
        local.borrow_mut().declare("a", Object::Number(10.0));
        assert_eq!(
            Environment::get_at(&local, 1, "a"),
            Some(Object::Number(1.0))
        );
        assert!(global.borrow().contains("a"));
    }

    #[test]
    fn test_assign_at() {
        let (global, local) = chain();
        assert!(Environment::assign_at(
            &local,
            1,
            "a",
            Object::String("x".to_string())
        ));
        assert_eq!(
            Environment::get_at(&global, 0, "a"),
            Some(Object::String("x".to_string()))
        );
        assert!(!Environment::assign_at(&local, 0, "missing", Object::Nil));
    }
}
