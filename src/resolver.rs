use rustc_hash::FxHashSet;

/// Index of the scope holding runtime builtins and host declarations.
const BUILTINS: usize = 0;
/// Index of the scope holding top-level user declarations.
const GLOBAL: usize = 1;

#[derive(Debug, thiserror::Error)]
#[error("{0} is already declared in this scope")]
pub struct Redeclaration(pub String);

/// Parse-time mirror of the runtime environment chain. Each frame records the names declared in one lexical
/// scope; resolving a name yields the number of parent hops the interpreter takes to reach its environment.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<FxHashSet<String>>,
    pointer: usize,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashSet::default(), FxHashSet::default()],
            pointer: GLOBAL,
        }
    }

    /// Scope stack for the body of a method literal. Methods see their own parameters, `this`, and the names
    /// declared globally so far, never the locals surrounding the literal.
    pub fn for_method(&self) -> Self {
        let mut this = FxHashSet::default();
        this.insert("this".to_string());
        Self {
            scopes: vec![
                FxHashSet::default(),
                self.scopes[GLOBAL].clone(),
                this,
            ],
            pointer: GLOBAL + 1,
        }
    }

    pub fn begin(&mut self) {
        if self.pointer == self.scopes.len() - 1 {
            self.scopes.push(FxHashSet::default());
        }
        self.pointer += 1;
        // Slots above the pointer belong to scopes that have ended.
        self.scopes[self.pointer].clear();
        tracing::trace!(depth = self.pointer, "begin scope");
    }

    pub fn end(&mut self) {
        if self.pointer > GLOBAL {
            self.pointer -= 1;
        }
    }

    pub fn declare(&mut self, name: &str) -> Result<(), Redeclaration> {
        if !self.scopes[self.pointer].insert(name.to_string()) {
            return Err(Redeclaration(name.to_string()));
        }
        Ok(())
    }

    /// Names that are not declared in any enclosing scope resolve to the builtins scope.
    pub fn resolve(&self, name: &str) -> usize {
        for (level, scope) in self.scopes[..=self.pointer].iter().rev().enumerate() {
            if scope.contains(name) {
                return level;
            }
        }
        self.pointer - BUILTINS
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.pointer
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unresolved_name_points_at_builtins() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.resolve("a"), 1);
        scopes.begin();
        scopes.begin();
        assert_eq!(scopes.resolve("a"), 3);
    }

    #[test]
    fn test_resolve_counts_hops() {
        let mut scopes = ScopeStack::new();
        scopes.declare("outer").unwrap();
        scopes.begin();
        scopes.declare("inner").unwrap();
        scopes.begin();
        assert_eq!(scopes.resolve("inner"), 1);
        assert_eq!(scopes.resolve("outer"), 2);
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.declare("name").unwrap();
        scopes.begin();
        scopes.declare("name").unwrap();
        assert_eq!(scopes.resolve("name"), 0);
        scopes.end();
        assert_eq!(scopes.resolve("name"), 0);
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.begin();
        scopes.declare("name").unwrap();
        assert!(scopes.declare("name").is_err());
    }

    #[test]
    fn test_reused_slot_is_cleared() {
        let mut scopes = ScopeStack::new();
        scopes.begin();
        scopes.declare("temporary").unwrap();
        scopes.end();
        scopes.begin();
        assert_eq!(scopes.resolve("temporary"), 2);
        scopes.declare("temporary").unwrap();
    }

    #[test]
    fn test_global_scope_is_never_popped() {
        let mut scopes = ScopeStack::new();
        scopes.end();
        scopes.end();
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn test_method_scopes_are_isolated() {
        let mut scopes = ScopeStack::new();
        scopes.declare("config").unwrap();
        scopes.begin();
        scopes.declare("local").unwrap();

        let mut method = scopes.for_method();
        method.begin();
        method.declare("param").unwrap();
        assert_eq!(method.resolve("param"), 0);
        assert_eq!(method.resolve("this"), 1);
        assert_eq!(method.resolve("config"), 2);
        assert_eq!(method.resolve("local"), 3);
    }
}
