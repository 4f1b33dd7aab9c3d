use std::fmt;
use std::sync::Arc;

use crate::algorithms::Builtin;
use crate::{BenchError, ColumnMeta, Keys, Result};

/// User-supplied sort function: owned keys in, ascending keys out
pub type SortFn = Arc<dyn Fn(Keys) -> Keys + Send + Sync>;

/// User-supplied applicability predicate
pub type ApplicableFn = Arc<dyn Fn(&ColumnMeta) -> bool + Send + Sync>;

/// How an algorithm is implemented: a built-in variant or an extension
#[derive(Clone)]
pub enum SortImpl {
    Builtin(Builtin),
    Custom(SortFn),
}

/// Guard restricting an algorithm to compatible data
#[derive(Clone, Default)]
pub enum Applicability {
    #[default]
    Any,
    IntegerOnly,
    Custom(ApplicableFn),
}

impl Applicability {
    pub fn check(&self, meta: &ColumnMeta) -> bool {
        match self {
            Applicability::Any => true,
            Applicability::IntegerOnly => meta.dtype.is_integer(),
            Applicability::Custom(predicate) => predicate(meta),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Applicability::Any => "any",
            Applicability::IntegerOnly => "integer only",
            Applicability::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A named sorting algorithm together with its applicability guard
#[derive(Clone)]
pub struct AlgorithmSpec {
    name: String,
    implementation: SortImpl,
    applicability: Applicability,
}

impl AlgorithmSpec {
    pub fn builtin(builtin: Builtin) -> Self {
        let applicability = if builtin.integer_only() {
            Applicability::IntegerOnly
        } else {
            Applicability::Any
        };
        Self {
            name: builtin.name().to_string(),
            implementation: SortImpl::Builtin(builtin),
            applicability,
        }
    }

    pub fn custom<F>(name: impl Into<String>, sort_fn: F) -> Self
    where
        F: Fn(Keys) -> Keys + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            implementation: SortImpl::Custom(Arc::new(sort_fn)),
            applicability: Applicability::Any,
        }
    }

    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    pub fn builtin_kind(&self) -> Option<Builtin> {
        match self.implementation {
            SortImpl::Builtin(builtin) => Some(builtin),
            SortImpl::Custom(_) => None,
        }
    }

    pub fn is_applicable(&self, meta: &ColumnMeta) -> bool {
        self.applicability.check(meta)
    }

    /// Run the algorithm on an owned private copy of the keys
    pub fn sort(&self, keys: Keys) -> Result<Keys> {
        match &self.implementation {
            SortImpl::Builtin(builtin) => builtin.sort(keys),
            SortImpl::Custom(sort_fn) => Ok(sort_fn(keys)),
        }
    }
}

impl fmt::Debug for AlgorithmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.implementation {
            SortImpl::Builtin(_) => "builtin",
            SortImpl::Custom(_) => "custom",
        };
        f.debug_struct("AlgorithmSpec")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("applicability", &self.applicability)
            .finish()
    }
}

/// Registry of named algorithms, passed explicitly to the scheduler.
///
/// Entries keep registration order, which is also the default selection and
/// table column order.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    entries: Vec<Arc<AlgorithmSpec>>,
}

impl AlgorithmRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a registry holding every built-in algorithm
    pub fn with_builtins() -> Self {
        Self {
            entries: Builtin::all()
                .into_iter()
                .map(|b| Arc::new(AlgorithmSpec::builtin(b)))
                .collect(),
        }
    }

    /// Register a custom sort function under a new name
    pub fn register<F>(
        &mut self,
        name: &str,
        sort_fn: F,
        applicability: Option<Applicability>,
    ) -> Result<()>
    where
        F: Fn(Keys) -> Keys + Send + Sync + 'static,
    {
        let spec = AlgorithmSpec::custom(name, sort_fn)
            .with_applicability(applicability.unwrap_or_default());
        self.register_spec(spec)
    }

    /// Add an algorithm; fails if the name is taken
    pub fn register_spec(&mut self, spec: AlgorithmSpec) -> Result<()> {
        if self.position(spec.name()).is_some() {
            return Err(BenchError::DuplicateAlgorithm(spec.name().to_string()));
        }
        self.entries.push(Arc::new(spec));
        Ok(())
    }

    /// Add or replace an algorithm by name, keeping the original position.
    /// Returns the replaced entry, if any.
    pub fn register_override(&mut self, spec: AlgorithmSpec) -> Option<Arc<AlgorithmSpec>> {
        let spec = Arc::new(spec);
        match self.position(spec.name()) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], spec)),
            None => {
                self.entries.push(spec);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<AlgorithmSpec>> {
        self.position(name).map(|idx| Arc::clone(&self.entries[idx]))
    }

    /// Resolve a selection. `None` selects everything in registration order;
    /// otherwise names are resolved in the given order with duplicates
    /// dropped. Unknown names fail closed.
    pub fn get_all(&self, selection: Option<&[String]>) -> Result<Vec<Arc<AlgorithmSpec>>> {
        let Some(names) = selection else {
            return Ok(self.entries.clone());
        };
        if names.is_empty() {
            return Err(BenchError::Config("empty algorithm selection".to_string()));
        }

        let mut chosen: Vec<Arc<AlgorithmSpec>> = Vec::with_capacity(names.len());
        for name in names {
            let spec = self
                .get(name)
                .ok_or_else(|| BenchError::UnknownAlgorithm {
                    name: name.clone(),
                    available: self.available(),
                })?;
            if !chosen.iter().any(|c| c.name() == spec.name()) {
                chosen.push(spec);
            }
        }
        Ok(chosen)
    }

    pub fn is_applicable(&self, name: &str, meta: &ColumnMeta) -> Result<bool> {
        self.get(name)
            .map(|spec| spec.is_applicable(meta))
            .ok_or_else(|| BenchError::UnknownAlgorithm {
                name: name.to_string(),
                available: self.available(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }

    fn available(&self) -> String {
        let mut names = self.names();
        names.sort_unstable();
        names.join(", ")
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
