use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use resolve_mcp_core::{Category, OperationInfo, ParameterSchema};

use super::handler::OperationHandler;
use super::operation::{OperationError, RegistryError};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A registered operation. Immutable once registered.
pub struct Operation {
    name: String,
    category: Category,
    description: String,
    parameters: ParameterSchema,
    handler: Arc<dyn OperationHandler>,
}

impl Operation {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    pub(crate) fn handler(&self) -> Arc<dyn OperationHandler> {
        Arc::clone(&self.handler)
    }

    /// Public description of this operation.
    #[must_use]
    pub fn info(&self) -> OperationInfo {
        OperationInfo {
            name: self.name.clone(),
            category: self.category,
            description: self.description.clone(),
            parameter_schema: self.parameters.clone(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("params", &self.parameters.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RegistrySnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of all operations in registration order.
///
/// Cheap to clone and restartable: every call to [`RegistrySnapshot::iter`]
/// starts again from the first registered operation.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    ops: Arc<Vec<Arc<Operation>>>,
}

impl RegistrySnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Operation>> + '_ {
        self.ops.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.iter().map(|op| op.name())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl<'a> IntoIterator for &'a RegistrySnapshot {
    type Item = &'a Arc<Operation>;
    type IntoIter = std::slice::Iter<'a, Arc<Operation>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Registry of every operation the backend can perform.
///
/// Provides two access paths:
/// - **By name** (`lookup`): `DashMap` keyed by operation name
/// - **In order** (`all`): registration order, the tie-break used by resolution
///   and search
///
/// Registration is the only mutator and is only allowed before
/// [`OperationRegistry::mark_ready`]; afterwards the registry is read-only.
pub struct OperationRegistry {
    by_name: DashMap<String, Arc<Operation>>,
    /// Registration order. Writers hold this lock across the name insert so
    /// both views stay consistent.
    order: RwLock<Arc<Vec<Arc<Operation>>>>,
    ready: AtomicBool,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            order: RwLock::new(Arc::new(Vec::new())),
            ready: AtomicBool::new(false),
        }
    }

    /// Registers an operation.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Sealed`] after the ready transition
    /// - [`RegistryError::InvalidCategory`] if `category` is not a declared tag
    /// - [`RegistryError::Duplicate`] if `name` is already registered
    pub fn register(
        &self,
        name: impl Into<String>,
        category: &str,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: Arc<dyn OperationHandler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut order = self.order.write();

        if self.ready.load(Ordering::Acquire) {
            return Err(RegistryError::Sealed { name });
        }
        let category = category
            .parse::<Category>()
            .map_err(|source| RegistryError::InvalidCategory {
                name: name.clone(),
                source,
            })?;

        let op = Arc::new(Operation {
            name: name.clone(),
            category,
            description: description.into(),
            parameters,
            handler,
        });

        match self.by_name.entry(name) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&op));
                Arc::make_mut(&mut *order).push(op);
                Ok(())
            }
        }
    }

    /// Retrieves an operation by name.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnknownOperation`] if no such operation exists.
    pub fn lookup(&self, name: &str) -> Result<Arc<Operation>, OperationError> {
        self.by_name
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| OperationError::UnknownOperation {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All operations in registration order.
    #[must_use]
    pub fn all(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            ops: Arc::clone(&*self.order.read()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ready transition: no further registrations are accepted.
    pub fn mark_ready(&self) {
        let order = self.order.write();
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!(operations = order.len(), "operation registry sealed");
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
