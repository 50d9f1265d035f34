//! The pending-fence registry.
//!
//! One registry exists per load operation. Construction is its only writer
//! (inserts), fence resolution its only consumer (removals). This replaces
//! the process-wide singleton design: concurrent independent loads each get
//! their own registry, and ids only need to be unique within it.

use crate::error::ConfigError;
use indexmap::IndexMap;

/// Identifier of one deferred expansion, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(u64);

impl FenceId {
    pub fn from_raw(raw: u64) -> Self {
        FenceId(raw)
    }
}

impl std::fmt::Display for FenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fence-{}", self.0)
    }
}

/// Whether a fence expands into a sequence or a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    /// `[[ placeholder --> expression ]]`, expands to a sequence.
    List,

    /// `{{ placeholder --> expression }}`, expands to a mapping.
    Dict,
}

/// One fenced scalar awaiting expansion. Immutable after construction and
/// consumed exactly once during postprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredExpansion {
    pub id: FenceId,

    /// The original tagged scalar text, fence delimiters included.
    pub raw: String,

    pub kind: FenceKind,

    /// The bound variable name inside the fence.
    pub placeholder: String,

    /// Path naming the collection this fence expands over.
    pub source_expr: String,
}

/// Registry of not-yet-resolved fences, keyed by id.
///
/// Drained at most once; handing an already-drained registry back to
/// postprocessing is misuse and reported as such.
#[derive(Debug, Default)]
pub struct PendingFences {
    next_id: u64,
    entries: IndexMap<FenceId, DeferredExpansion>,
    consumed: bool,
}

impl PendingFences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new deferred expansion, returning its fresh id.
    pub fn register(
        &mut self,
        raw: String,
        kind: FenceKind,
        placeholder: String,
        source_expr: String,
    ) -> FenceId {
        let id = FenceId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            id = %id,
            ?kind,
            placeholder = %placeholder,
            source = %source_expr,
            "registered deferred fence"
        );
        self.entries.insert(
            id,
            DeferredExpansion {
                id,
                raw,
                kind,
                placeholder,
                source_expr,
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: FenceId) -> Option<&DeferredExpansion> {
        self.entries.get(&id)
    }

    /// Remove and return the entry for `id`.
    pub fn take(&mut self, id: FenceId) -> Option<DeferredExpansion> {
        self.entries.shift_remove(&id)
    }

    /// Ids of all entries not yet consumed, in registration order.
    pub fn outstanding_ids(&self) -> Vec<FenceId> {
        self.entries.keys().copied().collect()
    }

    /// Mark the registry as being drained by a postprocess run.
    ///
    /// Fails if a previous run already drained it: ids handed out by this
    /// registry are gone, so a second run could never complete.
    pub fn begin_drain(&mut self) -> Result<(), ConfigError> {
        if self.consumed {
            return Err(ConfigError::RegistryConsumed);
        }
        self.consumed = true;
        Ok(())
    }
}
