//! Kernel deduplication cache.
//!
//! Maps a kernel key (see [`clarray_codegen::RenderedKernel::key`]) to the
//! program compiled for it in the current device session. Entries belong to
//! one session generation: the engine clears the cache whenever the session
//! opens a new context, so a program never outlives the context that built it.
//!
//! # Keys
//!
//! | Kernel            | Key                                     |
//! |-------------------|-----------------------------------------|
//! | zero fill         | `array_zero_{type}`                     |
//! | index fill        | `array_index_{type}`                    |
//! | unary operation   | `unary_op_{op}_{type}`                  |
//! | binary operation  | `binary_op_{op}_{type}`                 |
//! | simple custom     | `custom_simple_{type codes}{expression}`|
//! | full custom       | `custom_full_{source}`                  |

use std::collections::HashMap;
use std::sync::Arc;

use clarray_device::Program;

/// Compiled kernel shared between the cache and kernel handles.
pub struct CachedKernel {
    /// The compiled, executable program.
    pub program: Box<dyn Program>,
    /// Entry point name.
    pub entry_point: String,
    /// Generated source code.
    pub source: String,
    /// Caller expression of a simple custom kernel, otherwise the source.
    pub expression: String,
}

impl std::fmt::Debug for CachedKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedKernel")
            .field("entry_point", &self.entry_point)
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub compiles: usize,
}

#[derive(Debug, Default)]
pub struct KernelCache {
    kernels: HashMap<String, Arc<CachedKernel>>,
    /// Session generation the entries were compiled in.
    generation: u64,
    stats: CacheStats,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, counting a hit or a miss.
    pub fn get(&mut self, key: &str) -> Option<Arc<CachedKernel>> {
        match self.kernels.get(key) {
            Some(kernel) => {
                self.stats.hits += 1;
                tracing::debug!(kernel.key = %key, "kernel cache hit");
                Some(Arc::clone(kernel))
            }
            None => {
                self.stats.misses += 1;
                tracing::debug!(kernel.key = %key, "kernel cache miss");
                None
            }
        }
    }

    /// Insert `kernel`, replacing any entry under the same key.
    pub fn put(&mut self, key: impl Into<String>, kernel: Arc<CachedKernel>) -> Option<Arc<CachedKernel>> {
        self.kernels.insert(key.into(), kernel)
    }

    /// Get `key`, compiling and inserting it on a miss.
    pub fn get_or_compile<E>(
        &mut self,
        key: &str,
        compile: impl FnOnce() -> Result<CachedKernel, E>,
    ) -> Result<Arc<CachedKernel>, E> {
        if let Some(kernel) = self.get(key) {
            return Ok(kernel);
        }

        let kernel = Arc::new(compile()?);
        self.stats.compiles += 1;
        tracing::debug!(kernel.key = %key, kernel.name = %kernel.entry_point, "kernel compiled");
        self.put(key, Arc::clone(&kernel));
        Ok(kernel)
    }

    /// Hand every entry to `release` and empty the cache.
    ///
    /// Kernel handles still holding an entry keep it alive until they drop.
    pub fn clear(&mut self, mut release: impl FnMut(&str, Arc<CachedKernel>)) {
        let count = self.kernels.len();
        for (key, kernel) in self.kernels.drain() {
            release(&key, kernel);
        }
        if count > 0 {
            tracing::debug!(count, "kernel cache cleared");
        }
    }

    /// Drop entries compiled in another generation and adopt `generation`.
    pub fn sync_generation(&mut self, generation: u64) {
        if self.generation != generation {
            self.clear(|_, _| {});
            self.generation = generation;
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kernels.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
