use std::sync::Arc;

use clarray_device::{ExecParams, KernelArg, Program};

use crate::kernel_cache::{CacheStats, CachedKernel, KernelCache};

struct NullProgram;

impl Program for NullProgram {
    fn name(&self) -> &str {
        "null"
    }

    fn launch(&self, _args: &[KernelArg<'_>], _params: &ExecParams) -> clarray_device::Result<()> {
        Ok(())
    }
}

fn kernel(entry_point: &str) -> CachedKernel {
    CachedKernel {
        program: Box::new(NullProgram),
        entry_point: entry_point.into(),
        source: format!("__kernel void {entry_point}() {{}}"),
        expression: String::new(),
    }
}

#[test]
fn test_get_counts_hits_and_misses() {
    let mut cache = KernelCache::new();
    assert!(cache.get("unary_op_sqrt_float").is_none());

    cache.put("unary_op_sqrt_float", Arc::new(kernel("unary_op")));
    assert!(cache.get("unary_op_sqrt_float").is_some());

    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, compiles: 0 });
}

#[test]
fn test_get_or_compile_compiles_once() {
    let mut cache = KernelCache::new();
    let mut calls = 0;
    for _ in 0..3 {
        cache
            .get_or_compile("array_zero_int", || {
                calls += 1;
                Ok::<_, std::convert::Infallible>(kernel("array_init"))
            })
            .unwrap();
    }

    assert_eq!(calls, 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1, compiles: 1 });
}

#[test]
fn test_failed_compile_is_not_cached() {
    let mut cache = KernelCache::new();
    let result = cache.get_or_compile("custom_full_bad", || Err::<CachedKernel, _>("syntax error"));

    assert_eq!(result.unwrap_err(), "syntax error");
    assert!(!cache.contains("custom_full_bad"));
    assert_eq!(cache.stats().compiles, 0);
}

#[test]
fn test_put_replaces_entry() {
    let mut cache = KernelCache::new();
    assert!(cache.put("k", Arc::new(kernel("first"))).is_none());

    let old = cache.put("k", Arc::new(kernel("second"))).unwrap();
    assert_eq!(old.entry_point, "first");
    assert_eq!(cache.get("k").unwrap().entry_point, "second");
}

#[test]
fn test_clear_releases_every_entry() {
    let mut cache = KernelCache::new();
    cache.put("a", Arc::new(kernel("a")));
    cache.put("b", Arc::new(kernel("b")));

    let mut released = Vec::new();
    cache.clear(|key, _| released.push(key.to_string()));
    released.sort();

    assert_eq!(released, ["a", "b"]);
    assert!(cache.is_empty());
}

#[test]
fn test_handles_outlive_clear() {
    let mut cache = KernelCache::new();
    let held = Arc::new(kernel("held"));
    cache.put("held", Arc::clone(&held));
    cache.clear(|_, _| {});

    assert_eq!(Arc::strong_count(&held), 1);
    assert_eq!(held.entry_point, "held");
}

#[test]
fn test_sync_generation_drops_old_entries() {
    let mut cache = KernelCache::new();
    cache.sync_generation(1);
    cache.put("k", Arc::new(kernel("k")));

    cache.sync_generation(1);
    assert!(cache.contains("k"));

    cache.sync_generation(2);
    assert!(cache.is_empty());
    assert_eq!(cache.generation(), 2);
}
