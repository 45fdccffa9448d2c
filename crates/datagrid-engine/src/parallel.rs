//! Crate-local worker pool for parallel search scans and bulk validation.
//!
//! The engine never touches Rayon's global pool: grids are embedded in host
//! processes that may have configured that pool for their own workloads, and
//! global initialization can fail outright on constrained hosts. A private
//! pool is built once on first use; when it cannot be built, `pool()` returns
//! `None` and every call site runs its sequential scan instead.

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
pub(crate) fn pool() -> Option<&'static rayon::ThreadPool> {
    use std::sync::OnceLock;

    static POOL: OnceLock<Option<rayon::ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(scan_threads())
            .thread_name(|i| format!("datagrid-scan-{i}"))
            .build()
            .ok()
    })
    .as_ref()
}

/// Pool width: `DATAGRID_SCAN_THREADS` when set to a positive number,
/// otherwise one worker per available core.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn scan_threads() -> usize {
    std::env::var("DATAGRID_SCAN_THREADS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
}
