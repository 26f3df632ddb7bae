//! Process memory sampling.
//!
//! # Responsibilities
//! - Report the resident set size and heap size of the current process
//! - Refresh on every call; the monitor samples at most once per evaluation
//!
//! # Design Decisions
//! - `sysinfo` backs the resident set size
//! - Heap is live allocator bytes, known only when the host installs
//!   [`CountingAllocator`] as its global allocator; otherwise it is `None`
//!   and heap rules are skipped
//! - Probes are a trait so hosts with their own allocator accounting (and
//!   tests) can plug in exact numbers

use std::alloc::{GlobalAlloc, Layout, System as SystemAlloc};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub rss: u64,
    /// Live heap bytes, `None` when the probe cannot see the allocator.
    pub heap: Option<u64>,
}

/// Global allocator wrapper that counts live heap bytes.
///
/// ```no_run
/// use vitals::health::CountingAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: CountingAllocator = CountingAllocator::new();
/// ```
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocated: AtomicUsize,
}

impl CountingAllocator {
    pub const fn new() -> Self {
        Self {
            allocated: AtomicUsize::new(0),
        }
    }

    /// Bytes currently allocated through this allocator.
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed) as u64
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc(layout);
        if !ptr.is_null() {
            self.allocated.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.allocated.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        SystemAlloc.dealloc(ptr, layout);
        self.allocated.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = SystemAlloc.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            self.allocated.fetch_add(new_size, Ordering::Relaxed);
            self.allocated.fetch_sub(layout.size(), Ordering::Relaxed);
        }
        new_ptr
    }
}

/// Source of memory figures for the current process.
pub trait MemoryProbe: Send + Sync {
    fn sample(&self) -> MemoryUsage;
}

/// Probe backed by the `sysinfo` crate, plus an optional counting allocator
/// for the heap figure.
pub struct SysinfoProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
    allocator: Option<&'static CountingAllocator>,
}

impl std::fmt::Debug for SysinfoProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProbe")
            .field("pid", &self.pid)
            .field("heap_tracked", &self.allocator.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot resolve own pid, memory rules will see zero usage");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
            allocator: None,
        }
    }

    /// Read the heap figure from `allocator`, which must be the installed
    /// global allocator.
    pub fn with_allocator(allocator: &'static CountingAllocator) -> Self {
        Self {
            allocator: Some(allocator),
            ..Self::new()
        }
    }
}

impl MemoryProbe for SysinfoProbe {
    fn sample(&self) -> MemoryUsage {
        let heap = self.allocator.map(CountingAllocator::allocated);
        let Some(pid) = self.pid else {
            return MemoryUsage { rss: 0, heap };
        };

        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let rss = system.process(pid).map(|process| process.memory()).unwrap_or(0);
        MemoryUsage { rss, heap }
    }
}

/// Probe that reports whatever was last stored in it.
#[derive(Debug, Default)]
pub struct StaticProbe {
    rss: AtomicU64,
    heap: AtomicU64,
}

impl StaticProbe {
    pub fn new(rss: u64, heap: u64) -> Self {
        Self {
            rss: AtomicU64::new(rss),
            heap: AtomicU64::new(heap),
        }
    }

    pub fn set_rss(&self, bytes: u64) {
        self.rss.store(bytes, Ordering::Relaxed);
    }

    pub fn set_heap(&self, bytes: u64) {
        self.heap.store(bytes, Ordering::Relaxed);
    }
}

impl MemoryProbe for StaticProbe {
    fn sample(&self) -> MemoryUsage {
        MemoryUsage {
            rss: self.rss.load(Ordering::Relaxed),
            heap: Some(self.heap.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_probe_reports_latest_values() {
        let probe = StaticProbe::new(1000, 1000);
        assert_eq!(
            probe.sample(),
            MemoryUsage {
                rss: 1000,
                heap: Some(1000)
            }
        );
        probe.set_rss(3000);
        assert_eq!(probe.sample().rss, 3000);
    }

    #[test]
    fn sysinfo_probe_without_allocator_has_no_heap() {
        let usage = SysinfoProbe::new().sample();
        assert_eq!(usage.heap, None);
    }

    #[test]
    fn sysinfo_probe_reads_allocator_counter() {
        static ALLOCATOR: CountingAllocator = CountingAllocator::new();
        let layout = Layout::from_size_align(4096, 8).unwrap();
        let ptr = unsafe { ALLOCATOR.alloc(layout) };
        assert!(!ptr.is_null());

        let probe = SysinfoProbe::with_allocator(&ALLOCATOR);
        assert_eq!(probe.sample().heap, Some(4096));

        unsafe { ALLOCATOR.dealloc(ptr, layout) };
        assert_eq!(probe.sample().heap, Some(0));
    }

    #[test]
    fn counting_allocator_tracks_realloc() {
        let allocator = CountingAllocator::new();
        let layout = Layout::from_size_align(64, 8).unwrap();
        unsafe {
            let ptr = allocator.alloc_zeroed(layout);
            assert_eq!(allocator.allocated(), 64);

            let grown = allocator.realloc(ptr, layout, 1024);
            assert!(!grown.is_null());
            assert_eq!(allocator.allocated(), 1024);

            allocator.dealloc(grown, Layout::from_size_align(1024, 8).unwrap());
        }
        assert_eq!(allocator.allocated(), 0);
    }
}
