//! Spawn-join functionality.
//!
//! **You may not need to check this if it is OK to run benchmarks with [`std::thread`].**
//!
//! Every phase of a run is a fixed group of tasks that is spawned at once and then joined as a
//! whole. The way a task is spawned is abstracted by [`Thread`], so that a run can be driven by
//! another thread implementation (for example, one that counts or delays the tasks it spawns).
//!
//! The functions spawned here do not return anything. Workers report back through the shared
//! state they are given.

/// A join handle returned by a spawn function.
pub trait JoinHandle {
    /// Join the thread, consume the boxed self.
    fn join(self: Box<Self>);
}

/// A thread management abstraction.
pub trait Thread {
    /// Spawn a new thread using a boxed closure.
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle>;

    /// Pin the current thread to a certain CPU core.
    fn pin(&self, core: usize);
}

/// A zero-sized wrapper for [`std::thread`] functions.
#[derive(Clone)]
pub struct DefaultThread;

/// A wrapper for [`std::thread::JoinHandle`].
pub struct DefaultJoinHandle(std::thread::JoinHandle<()>);

impl JoinHandle for DefaultJoinHandle {
    fn join(self: Box<Self>) {
        let handle = self.0;
        assert!(handle.join().is_ok());
    }
}

impl Thread for DefaultThread {
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle> {
        let handle = std::thread::spawn(f);
        Box::new(DefaultJoinHandle(handle))
    }

    fn pin(&self, core: usize) {
        if let Some(cores) = core_affinity::get_core_ids() {
            if !cores.is_empty() {
                core_affinity::set_for_current(cores[core % cores.len()]);
            }
        }
    }
}

/// Join every handle of a task group. Returns only after all of them have finished.
pub fn join_all(handles: Vec<Box<dyn JoinHandle>>) {
    for handle in handles {
        handle.join();
    }
}
