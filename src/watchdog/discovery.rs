//! Dump Thread Discovery
//!
//! Finds the platform thread that writes the stack dump when it receives the
//! watched signal. The table is scanned fresh on every lookup; threads come
//! and go between deliveries.

use std::sync::Arc;

use crate::core::types::{ThreadDescriptor, Tid};
use crate::os::ThreadLister;

/// Looks up the dump-producing thread by name
#[derive(Clone)]
pub struct DumpThreadDiscovery {
    lister: Arc<dyn ThreadLister>,
    names: Vec<String>,
}

impl DumpThreadDiscovery {
    pub fn new(lister: Arc<dyn ThreadLister>, names: Vec<String>) -> Self {
        Self { lister, names }
    }

    /// Accepted dump-thread names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is one of the accepted spellings
    pub fn is_dump_thread_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Id of the first thread whose name is an accepted spelling
    ///
    /// An unreadable table, or no match, yields `None`. Threads that exit
    /// between listing and reading are skipped.
    pub fn find_dump_thread_id(&self) -> Option<Tid> {
        self.find_dump_thread().map(|thread| thread.tid)
    }

    /// Same as [`find_dump_thread_id`](Self::find_dump_thread_id), keeping the name
    pub fn find_dump_thread(&self) -> Option<ThreadDescriptor> {
        let tids = match self.lister.thread_ids() {
            Ok(tids) => tids,
            Err(e) => {
                tracing::debug!("Thread table unreadable: {}", e);
                return None;
            }
        };

        for tid in tids {
            let name = match self.lister.thread_name(tid) {
                Ok(name) => name,
                Err(e) => {
                    tracing::trace!("Skipping thread {}: {}", tid, e);
                    continue;
                }
            };

            if self.is_dump_thread_name(&name) {
                return Some(ThreadDescriptor::new(tid, name));
            }
        }

        tracing::debug!("No thread named {:?} in the thread table", self.names);
        None
    }
}

impl std::fmt::Debug for DumpThreadDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpThreadDiscovery")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
