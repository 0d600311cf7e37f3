//! Origin Classifier
//!
//! Decides from the kernel `siginfo` whether a delivery was sent by this very
//! process or by someone else. Only the external case reaches the listener;
//! a process signalling itself (its own dump tooling) is just forwarded.
//!
//! Everything here is async-signal-safe.

use crate::core::types::{Origin, Pid};

/// Classify a sender pid against the current process id
#[inline]
pub fn classify(sender_pid: Pid, own_pid: Pid) -> Origin {
    if sender_pid == own_pid {
        Origin::SelfSent
    } else {
        Origin::External
    }
}

/// Sender pid carried by a `siginfo` record
///
/// `None` when the kernel supplied no record at all.
///
/// # Safety
/// `info` must be null or point to the `siginfo_t` handed to an `SA_SIGINFO`
/// handler.
#[inline]
pub unsafe fn sender_pid(info: *const libc::siginfo_t) -> Option<Pid> {
    if info.is_null() {
        return None;
    }
    Some((*info).si_pid())
}

/// Classify one delivery
///
/// A delivery without sender information is treated as external: the
/// listener hearing about it is preferable to it being lost.
///
/// # Safety
/// Same contract as [`sender_pid`].
#[inline]
pub unsafe fn classify_siginfo(info: *const libc::siginfo_t, own_pid: Pid) -> Origin {
    match sender_pid(info) {
        Some(pid) => classify(pid, own_pid),
        None => Origin::External,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::ptr;

    #[test]
    fn test_same_pid_is_self() {
        assert_eq!(classify(4242, 4242), Origin::SelfSent);
        assert_eq!(classify(1, 4242), Origin::External);
        assert_eq!(classify(0, 4242), Origin::External);
    }

    #[test]
    fn test_missing_siginfo_is_external() {
        let origin = unsafe { classify_siginfo(ptr::null(), 4242) };
        assert_eq!(origin, Origin::External);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Any sender equal to the current pid is the process itself
        #[test]
        fn sender_equal_to_own_pid_is_self(pid in 1 as Pid..Pid::MAX) {
            prop_assert_eq!(classify(pid, pid), Origin::SelfSent);
            prop_assert!(!classify(pid, pid).notifies_listener());
        }

        /// Any other sender is external
        #[test]
        fn other_senders_are_external(own in 1 as Pid..Pid::MAX, sender in any::<Pid>()) {
            prop_assume!(sender != own);
            prop_assert_eq!(classify(sender, own), Origin::External);
            prop_assert!(classify(sender, own).notifies_listener());
        }
    }
}
