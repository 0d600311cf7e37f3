//! Managed Runtime Bridge
//!
//! The listener lives in a managed environment (the Android VM in production).
//! Attaching threads to that environment and calling into it is the host's
//! job; the watchdog only needs the two capabilities in [`ManagedRuntime`].

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::core::error::RuntimeError;

/// Per-thread handle for calling into the managed environment
///
/// Only valid on the thread that acquired it, so it is neither `Send` nor
/// `Sync`.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionHandle {
    raw: NonNull<c_void>,
    _thread_bound: PhantomData<*mut ()>,
}

impl ExecutionHandle {
    /// Wrap a raw environment pointer; null yields `None`
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self {
            raw,
            _thread_bound: PhantomData,
        })
    }

    /// Handle for runtimes that call straight into Rust
    pub fn in_process() -> Self {
        Self {
            raw: NonNull::dangling(),
            _thread_bound: PhantomData,
        }
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr()
    }
}

/// Opaque reference into the managed environment (a global class reference,
/// a method id)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueRef(NonNull<c_void>);

// SAFETY: global references and method ids stay valid on every thread
unsafe impl Send for OpaqueRef {}
unsafe impl Sync for OpaqueRef {}

impl OpaqueRef {
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// The listener to call on an external dump request: a class and a
/// zero-argument static method on it
///
/// Resolved once by the host at startup, read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerBinding {
    class: OpaqueRef,
    method: OpaqueRef,
}

impl ListenerBinding {
    pub fn new(class: OpaqueRef, method: OpaqueRef) -> Self {
        Self { class, method }
    }

    /// Bind raw class and method handles; either being null yields `None`
    pub fn from_raw(class: *mut c_void, method: *mut c_void) -> Option<Self> {
        Some(Self::new(OpaqueRef::from_raw(class)?, OpaqueRef::from_raw(method)?))
    }

    /// Binding for runtimes whose listener is not addressed through handles
    pub fn in_process() -> Self {
        Self {
            class: OpaqueRef(NonNull::dangling()),
            method: OpaqueRef(NonNull::dangling()),
        }
    }

    pub fn class(&self) -> OpaqueRef {
        self.class
    }

    pub fn method(&self) -> OpaqueRef {
        self.method
    }
}

/// What the watchdog needs from the managed environment
///
/// Both methods run on a freshly spawned watchdog worker thread. Listener
/// calls for separate deliveries may overlap, so the listener must be
/// reentrant.
pub trait ManagedRuntime: Send + Sync {
    /// Handle for the calling thread, attaching it to the environment first
    /// if needed. An attached thread must be detached by the host when it
    /// exits.
    fn acquire_execution_handle(&self) -> Result<ExecutionHandle, RuntimeError>;

    /// Call the bound listener with no arguments
    fn invoke_listener(
        &self,
        handle: ExecutionHandle,
        binding: &ListenerBinding,
    ) -> Result<(), RuntimeError>;
}

/// Runtime whose listener is a plain Rust closure
pub struct FnRuntime<F> {
    listener: F,
}

impl<F> FnRuntime<F>
where
    F: Fn() + Send + Sync,
{
    pub fn new(listener: F) -> Self {
        Self { listener }
    }
}

impl<F> ManagedRuntime for FnRuntime<F>
where
    F: Fn() + Send + Sync,
{
    fn acquire_execution_handle(&self) -> Result<ExecutionHandle, RuntimeError> {
        Ok(ExecutionHandle::in_process())
    }

    fn invoke_listener(
        &self,
        _handle: ExecutionHandle,
        _binding: &ListenerBinding,
    ) -> Result<(), RuntimeError> {
        (self.listener)();
        Ok(())
    }
}
