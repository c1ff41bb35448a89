//! Error classification shared by every subsystem
//!
//! Each subsystem keeps its own error enum; `ErrorClass` tells callers
//! what to do about a failure without matching on every variant.

/// How a failure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorClass {
    /// Network hiccup or decode glitch, retry later
    Transient,
    /// Allocation failure or oversized payload, abort and keep prior state
    ResourceExhaustion,
    /// Bad payload or request, reject at the boundary
    Malformed,
    /// The operation failed for good; the device keeps running
    Fatal,
}

/// Errors that can be sorted into an [`ErrorClass`]
pub trait Classify {
    fn class(&self) -> ErrorClass;

    /// Worth retrying after a delay
    fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}
