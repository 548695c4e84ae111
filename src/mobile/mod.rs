//! Mobile platform integration
//!
//! Platform-family specific pieces the scanner needs before it may touch the
//! radio.

pub mod permissions;

pub use permissions::{
    gate_for_platform, ImplicitPermissionGate, Permission, PermissionGate, PermissionPrompt,
    PermissionState, Rationale, RuntimePermissionGate, StackAuthorizationGate,
};
