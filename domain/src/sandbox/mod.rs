//! Sandbox policy: the resource and capability limits a tool runs under.

pub mod policy;

pub use policy::SandboxPolicy;
