//! Capability descriptors for native driver objects.
//!
//! Native connections and statements implement an arbitrary subset of the
//! optional operations. Instead of probing the object on every call, the
//! supported set is resolved once when the wrapper is constructed and
//! consulted before each delegation.

use std::fmt;

/// An optional operation a native connection or statement may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Execute a statement that returns no rows.
    Exec,
    /// Execute a statement that returns rows.
    Query,
    /// Prepare a statement for later execution.
    Prepare,
    /// Begin a transaction.
    BeginTx,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Capability::Exec => 1 << 0,
            Capability::Query => 1 << 1,
            Capability::Prepare => 1 << 2,
            Capability::BeginTx => 1 << 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Exec => "exec",
            Capability::Query => "query",
            Capability::Prepare => "prepare",
            Capability::BeginTx => "begin_tx",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of capabilities a native object supports.
///
/// Resolved once at wrap time; read-only afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set.
    pub fn none() -> Self {
        CapabilitySet(0)
    }

    /// Every capability.
    pub fn all() -> Self {
        CapabilitySet::none()
            .with(Capability::Exec)
            .with(Capability::Query)
            .with(Capability::Prepare)
            .with(Capability::BeginTx)
    }

    /// Add a capability to the set.
    pub fn with(self, capability: Capability) -> Self {
        CapabilitySet(self.0 | capability.bit())
    }

    /// Whether the set contains `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(CapabilitySet::none(), CapabilitySet::with)
    }
}
