//! Live chain topology
//!
//! The mesh is a tree of address strings, never pointers. Each node only
//! knows its own parent and its own descendants; nobody holds the global
//! picture. Two things can change after startup:
//! - the parent pointer, when a newly promoted node sends a topology notice
//! - an empty descendant list, when it is learned from the parent

use serde::Serialize;

/// This node's current view of its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    parent: Option<String>,
    descendants: Vec<String>,
}

impl Topology {
    pub fn new(parent: Option<String>, descendants: Vec<String>) -> Self {
        Self {
            parent,
            descendants,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Descendants as configured or learned, self included if listed.
    pub fn descendants(&self) -> &[String] {
        &self.descendants
    }

    /// Re-point the parent after a topology notice.
    ///
    /// Returns true if the pointer changed.
    pub fn set_parent(&mut self, parent: String) -> bool {
        if self.parent.as_deref() == Some(parent.as_str()) {
            return false;
        }
        self.parent = Some(parent);
        true
    }

    /// Adopt a descendant list reported by the parent.
    ///
    /// Only fills an empty list; a configured list always wins.
    pub fn adopt_descendants(&mut self, reported: Vec<String>) -> bool {
        if !self.descendants.is_empty() || reported.is_empty() {
            return false;
        }
        self.descendants = reported;
        true
    }

    /// Addresses a fan-out should reach, in order, without `self_addr`.
    pub fn fan_out_targets(&self, self_addr: &str) -> Vec<String> {
        self.descendants
            .iter()
            .filter(|addr| addr.as_str() != self_addr)
            .cloned()
            .collect()
    }

    /// Peers asked whether they are running before a promotion:
    /// descendants plus the parent, minus self, without duplicates.
    pub fn liveness_scope(&self, self_addr: &str) -> Vec<String> {
        let mut scope = self.fan_out_targets(self_addr);
        if let Some(parent) = &self.parent {
            if parent != self_addr && !scope.contains(parent) {
                scope.push(parent.clone());
            }
        }
        scope
    }

    /// Position of `self_addr` in the descendant list, 0 if absent.
    ///
    /// Chain members listed earlier attempt promotion first.
    pub fn stagger_rank(&self, self_addr: &str) -> u32 {
        self.descendants
            .iter()
            .position(|addr| addr == self_addr)
            .map(|idx| idx as u32)
            .unwrap_or(0)
    }
}
