//! Peer communication
//!
//! Outbound calls to other lighthouse nodes: status probes, update pushes,
//! sync pulls and topology notices.

mod classification;
mod client;

pub use classification::PeerClassification;
pub use client::PeerClient;
