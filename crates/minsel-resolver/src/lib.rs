//! Minimal version selection over an opaque requirement graph.
//!
//! Given a root module and a [`Requirements`](minsel_core::requirements::Requirements)
//! provider, the resolver computes the build list: for every module path
//! reachable from the root, the maximum version demanded by any transitive
//! requirement. The provider supplies the graph and the version ordering;
//! the engine interprets nothing about version strings except the `"none"`
//! sentinel.
//!
//! See <https://research.swtch.com/vgo-mvs> for the algorithm.

pub mod downgrade;
pub mod graph;
pub mod report;
pub mod resolver;
