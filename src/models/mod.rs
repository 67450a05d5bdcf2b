//! Domain models for Packman.
//!
//! # Core Concepts
//!
//! - [`Node`]: a named entry in the packing tree. Nodes are created in bulk from
//!   indented text and replaced wholesale on import or reset.
//! - [`Status`]: the tri-state lifecycle of a node (to pack, packed, not needed).
//!   Statuses live in a separate map keyed by node id, never on the node itself.
//! - [`View`]: one of the three columns the UI renders, each with its own
//!   visibility rule.
//! - [`ViewEntry`] / [`ViewModel`]: the render-ready output of the engine.

mod node;
mod status;
mod view;

pub use node::*;
pub use status::*;
pub use view::*;
