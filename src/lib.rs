//! Packman: a personal packing checklist engine.
//!
//! Indented text is parsed into a tree of groups and items; each node moves
//! independently between "to pack", "packed" and "not needed", with cascades
//! from groups to descendants and from restored items up to their ancestors.
//! See [`engine::Packman`] for the operations a UI drives.

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod parser;
pub mod state;
pub mod storage;
pub mod tree;
pub mod tree_render;
pub mod views;
