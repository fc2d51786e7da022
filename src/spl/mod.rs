//! Reading and rewriting the player's soundlist document.

pub mod document;
pub mod edit;
pub mod mutate;
pub mod scanner;
pub mod store;
pub mod tree;

pub use document::{build_hierarchy_index, enrich_live_list, parse_flat_list, HierarchyIndex, Soundlist};
pub use mutate::{add_sound, move_category, move_sound, rename_sound, AddedSound, NewSound};
