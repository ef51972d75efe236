//! Storage layer: transactional key-indexed persistence with sequence
//! allocators (spec.md §2).
//!
//! The sqlite adapter is the only backend shipped with this crate; the
//! domain layer depends only on the port traits in
//! [`crate::domain::ports`], so an alternate backend is a matter of adding
//! another module here.

pub mod sqlite;
