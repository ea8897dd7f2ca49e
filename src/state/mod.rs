/// State management module
///
/// This module handles all persistent and in-memory photo state:
/// - Shared data structures (data.rs)
/// - The SQLite photo store (store.rs)
/// - The bounded buffer of recent captures (buffer.rs)
/// - The library that ties the two together (library.rs)

pub mod data;
pub mod store;
pub mod buffer;
pub mod library;
