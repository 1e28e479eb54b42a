//! Content Hasher feature

mod hasher;

pub use hasher::{ContentHasher, Hashable, HASH_DELIMITER};
