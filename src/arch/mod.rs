//! Architecture support, keyed by target CPU family.

pub mod x86;
