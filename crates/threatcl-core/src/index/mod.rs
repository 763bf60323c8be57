//! Directory scanning for the document store

mod scanner;

pub use scanner::*;
