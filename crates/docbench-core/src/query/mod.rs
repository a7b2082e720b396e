//! Query compilation.

mod compile;

pub use compile::compile;
