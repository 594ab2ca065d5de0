//! XML utilities for inline markup.

mod utils;

pub use utils::*;
