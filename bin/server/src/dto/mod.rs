pub mod common;
pub mod profiles;

pub use common::*;
pub use profiles::*;
