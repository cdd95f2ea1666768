pub mod bitreader;
pub mod constants;
pub mod core;
pub mod error;
pub mod network;
pub mod psi;
pub mod report;
pub mod ts;

pub use core::{run, Input, Options};
pub use psi::store::PsiStore;
pub use report::{Detail, Format};
