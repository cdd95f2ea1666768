pub mod bat;
pub mod cat;
pub mod descriptor;
pub mod eit;
pub mod filter;
pub mod nit;
pub mod pat;
pub mod pmt;
pub mod sdt;
pub mod section;
pub mod store;
pub mod tdt;
pub mod time;

pub use descriptor::Descriptor;
pub use filter::{FilterTable, TableKind};
pub use section::{Outcome, TableHeader};
pub use store::{PsiStore, Stats};
