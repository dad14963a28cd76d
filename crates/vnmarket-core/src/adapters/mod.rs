mod ssi;
mod vnd;

pub use ssi::SsiAdapter;
pub use vnd::VndAdapter;
