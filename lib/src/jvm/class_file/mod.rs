mod attribute;
mod class;
mod constants;
mod debug_tables;
mod member;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use debug_tables::*;
pub use member::*;
pub use version::*;
