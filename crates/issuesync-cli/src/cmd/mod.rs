pub mod roster;
pub mod sync;
