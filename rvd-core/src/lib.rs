pub mod calendar_week;
pub mod diagnosis;
pub mod error;
pub mod region;
pub mod sari;
pub mod sentinel;
pub mod sources;
pub mod svg;
pub mod trace;
pub mod week_range;
