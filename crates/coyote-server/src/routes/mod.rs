pub mod events;
pub mod shock;
pub mod status;
