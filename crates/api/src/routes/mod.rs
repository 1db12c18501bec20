pub mod detect;
pub mod sessions;
