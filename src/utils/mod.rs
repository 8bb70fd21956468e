pub mod crypto;
pub mod names;
pub mod time;
pub mod token;
