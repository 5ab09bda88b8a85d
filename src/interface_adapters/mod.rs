pub mod clients;
pub mod protocol;
pub mod session_cache;
