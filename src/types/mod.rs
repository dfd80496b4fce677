pub mod error;
pub mod frame;
pub mod phase;
pub mod session;
