//! Adapter implementations for supervisor ports.

pub mod memory;

mod http;
mod process;

pub use http::ReqwestHttpProbe;
pub use process::TokioProcessLauncher;
