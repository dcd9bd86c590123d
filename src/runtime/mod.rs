pub mod runtime_error;
pub mod session;
pub mod vm;

pub use session::{Session, SessionError};
pub use vm::{Vm, VmConfig};
