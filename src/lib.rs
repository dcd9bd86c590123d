pub mod bytecode;
pub mod lang;
pub mod runtime;
