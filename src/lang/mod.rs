//! # Cinder language data
//!
//! The AST the compiler consumes and the runtime values the VM manipulates.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - Value kinds are named in upper case (`INTEGER`, `BOOLEAN`, `NULL`) in
//!   error messages.

pub mod node;
pub mod value;
