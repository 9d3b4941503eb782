#![doc = include_str!("../README.md")]

mod bindings;
mod env;
pub mod error;
mod frame;
mod name;
mod scope;
mod var;

pub use bindings::{Arg, Bindings};
pub use dynenv_error::Error;
pub use env::Environment;
pub use frame::Frame;
pub use name::{Name, Token};
pub use scope::{spawn, spawn_blocking, Scope, Scoped};
pub use var::Variable;
