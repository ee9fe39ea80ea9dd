//! An interactive console over a file-backed object store.
//!
//! Lines typed at the prompt become commands over typed records: create,
//! show, list, count, update and destroy, both in the plain
//! `show User <id>` spelling and the dotted `User.show("<id>")` one.
//! Every mutation goes straight back to a JSON file, so a later session
//! picks up where the last one stopped.

mod interpreter;
mod lexer;
mod literal;
pub mod model;
pub mod parser;
pub mod storage;

pub use interpreter::Interpreter;
pub use model::{ModelKind, Record};
pub use storage::{FileStore, StoreError, StoreRecord};
