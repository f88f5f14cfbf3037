#![forbid(unsafe_code)]

mod env;
mod error;
mod resolve;

pub use env::TypeEnv;
pub use error::TypeError;
pub use resolve::{check_and_update, resolve_expr, resolve_program, resolve_stmt, Ty};
