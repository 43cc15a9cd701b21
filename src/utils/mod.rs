// Utils module

mod env;
mod id_validation;
mod query_string;

pub use env::*;
pub use id_validation::*;
pub use query_string::*;
