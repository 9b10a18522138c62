pub mod commands;
pub mod copy;
pub mod errors;
pub mod fine;
pub mod issue;
pub mod reservation;
pub mod value_objects;

pub use copy::*;
pub use errors::*;
pub use value_objects::*;
