pub mod ast;
pub mod codegen;
pub mod lower;
pub mod parser;
mod transform;

pub use transform::{LoweredCode, TRANSFORM_STACK_SIZE, TransformError, transform};

/// The host rendering library symbol. Lowered code calls
/// `React.createElement`, and it is the only free name bound code may use
/// besides the language intrinsics.
pub const HOST_SYMBOL: &str = "React";
