//! Binding stage: evaluates lowered component code with the host rendering
//! library as its only capability.

mod bind;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod evaluator_helpers;
pub mod executor;
pub mod host;
pub mod pattern;
pub mod resolve;
pub mod runtime_value;

pub use bind::{BindOptions, ComponentValue, bind, bind_with};
pub use error::{BindError, RuntimeError};
pub use evaluator::Interpreter;
pub use runtime_value::{Element, Object, RuntimeValue};
