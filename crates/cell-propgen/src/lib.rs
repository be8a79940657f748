pub mod generator;

pub use generator::{generate_sequence, GeneratorConfig, Operation, OperationGenerator};
