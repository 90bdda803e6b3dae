pub mod catalog;
pub mod codegen;
pub mod config;
pub mod emit;
pub mod error;
pub mod model;
pub mod registry;
pub mod template;
