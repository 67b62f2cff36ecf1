pub mod assume_role;
pub mod aws;
pub mod cli;
pub mod logging;
pub mod sandbox;
pub mod settings;
pub mod stack_outputs;
