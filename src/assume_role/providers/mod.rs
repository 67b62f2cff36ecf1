pub mod aws_cli;
pub mod sts;

pub use aws_cli::AwsCliSessionProvider;
pub use sts::StsSessionProvider;
