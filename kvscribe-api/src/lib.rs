//! Declarations of what kvscribe fetches from vault and where it writes it

mod aws;
mod mode;
mod secret;

pub use aws::{AwsConfig, AwsStsCredential, ShapeError};
pub use mode::{FileMode, FileModeError};
pub use secret::{SecretData, SecretField, SecretRequest, Secrets};
