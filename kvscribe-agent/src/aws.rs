use std::{
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use api::{AwsConfig, AwsStsCredential, FileMode, FileModeError, ShapeError};

use crate::{
    files,
    scrub::Scrubber,
    vault::{SecretSource, TransportError},
};

#[derive(thiserror::Error, Debug)]
pub enum AwsError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected AWS credential from {path:?}")]
    Shape {
        path: String,
        #[source]
        source: ShapeError,
    },
    #[error("could not parse file mode {mode:?} for AWS profile {profile:?}")]
    InvalidMode {
        profile: String,
        mode: String,
        #[source]
        source: FileModeError,
    },
    #[error("could not write AWS credentials to {}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub async fn fetch_aws_sts_credential(
    source: &impl SecretSource,
    config: &AwsConfig,
) -> Result<AwsStsCredential, AwsError> {
    let path = config.vault_path();
    log::info!(
        "Fetching AWS STS credentials from {path:?} for {}",
        config.output_path.display()
    );

    let data = source.write(&path).await.map_err(|err| {
        log::error!("Failed to fetch AWS credentials from {path:?}");
        TransportError {
            path: path.clone(),
            destinations: vec![config.output_path.clone()],
            source: err,
        }
    })?;

    let credential =
        AwsStsCredential::try_from(&data).map_err(|source| AwsError::Shape { path, source })?;
    log::debug!("Received AWS access key {}", credential.access_key);
    Ok(credential)
}

/// Renders the profile in the format of `~/.aws/credentials`
pub fn render_credentials(config: &AwsConfig, credential: &AwsStsCredential) -> String {
    let region = config
        .region
        .as_ref()
        .map(|region| format!("region = {region}\n"))
        .unwrap_or_default();
    format!(
        "[{}]\naws_access_key_id = {}\naws_secret_access_key = {}\naws_session_token = {}\n{region}",
        config.profile, credential.access_key, credential.secret_key, credential.session_token
    )
}

pub fn write_aws_credentials(
    config: &AwsConfig,
    credential: &AwsStsCredential,
    scrubber: &mut impl Scrubber,
) -> Result<(), AwsError> {
    let mode = config
        .mode
        .parse::<FileMode>()
        .map_err(|source| AwsError::InvalidMode {
            profile: config.profile.clone(),
            mode: config.mode.clone(),
            source,
        })?;

    let path: &Path = &config.output_path;
    let file_err = |source| AwsError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    log::info!("Writing AWS credentials to {}", path.display());
    let mut file = files::open_for_write(path, mode).map_err(file_err)?;
    scrubber.register(path);
    file.write_all(render_credentials(config, credential).as_bytes())
        .map_err(file_err)
}
