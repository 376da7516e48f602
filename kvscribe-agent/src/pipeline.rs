use crate::{
    aws::{self, AwsError},
    config::Config,
    kv::{self, KvError},
    observer::Observer,
    scrub::Scrubber,
    vault::{self, SecretSource, TransportError},
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Aws(#[from] AwsError),
}

/// Fetches every configured secret and AWS credential and writes them out.
/// Nothing is written unless every key/value secret could be fetched
pub async fn materialize(
    source: &impl SecretSource,
    config: &Config,
    observer: &impl Observer,
    scrubber: &mut impl Scrubber,
) -> Result<(), PipelineError> {
    let secrets = vault::fetch_secrets(source, &config.secrets, &config.secret_prefix).await?;
    kv::write_kv_output(&config.secrets, &secrets, observer, scrubber)?;

    for aws_config in &config.aws {
        let credential = aws::fetch_aws_sts_credential(source, aws_config).await?;
        aws::write_aws_credentials(aws_config, &credential, scrubber)?;
    }

    Ok(())
}
