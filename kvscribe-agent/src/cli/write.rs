use kvscribe::{config::Config, observer::LogObserver, pipeline, scrub::ScrubList};
use rootcause::{Report, prelude::ResultExt as _};

use crate::cli::common;

/// Writes everything and saves the manifest, even if writing failed halfway
pub async fn write(config: &Config) -> Result<(), Report> {
    let client = common::vault_client(config)?;

    let mut scrub = ScrubList::new();
    let result = pipeline::materialize(&client, config, &LogObserver, &mut scrub).await;

    if let Some(manifest) = &config.manifest {
        if let Err(err) = scrub.save_manifest(manifest) {
            log::error!("{err}");
            result.context("Could not write all secrets")?;
            return Err(err.into());
        }
        log::info!(
            "Saved {} written files to {}",
            scrub.files().len(),
            manifest.display()
        );
    }

    result.context("Could not write all secrets")?;
    log::info!("Done!");
    Ok(())
}
