use std::path::PathBuf;

use kvscribe::{
    config::Config,
    scrub::{self, ScrubList},
};
use rootcause::{Report, prelude::ResultExt as _, report};

pub fn scrub(config: &Config, manifest: Option<PathBuf>) -> Result<(), Report> {
    let manifest = manifest
        .or_else(|| config.manifest.clone())
        .ok_or(report!("`--manifest` required if no manifest is configured"))?;

    let list = ScrubList::load_manifest(&manifest)?;
    let removed = list.scrub()?;
    scrub::scrub_file(&manifest)
        .context("Could not remove the manifest")
        .attach(manifest.display().to_string())?;

    log::info!("Scrubbed {removed} of {} files", list.files().len());
    Ok(())
}
