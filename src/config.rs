use anyhow::{Context, Result};
use std::env;

use crate::archive::ArchiveOptions;
use crate::cli::Cli;
use crate::walk::DEFAULT_MAX_DEPTH;

pub const RELEASE_ENV: &str = "CLASS_ARCHIVE_RELEASE";
pub const MAX_DEPTH_ENV: &str = "CLASS_ARCHIVE_MAX_DEPTH";

pub fn resolve_release(cli: &Cli) -> Result<Option<u32>> {
    if let Some(r) = cli.release {
        return Ok(Some(r));
    }

    match env::var(RELEASE_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            let release = raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("{RELEASE_ENV} is not a release number: {raw}"))?;
            Ok(Some(release))
        }
        _ => Ok(None),
    }
}

pub fn resolve_max_depth(cli: &Cli) -> Result<usize> {
    if let Some(d) = cli.max_depth {
        return Ok(d);
    }

    match env::var(MAX_DEPTH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{MAX_DEPTH_ENV} is not a number: {raw}")),
        _ => Ok(DEFAULT_MAX_DEPTH),
    }
}

pub fn resolve_options(cli: &Cli, base_package: Option<&str>) -> Result<ArchiveOptions> {
    Ok(ArchiveOptions {
        base_package: base_package
            .map(|p| p.trim().trim_matches('.').to_string())
            .unwrap_or_default(),
        target_release: resolve_release(cli)?,
        max_depth: resolve_max_depth(cli)?,
    })
}
