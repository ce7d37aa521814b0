use anyhow::Result;
use log::debug;
use std::fmt::{Display, Write};

use crate::catalog::{self, Metadap, Release};
use crate::runtime::Runtime;

use super::config::{Config, ConfigOverrides};
use super::services::Services;

/// Show catalog details of a dap
#[tracing::instrument(skip(runtime, overrides))]
pub async fn show<R: Runtime + Clone>(
    runtime: R,
    name: &str,
    version: Option<&str>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(&runtime, overrides)?;
    let services = Services::from_config(&runtime, &config)?;
    debug!("Showing {} from {}", name, config.api_url);

    let (metadap, release) =
        catalog::fetch_metadap_release(&services.catalog, name, version).await?;
    print!("{}", render_detail(&metadap, release.as_ref()));
    Ok(())
}

fn field<T: Display>(out: &mut String, key: &str, value: Option<&T>) {
    match value {
        Some(value) => {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        None => {
            let _ = writeln!(out, "{}: unknown", key);
        }
    }
}

/// Detail view of a metadap and, if it has one, a release.
pub fn render_detail(metadap: &Metadap, release: Option<&Release>) -> String {
    let title = match release {
        Some(release) => format!("{}-{}", metadap.package_name, release.version),
        None => metadap.package_name.clone(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    out.push('\n');

    match release {
        Some(release) => {
            if let Some(summary) = &release.summary {
                let _ = writeln!(out, "{}", summary);
            }
            if let Some(description) = release.description.as_ref().filter(|d| !d.is_empty()) {
                out.push('\n');
                let _ = writeln!(out, "{}", description);
            }
        }
        None => {
            let _ = writeln!(out, "{} has no versions", metadap.package_name);
            out.push('\n');
        }
    }

    field(&mut out, "active", metadap.active.as_ref());
    field(&mut out, "average_rank", metadap.average_rank.as_ref());
    field(&mut out, "rank_count", metadap.rank_count.as_ref());
    field(&mut out, "reports", metadap.reports.as_ref());

    // Release fields are only listed when the catalog filled them in.
    if let Some(release) = release {
        let optional: [(&str, Option<String>); 6] = [
            ("license", release.license.clone()),
            ("homepage", release.homepage.clone()),
            ("bugreports", release.bugreports.clone()),
            ("is_pre", release.is_pre.map(|b| b.to_string())),
            ("is_latest", release.is_latest.map(|b| b.to_string())),
            (
                "is_latest_stable",
                release.is_latest_stable.map(|b| b.to_string()),
            ),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                let _ = writeln!(out, "{}: {}", key, value);
            }
        }
    }

    out
}
