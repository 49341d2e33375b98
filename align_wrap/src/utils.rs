use align_types::{CatalogConfig, ReferenceCatalog, Region};
use anyhow::{Context, Result};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use itertools::Itertools;
use std::path::Path;

/// Convert an io::error to a string and strip "(os error 4)" from the end.
fn io_error_to_string(err: &std::io::Error) -> String {
    let s = err.to_string();
    s.strip_suffix(&format!(" (os error {})", err.raw_os_error().unwrap_or(0)))
        .unwrap_or(&s)
        .to_string()
}

/// Print an error chain to stderr.
pub fn print_error_chain(err: &anyhow::Error) {
    let error_chain = err.chain().join("\n\tCaused by: ");
    if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
        let io_err_str = io_error_to_string(io_err);
        match err.chain().len() {
            1 => eprintln!("ERROR: {io_err_str}"),
            2 => eprintln!("ERROR: {io_err_str}: {err}"),
            _ => eprintln!("ERROR: {error_chain}"),
        };
    } else {
        eprintln!("ERROR: {error_chain}");
    };
}

/// Build the reference catalog from `reference_config` if given, else from `defaults`.
pub fn load_catalog(
    reference_config: Option<&Path>,
    defaults: CatalogConfig,
) -> Result<ReferenceCatalog> {
    let config = match reference_config {
        Some(path) => CatalogConfig::from_toml_file(path)?,
        None => defaults,
    };
    ReferenceCatalog::new(config).context("invalid reference catalog")
}

/// Parse a `--region` value, for use with Clap's value_parser.
/// The known regions are listed in `--help` and anything else is rejected.
pub fn region_parser() -> impl TypedValueParser<Value = Region> {
    PossibleValuesParser::new(Region::ALL.map(Region::name)).try_map(|name| Region::parse(&name))
}
