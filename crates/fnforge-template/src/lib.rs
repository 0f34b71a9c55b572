//! Template provisioning for fnforge.
//!
//! Builds need `./template/<language>/` on disk. [`TemplateProvisioner`]
//! fetches the template bundle once when the directory is missing and
//! leaves an existing directory alone.

pub mod error;
pub mod fetcher;
pub mod provision;

pub use error::{FetchError, ProvisionError};
pub use fetcher::{FetchSummary, HttpFetcher, TemplateFetcher};
pub use provision::{Provisioned, TemplateProvisioner};
