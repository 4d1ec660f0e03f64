//! Hotel booking dataset model.
//!
//! A [`Dataset`] is an immutable, deduplicated table of booking records loaded once from a
//! delimited file (see [`import_csv`]). It carries a content fingerprint so that downstream
//! caches can key on what a dataset contains rather than on where it lives in memory.

#![forbid(unsafe_code)]

mod dataset;
mod error;
mod import;
pub mod schema;

pub use crate::dataset::Dataset;
pub use crate::error::{DataLoadError, ModelError};
pub use crate::import::{import_csv, load_csv, CsvOptions, CsvTextEncoding};
