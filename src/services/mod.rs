//! Services module - conversion and packaging logic.
//!
//! The services have no dependency on the command line layer; every input is an
//! explicit parameter and every step runs synchronously, one file at a time.
//!
//! # Components
//!
//! - [`extensions`]: turns a comma list into an [`ExcludedExtensionSet`]
//! - [`translator`]: [`ScriptTranslator`] rebuilds variables and the startup command
//!   of one batch launcher and produces a [`TranslatedConfig`](crate::models::TranslatedConfig)
//! - [`sweep`]: finds every script under a root, translates it and writes the profile;
//!   one broken script never stops the sweep
//! - [`assembler`]: recreates the package directory from the source tree, applying the
//!   directory, file name, extension and backup-override rules
//! - [`merger`]: copies the generated profiles into the package root
//! - [`archiver`]: zips the package with no wrapper folder
//! - [`pipeline`]: runs the steps above in order and maps fatal errors to exit codes
//!
//! # Usage Example
//!
//! ```ignore
//! use batpack::services::{ScriptTranslator, pipeline};
//!
//! let translator = ScriptTranslator::new(settings.translator.clone());
//! let summary = pipeline::run(&options, &translator)?;
//! summary.log_summary();
//! ```

pub mod archiver;
pub mod assembler;
pub mod extensions;
pub mod merger;
pub mod pipeline;
pub mod sweep;
pub mod translator;

pub use archiver::{ArchiveError, create_archive};
pub use assembler::{CopyDecision, PackageError, PackageReport, assemble_package, plan_directory};
pub use extensions::{ExcludedExtensionSet, normalize_extensions};
pub use merger::{MergeError, merge_profiles};
pub use pipeline::{PipelineError, PipelineOptions};
pub use sweep::{ScriptOutcome, SweepReport, convert_all};
pub use translator::{ScriptTranslator, TranslateError, display_name, output_file_name};
