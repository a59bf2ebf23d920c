//! elxbridge parameter-file editing
//!
//! elastix and transformix are configured through plain-text parameter files
//! made of `(Key value ...)` directives and `//` comments. This crate edits
//! such text in place without owning its semantics.
//!
//! # Overview
//!
//! - [`directive`] - tokenizer that locates directives and their spans
//! - [`edit`] - `replace`, `remove`, `get_line`, `get_value`
//! - [`presets`] - default `rigid` and `deformable` parameter files
//! - [`chain`] - point-metric injection and transform-chain rewriting
//!
//! # Example
//!
//! ```
//! use elxbridge_params::{get_value, presets, replace};
//!
//! let mut text = presets::rigid();
//! replace(&mut text, "MaximumNumberOfIterations", "500");
//! assert_eq!(
//!     get_value(&text, "MaximumNumberOfIterations"),
//!     Some(vec!["500".to_string()])
//! );
//! ```

pub mod chain;
pub mod directive;
pub mod edit;
pub mod presets;

pub use chain::{inject_point_metric, transform_parameters_path, ChainRewrite};
pub use directive::{Directive, DirectiveState};
pub use edit::{get_line, get_value, quoted, remove, replace};
pub use presets::Preset;
