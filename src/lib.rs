//! Validation annotation front end
//!
//! Parses compact field annotations such as `required,len:8:256` or
//! `[]email` and checks every rule against the type of the field it is
//! attached to, producing a validated record IR for a source emitter.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod registry;
pub mod selector;

// Re-export main types
pub use analyzer::{Analysis, Analyzer, Info, ValidatorRecord};
pub use config::{AnalyzerConfig, KeyConfig, KeySource};
pub use parser::{ParseError, TagNode, parse_tag};
pub use registry::{CustomSignature, RuleRegistry, RuleRegistryBuilder};

pub use error::*;
