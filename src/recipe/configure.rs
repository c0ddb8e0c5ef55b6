// src/recipe/configure.rs

//! Configure-argument assembly
//!
//! A recipe declares its configure arguments as a table of `(arg, when)`
//! rows. Assembly walks the table in order and keeps every row whose
//! predicate holds for the build, substituting `%(...)s` placeholders. It is
//! a pure function of the [`BuildSpec`] and cannot fail.

use crate::recipe::condition::Condition;
use crate::recipe::spec::BuildSpec;
use serde::{Deserialize, Serialize};

/// One row of the configure table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureRule {
    /// Argument passed to `configure`, may contain placeholders
    pub arg: String,

    /// Rule applies only when this holds
    #[serde(default)]
    pub when: Condition,
}

impl ConfigureRule {
    pub fn new(arg: impl Into<String>, when: Condition) -> Self {
        Self {
            arg: arg.into(),
            when,
        }
    }
}

/// Ordered configure arguments for a build
pub fn configure_args(rules: &[ConfigureRule], spec: &BuildSpec) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.when.satisfied_by(spec))
        .map(|rule| spec.substitute(&rule.arg))
        .collect()
}
