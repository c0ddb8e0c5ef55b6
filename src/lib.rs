// src/lib.rs

//! m4-recipe
//!
//! Build recipe and post-install verification for the GNU M4 macro
//! processor, driven through the Autotools pipeline.
//!
//! # Architecture
//!
//! - Recipes are data: a TOML file declaring versions, patches, variants,
//!   dependencies, and configure rules
//! - Builds are values: every decision reads an explicit [`recipe::BuildSpec`]
//! - `when` predicates gate patches, dependencies, and configure arguments
//! - The Kitchen fetches, patches, configures, builds, installs, and verifies

pub mod compression;
mod error;
pub mod hash;
pub mod recipe;
pub mod verify;
pub mod version;

pub use error::{Error, Result};
pub use hash::{Checksum, HashAlgorithm, Hasher};
pub use recipe::{
    BuildSpec, Condition, Cook, CookResult, Kitchen, KitchenConfig, Recipe, SpecRequest,
};
pub use verify::{verify_install, VerifyContext, VerifyError, VerifyReport};
pub use version::{Version, VersionRange};
