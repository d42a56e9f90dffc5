//! Repository defaults, loaded with Figment.
//!
//! Precedence (highest first):
//! 1. Environment variables prefixed `REPOXO_` (e.g. `REPOXO_DEFAULT_LIMIT`)
//! 2. A TOML file, when one is given or `repoxo.toml` exists
//! 3. Built-in defaults

use std::path::Path;

use figment::{
	providers::{
		Env,
		Format,
		Serialized,
		Toml,
	},
	Figment,
};
use repoxo_traits::SortDirection;
use serde::{
	Deserialize,
	Serialize,
};

use crate::error::{
	RepositoryError,
	Result,
};

pub const DEFAULT_CONFIG_FILE: &str = "repoxo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
	/// Page size, and the row cap for unpaginated finds.
	#[serde(default = "default_limit")]
	pub default_limit: u64,

	/// Direction of the implicit primary-key ordering.
	#[serde(default = "default_direction")]
	pub default_direction: SortDirection,

	/// Prefix for navigation links in page envelopes.
	#[serde(default)]
	pub link_base: String,

	#[serde(default = "default_page_param")]
	pub page_param: String,

	#[serde(default = "default_per_page_param")]
	pub per_page_param: String,
}

fn default_limit() -> u64 {
	10
}

fn default_direction() -> SortDirection {
	SortDirection::Desc
}

fn default_page_param() -> String {
	"page".to_string()
}

fn default_per_page_param() -> String {
	"per-page".to_string()
}

impl Default for RepositoryConfig {
	fn default() -> Self {
		Self {
			default_limit:     default_limit(),
			default_direction: default_direction(),
			link_base:         String::new(),
			page_param:        default_page_param(),
			per_page_param:    default_per_page_param(),
		}
	}
}

impl RepositoryConfig {
	pub fn load() -> Result<Self> {
		Self::load_from(DEFAULT_CONFIG_FILE)
	}

	/// A missing file is not an error; defaults and the environment still
	/// apply.
	pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		tracing::debug!(path = %path.display(), "loading repository configuration");

		let config: Self = Figment::new()
			.merge(Serialized::defaults(Self::default()))
			.merge(Toml::file(path))
			.merge(Env::prefixed("REPOXO_"))
			.extract()
			.map_err(|e| RepositoryError::Config(Box::new(e)))?;

		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.default_limit == 0 {
			return Err(RepositoryError::invalid_argument(
				"default_limit must be at least 1",
			));
		}
		if self.page_param.is_empty() || self.per_page_param.is_empty() {
			return Err(RepositoryError::invalid_argument(
				"page parameter names must not be empty",
			));
		}
		Ok(())
	}
}
