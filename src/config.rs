use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Deployed site URL, used to absolutize every link in the feeds
    pub site: Option<String>,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub feed: FeedConfig,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content/articles")
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

/// Feed-level metadata shared by the RSS and Atom views.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub author: Author,
}

fn default_title() -> String {
    "George's Articles".to_string()
}

fn default_description() -> String {
    "Various articles by George Song".to_string()
}

fn default_language() -> String {
    "en-us".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            language: default_language(),
            author: Author::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub link: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "George Song".to_string(),
            email: "george@gsong.dev".to_string(),
            link: "https://gsong.dev".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
