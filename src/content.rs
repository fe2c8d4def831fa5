//! The article collection.
//!
//! Articles live under a content directory as `*.mdx` or `*.md` files, each
//! starting with a YAML front matter block.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

const SOURCE_EXTENSIONS: &[&str] = &["mdx", "md"];

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no front matter", .0.display())]
    MissingFrontMatter(PathBuf),

    #[error("invalid front matter in {}: {source}", path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct FrontMatter {
    title: String,
    description: String,
    summary: String,
    #[serde(deserialize_with = "deserialize_date")]
    published: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    updated: Option<DateTime<Utc>>,
    slug: Option<String>,
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_date(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", value)))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_date(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", value))),
        None => Ok(None),
    }
}

/// Accepts RFC 3339 timestamps, naive date-times and bare dates (UTC midnight).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Split `---` delimited front matter from the body.
pub fn split_front_matter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = source.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Id of the article at `path` inside `root`: the relative path without its
/// extension, with a trailing `/index` dropped.
fn article_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    match segments.split_last() {
        Some((last, parent)) if last == "index" && !parent.is_empty() => parent.join("/"),
        _ => segments.join("/"),
    }
}

fn is_article_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every article under the content directory, ordered by path.
    pub async fn get_collection(&self) -> Result<Vec<Article>, ContentError> {
        match fs::metadata(&self.root).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Content directory {} not found, no articles", self.root.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ContentError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        }

        let paths = self.collect_sources().await?;
        let mut articles = Vec::with_capacity(paths.len());
        for path in paths {
            articles.push(self.load_article(&path).await?);
        }

        info!("Loaded {} articles from {}", articles.len(), self.root.display());
        Ok(articles)
    }

    async fn collect_sources(&self) -> Result<Vec<PathBuf>, ContentError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ContentError::Io { path, source }
        };

        let mut pending = vec![self.root.clone()];
        let mut sources = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(io_error(dir.as_path()))?;
            while let Some(entry) = entries.next_entry().await.map_err(io_error(dir.as_path()))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(io_error(path.as_path()))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if is_article_source(&path) {
                    sources.push(path);
                }
            }
        }

        sources.sort();
        Ok(sources)
    }

    async fn load_article(&self, path: &Path) -> Result<Article, ContentError> {
        let source = fs::read_to_string(path)
            .await
            .map_err(|source| ContentError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let (yaml, body) = split_front_matter(&source)
            .ok_or_else(|| ContentError::MissingFrontMatter(path.to_path_buf()))?;

        let front: FrontMatter =
            serde_yaml_ng::from_str(yaml).map_err(|source| ContentError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?;

        let id = front
            .slug
            .unwrap_or_else(|| article_id(&self.root, path));

        Ok(Article {
            id,
            title: front.title,
            description: front.description,
            summary: front.summary,
            published: front.published,
            updated: front.updated,
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write_article(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn front_matter(title: &str, published: &str) -> String {
        format!(
            "---\ntitle: {}\ndescription: About {}\nsummary: Short {}\npublished: {}\n---\n",
            title, title, title, published
        )
    }

    mod parse_date_tests {
        use super::*;

        #[test]
        fn test_bare_date_is_utc_midnight() {
            assert_eq!(
                parse_date("2024-01-01"),
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_rfc3339_with_offset() {
            assert_eq!(
                parse_date("2024-03-10T12:00:00-08:00"),
                Some(Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_naive_date_time() {
            assert_eq!(
                parse_date("2024-03-10 08:30:00"),
                Some(Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap())
            );
        }

        #[test]
        fn test_invalid_date() {
            assert_eq!(parse_date("yesterday"), None);
        }
    }

    mod front_matter_tests {
        use super::*;

        #[test]
        fn test_split_front_matter() {
            let (yaml, body) = split_front_matter("---\ntitle: Hi\n---\n# Body\n").unwrap();
            assert_eq!(yaml, "title: Hi\n");
            assert_eq!(body, "# Body\n");
        }

        #[test]
        fn test_split_front_matter_crlf() {
            let (yaml, body) = split_front_matter("---\r\ntitle: Hi\r\n---\r\nBody").unwrap();
            assert_eq!(yaml, "title: Hi\r\n");
            assert_eq!(body, "Body");
        }

        #[test]
        fn test_missing_front_matter() {
            assert!(split_front_matter("# Just markdown").is_none());
        }

        #[test]
        fn test_unterminated_front_matter() {
            assert!(split_front_matter("---\ntitle: Hi\n# Body").is_none());
        }
    }

    mod article_id_tests {
        use super::*;

        #[test]
        fn test_index_file_uses_directory() {
            let root = Path::new("/content");
            assert_eq!(
                article_id(root, Path::new("/content/reducer-patterns/index.mdx")),
                "reducer-patterns"
            );
        }

        #[test]
        fn test_plain_file() {
            let root = Path::new("/content");
            assert_eq!(article_id(root, Path::new("/content/hello.md")), "hello");
            assert_eq!(
                article_id(root, Path::new("/content/2024/recap.mdx")),
                "2024/recap"
            );
        }

        #[test]
        fn test_top_level_index() {
            let root = Path::new("/content");
            assert_eq!(article_id(root, Path::new("/content/index.mdx")), "index");
        }
    }

    mod collection_tests {
        use super::*;

        #[tokio::test]
        async fn test_loads_articles() {
            let dir = TempDir::new().unwrap();
            write_article(
                dir.path(),
                "datalist-autosuggest/index.mdx",
                &format!("{}# Hello\n", front_matter("Datalist", "2023-05-01")),
            );
            write_article(
                dir.path(),
                "reducer-patterns.md",
                "---\ntitle: Reducers\ndescription: d\nsummary: s\npublished: 2024-02-01\nupdated: 2024-02-15T10:00:00Z\n---\nBody\n",
            );
            // Non-article files are ignored
            write_article(dir.path(), "datalist-autosuggest/helpers/Search.js", "export {}");

            let store = ContentStore::new(dir.path());
            let articles = store.get_collection().await.unwrap();

            assert_eq!(articles.len(), 2);
            assert_eq!(articles[0].id, "datalist-autosuggest");
            assert_eq!(articles[0].title, "Datalist");
            assert_eq!(articles[0].description, "About Datalist");
            assert_eq!(articles[0].body, "# Hello\n");
            assert!(articles[0].updated.is_none());

            assert_eq!(articles[1].id, "reducer-patterns");
            assert_eq!(
                articles[1].updated,
                Some(Utc.with_ymd_and_hms(2024, 2, 15, 10, 0, 0).unwrap())
            );
        }

        #[tokio::test]
        async fn test_slug_overrides_path() {
            let dir = TempDir::new().unwrap();
            write_article(
                dir.path(),
                "drafts/post.mdx",
                "---\ntitle: T\ndescription: d\nsummary: s\npublished: 2024-01-01\nslug: custom-slug\n---\n",
            );

            let articles = ContentStore::new(dir.path()).get_collection().await.unwrap();
            assert_eq!(articles[0].id, "custom-slug");
        }

        #[tokio::test]
        async fn test_missing_directory_is_empty() {
            let store = ContentStore::new("/nonexistent/content/articles");
            let articles = store.get_collection().await.unwrap();
            assert!(articles.is_empty());
        }

        #[tokio::test]
        async fn test_unreadable_directory_is_error() {
            let dir = TempDir::new().unwrap();
            write_article(dir.path(), "plain.mdx", "not a directory");

            // A path through a regular file fails with something other than NotFound
            let store = ContentStore::new(dir.path().join("plain.mdx").join("articles"));
            let result = store.get_collection().await;
            assert!(matches!(result, Err(ContentError::Io { .. })));
        }

        #[tokio::test]
        async fn test_missing_front_matter_is_error() {
            let dir = TempDir::new().unwrap();
            write_article(dir.path(), "bare.mdx", "# No front matter\n");

            let result = ContentStore::new(dir.path()).get_collection().await;
            assert!(matches!(result, Err(ContentError::MissingFrontMatter(_))));
        }

        #[tokio::test]
        async fn test_missing_required_field_is_error() {
            let dir = TempDir::new().unwrap();
            write_article(
                dir.path(),
                "partial.mdx",
                "---\ntitle: T\npublished: 2024-01-01\n---\nBody",
            );

            let result = ContentStore::new(dir.path()).get_collection().await;
            assert!(matches!(result, Err(ContentError::FrontMatter { .. })));
        }

        #[tokio::test]
        async fn test_invalid_date_is_error() {
            let dir = TempDir::new().unwrap();
            write_article(
                dir.path(),
                "bad-date.mdx",
                "---\ntitle: T\ndescription: d\nsummary: s\npublished: someday\n---\n",
            );

            let result = ContentStore::new(dir.path()).get_collection().await;
            assert!(matches!(result, Err(ContentError::FrontMatter { .. })));
        }
    }
}
