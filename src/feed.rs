use askama::Template;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::config::{Author, FeedConfig};
use crate::content::{ContentError, ContentStore};
use crate::render::render_mdx;
use crate::urls::create_url;

const GENERATOR: &str = "article-feeds";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("site URL is not configured")]
    MissingSite,

    #[error("invalid site URL: {0}")]
    InvalidSite(#[from] url::ParseError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("failed to render article: {0}")]
    Render(String),

    #[error("failed to serialize feed: {0}")]
    Serialize(#[from] askama::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub link: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub id: String,
    pub link: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub favicon: String,
    pub copyright: String,
    pub rss_link: String,
    pub atom_link: String,
    pub author: Author,
    pub updated: DateTime<Utc>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Template)]
#[template(path = "rss.xml")]
struct RssTemplate<'a> {
    feed: &'a Feed,
    generator: &'a str,
    author: String,
    last_build_date: String,
    items: Vec<RssItem<'a>>,
}

struct RssItem<'a> {
    entry: &'a FeedEntry,
    pub_date: String,
}

#[derive(Template)]
#[template(path = "atom.xml")]
struct AtomTemplate<'a> {
    feed: &'a Feed,
    generator: &'a str,
    updated: String,
    entries: Vec<AtomEntry<'a>>,
}

struct AtomEntry<'a> {
    entry: &'a FeedEntry,
    updated: String,
    published: String,
}

fn atom_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Feed {
    /// RSS 2.0 view of the feed.
    pub fn rss2(&self) -> Result<String, FeedError> {
        let template = RssTemplate {
            feed: self,
            generator: GENERATOR,
            author: format!("{} ({})", self.author.email, self.author.name),
            last_build_date: self.updated.to_rfc2822(),
            items: self
                .entries
                .iter()
                .map(|entry| RssItem {
                    entry,
                    pub_date: entry.updated.to_rfc2822(),
                })
                .collect(),
        };
        Ok(template.render()?)
    }

    /// Atom 1.0 view of the feed.
    pub fn atom1(&self) -> Result<String, FeedError> {
        let template = AtomTemplate {
            feed: self,
            generator: GENERATOR,
            updated: atom_date(&self.updated),
            entries: self
                .entries
                .iter()
                .map(|entry| AtomEntry {
                    entry,
                    updated: atom_date(&entry.updated),
                    published: atom_date(&entry.published),
                })
                .collect(),
        };
        Ok(template.render()?)
    }
}

/// Build the feed for every article in `store`, newest first.
///
/// `site` is the deployed site URL; every link in the feed is resolved
/// against it. Articles render one after another so entry order always
/// matches the sort.
pub async fn generate_feed(
    store: &ContentStore,
    site: Option<&str>,
    meta: &FeedConfig,
) -> Result<Feed, FeedError> {
    let site = Url::parse(site.ok_or(FeedError::MissingSite)?)?.to_string();
    let site_root = site.trim_end_matches('/');

    let mut articles = store.get_collection().await?;
    articles.sort_by(|a, b| b.published.cmp(&a.published));

    let mut entries = Vec::with_capacity(articles.len());
    for article in articles {
        let link = create_url(&format!("/articles/{}", article.id), &site)
            .unwrap_or_else(|| format!("{}/articles/{}", site_root, article.id));

        let description = render_mdx(article.description, site.clone()).await?;
        let content = render_mdx(article.body, site.clone()).await?;

        entries.push(FeedEntry {
            id: link.clone(),
            link,
            title: article.title,
            published: article.published,
            updated: article.updated.unwrap_or(article.published),
            description,
            content,
        });
    }

    let updated = entries
        .iter()
        .map(|entry| entry.updated)
        .max()
        .unwrap_or_else(Utc::now);

    let resolve = |path: &str| {
        create_url(path, &site).unwrap_or_else(|| format!("{}{}", site_root, path))
    };

    info!("Generated feed with {} entries", entries.len());

    Ok(Feed {
        id: site.clone(),
        link: site.clone(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        language: meta.language.clone(),
        favicon: resolve("/favicon.png"),
        copyright: format!("Copyright {} {}", Utc::now().year(), meta.author.name),
        rss_link: resolve("/rss.xml"),
        atom_link: resolve("/atom.xml"),
        author: meta.author.clone(),
        updated,
        entries,
    })
}
