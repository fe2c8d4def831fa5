//! Article Feeds - RSS and Atom feeds for a Markdown/MDX article collection
//!
//! This crate loads articles with YAML front matter from a content directory,
//! renders them to feed-safe HTML with absolute links, and serves the result
//! as RSS 2.0 and Atom 1.0 documents.

pub mod config;
pub mod content;
pub mod feed;
pub mod render;
pub mod routes;
pub mod urls;
