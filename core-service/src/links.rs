//! Public links for cached titles.

use core_runtime::LinkConfig;
use serde::Serialize;

/// Page id shown in the usage example.
pub const EXAMPLE_ID: i64 = 88888888;

/// Short and direct links to one cached page on both sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryLinks {
    pub id: i64,
    pub title: String,
    /// `https://{domain}/gg/{id}`
    pub source_short: String,
    /// `https://{domain}/bw/{id}`
    pub mirror_short: String,
    pub source_url: String,
    pub mirror_url: String,
}

impl EntryLinks {
    pub fn new(links: &LinkConfig, id: i64, title: &str) -> Self {
        let encoded = urlencoding::encode(title);
        Self {
            id,
            title: title.to_string(),
            source_short: source_short_link(links, id),
            mirror_short: mirror_short_link(links, id),
            source_url: format!("https://{}/{}?variant=zh", links.source_site, encoded),
            mirror_url: format!("https://{}/{}", links.mirror_site, encoded),
        }
    }
}

fn source_short_link(links: &LinkConfig, id: i64) -> String {
    format!("https://{}/gg/{}", links.domain, id)
}

fn mirror_short_link(links: &LinkConfig, id: i64) -> String {
    format!("https://{}/bw/{}", links.domain, id)
}

/// Help text answered for a blank query.
pub fn usage_text(links: &LinkConfig) -> String {
    format!(
        "以下是使用说明：\n原站点: {}\n\n镜像站: {}",
        source_short_link(links, EXAMPLE_ID),
        mirror_short_link(links, EXAMPLE_ID)
    )
}
