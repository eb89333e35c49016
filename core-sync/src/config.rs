//! Sync configuration: entity kinds, pacing, ignore sets and edit texts.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Actor recorded in edit comments for full batch runs.
pub const DEFAULT_ACTOR: &str = "同步坤器人";

/// Actor recorded in edit comments for recent-changes polls.
pub const INCREMENTAL_ACTOR: &str = "定时同步";

/// Actor recorded when a single unit is synced on request.
pub const MANUAL_ACTOR: &str = "sync-bot";

/// Title prefix of media description pages.
pub const FILE_PREFIX: &str = "File:";

/// Title prefix of script modules.
pub const MODULE_PREFIX: &str = "Module:";

/// Kind of mirrored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Module,
    Media,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Page, EntityKind::Module, EntityKind::Media];

    /// MediaWiki namespace id listed for this kind.
    pub fn namespace(&self) -> i32 {
        match self {
            EntityKind::Page => 0,
            EntityKind::Module => 828,
            EntityKind::Media => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Module => "module",
            EntityKind::Media => "media",
        }
    }

    /// Kind implied by a title's namespace prefix.
    pub fn of_title(title: &str) -> Self {
        if title.starts_with(FILE_PREFIX) {
            EntityKind::Media
        } else if title.starts_with(MODULE_PREFIX) {
            EntityKind::Module
        } else {
            EntityKind::Page
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "page" | "pages" => Ok(EntityKind::Page),
            "module" | "modules" => Ok(EntityKind::Module),
            "media" | "file" | "image" | "images" => Ok(EntityKind::Media),
            _ => Err(SyncError::Config(format!("unknown entity kind: {}", s))),
        }
    }
}

/// Fixed sleeps between sequential units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After a non-failed outcome
    pub success: Duration,
    /// After a failed outcome (batch runs only)
    pub failure: Duration,
}

impl Pacing {
    pub const NONE: Pacing = Pacing {
        success: Duration::ZERO,
        failure: Duration::ZERO,
    };

    pub const fn from_millis(success: u64, failure: u64) -> Self {
        Self {
            success: Duration::from_millis(success),
            failure: Duration::from_millis(failure),
        }
    }
}

/// Per-kind settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSettings {
    pub pacing: Pacing,
    /// Titles never synced for this kind.
    pub ignored: HashSet<String>,
}

impl KindSettings {
    fn new(pacing: Pacing, ignored: &[&str]) -> Self {
        Self {
            pacing,
            ignored: ignored.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub pages: KindSettings,
    pub modules: KindSettings,
    pub media: KindSettings,

    /// Edit summary; `{actor}` and `{title}` are substituted.
    pub edit_comment_template: String,

    /// Description page text of uploaded files (license and attribution).
    pub media_page_text: String,

    /// Upload summary.
    pub media_comment: String,

    pub batch_actor: String,
    pub incremental_actor: String,
    pub manual_actor: String,

    /// Also rewrite `Dev:` in the destination title, not only in the text.
    pub remap_destination_titles: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pages: KindSettings::new(Pacing::from_millis(500, 1000), &["教程", "MediaWiki:Common.css"]),
            modules: KindSettings::new(Pacing::from_millis(1000, 2000), &[]),
            media: KindSettings::new(Pacing::from_millis(1000, 2000), &[]),
            edit_comment_template: "由：{actor} 触发更改，此时同步 {title}".to_string(),
            media_page_text: "== 授权协议 ==\n本文件转存自缺氧中文 Wiki，遵循源站点的授权协议。".to_string(),
            media_comment: "从源站点同步文件".to_string(),
            batch_actor: DEFAULT_ACTOR.to_string(),
            incremental_actor: INCREMENTAL_ACTOR.to_string(),
            manual_actor: MANUAL_ACTOR.to_string(),
            remap_destination_titles: false,
        }
    }
}

impl SyncConfig {
    /// Default settings with every delay set to zero.
    pub fn without_pacing() -> Self {
        let mut config = Self::default();
        for kind in EntityKind::ALL {
            config.settings_mut(kind).pacing = Pacing::NONE;
        }
        config
    }

    pub fn settings(&self, kind: EntityKind) -> &KindSettings {
        match kind {
            EntityKind::Page => &self.pages,
            EntityKind::Module => &self.modules,
            EntityKind::Media => &self.media,
        }
    }

    pub fn settings_mut(&mut self, kind: EntityKind) -> &mut KindSettings {
        match kind {
            EntityKind::Page => &mut self.pages,
            EntityKind::Module => &mut self.modules,
            EntityKind::Media => &mut self.media,
        }
    }

    pub fn pacing(&self, kind: EntityKind) -> Pacing {
        self.settings(kind).pacing
    }

    pub fn is_ignored(&self, kind: EntityKind, title: &str) -> bool {
        self.settings(kind).ignored.contains(title)
    }

    pub fn edit_comment(&self, title: &str, actor: &str) -> String {
        self.edit_comment_template
            .replace("{actor}", actor)
            .replace("{title}", title)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.edit_comment_template.contains("{actor}") {
            return Err(SyncError::Config(
                "edit_comment_template must contain {actor}".to_string(),
            ));
        }
        for (name, actor) in [
            ("batch_actor", &self.batch_actor),
            ("incremental_actor", &self.incremental_actor),
            ("manual_actor", &self.manual_actor),
        ] {
            if actor.trim().is_empty() {
                return Err(SyncError::Config(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pacing_and_ignore_sets() {
        let config = SyncConfig::default();
        assert_eq!(config.pacing(EntityKind::Page), Pacing::from_millis(500, 1000));
        assert_eq!(config.pacing(EntityKind::Module), Pacing::from_millis(1000, 2000));
        assert_eq!(config.pacing(EntityKind::Media), Pacing::from_millis(1000, 2000));

        assert!(config.is_ignored(EntityKind::Page, "教程"));
        assert!(config.is_ignored(EntityKind::Page, "MediaWiki:Common.css"));
        assert!(!config.is_ignored(EntityKind::Module, "教程"));
        assert!(config.settings(EntityKind::Module).ignored.is_empty());
        assert!(!config.remap_destination_titles);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_without_pacing_keeps_ignore_sets() {
        let config = SyncConfig::without_pacing();
        for kind in EntityKind::ALL {
            assert_eq!(config.pacing(kind), Pacing::NONE);
        }
        assert!(config.is_ignored(EntityKind::Page, "教程"));
    }

    #[test]
    fn test_edit_comment_carries_actor_and_title() {
        let config = SyncConfig::default();
        let comment = config.edit_comment("氧石", DEFAULT_ACTOR);
        assert!(comment.starts_with("由：同步坤器人 触发更改，此时同步"));
        assert!(comment.contains("氧石"));
    }

    #[test]
    fn test_kind_namespaces_and_parsing() {
        assert_eq!(EntityKind::Page.namespace(), 0);
        assert_eq!(EntityKind::Module.namespace(), 828);
        assert_eq!(EntityKind::Media.namespace(), 6);
        assert_eq!("Modules".parse::<EntityKind>().unwrap(), EntityKind::Module);
        assert!("talk".parse::<EntityKind>().is_err());
        assert_eq!(EntityKind::of_title("File:Logo.png"), EntityKind::Media);
        assert_eq!(EntityKind::of_title("Module:Util"), EntityKind::Module);
        assert_eq!(EntityKind::of_title("氧石"), EntityKind::Page);
    }

    #[test]
    fn test_validate_rejects_blank_actor() {
        let mut config = SyncConfig::default();
        config.incremental_actor = " ".into();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.edit_comment_template = "sync".into();
        assert!(config.validate().is_err());
    }
}
