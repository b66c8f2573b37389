//! Command engine: turns parsed commands into replies.
//!
//! Every domain condition is converted to a plain-text reply here; the
//! dispatcher above never sees a fault for normal operating conditions.

use regex::Regex;
use tracing::{info, warn};

use crate::searchbot::args::{parse_configure_args, parse_search_args, ConfigureArgs};
use crate::searchbot::confirm::{Confirmation, ConfirmationGuard};
use crate::searchbot::error::SearchError;
use crate::searchbot::gateway::{Media, SearchBackend};
use crate::searchbot::normalize::split_tags;
use crate::searchbot::query::{
    build_tag_query, parse_distance, pick_index, SearchOptions, REVERSE_MATCH_LIMIT,
};
use crate::searchbot::store::{GroupConfig, GroupDefaults, GroupPatch, GroupStore};

const SEARCH_HELP: &str = "Usage: /search [tags|distance]

  Reply to an image: reverse search (default distance 0.25)
  Attach an image: reverse search for the attached image
  Plain text: tag search

Options:
  --tags             list this group's custom tags
  --status           show this group's search settings
  --pp <num>         results per page (default 50)
  --p <num>          page number (default 1)
  --sf <field>       sort field (default score)
  --sd <desc|asc>    sort direction (default desc)
  --i <index>        result index (default random)";

const CONFIGURE_HELP: &str = "Usage: /configure [options]  (admins only)

Options:
  --add <tags>       add custom tags
  --rm <tags>        remove custom tags
  --on               enable search in this group
  --off              disable search in this group
  --onglobal         enable global default tags
  --offglobal        disable global default tags";

const OFFGLOBAL_WARNING: &str = "Disabling global tags lets the bot return unfiltered results.\n\
    Proceed at your own risk: repeat the command within 60 seconds to confirm.";

/// Process-wide search settings the engine needs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Tags merged into every search for groups that opt in.
    pub default_tags: Vec<String>,
    /// Defaults applied when a group is first seen.
    pub group_defaults: GroupDefaults,
}

/// A reply to be delivered by the chat surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub media: Vec<Media>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), media: Vec::new() }
    }
}

/// The search engine, generic over the API backend so tests can stub it.
pub struct SearchEngine<B> {
    settings: EngineSettings,
    store: GroupStore,
    backend: B,
    confirm: ConfirmationGuard,
    markup: Regex,
}

impl<B: SearchBackend> SearchEngine<B> {
    pub fn new(settings: EngineSettings, store: GroupStore, backend: B) -> Self {
        Self {
            settings,
            store,
            backend,
            confirm: ConfirmationGuard::new(),
            markup: Regex::new(r"<[^>]+>").unwrap(),
        }
    }

    /// Handle a /search invocation.
    ///
    /// `image_url` switches to reverse-search mode; the free text then
    /// carries the optional distance parameter.
    pub async fn handle_search(&self, chat_id: i64, raw_args: &str, image_url: Option<&str>) -> Reply {
        let args = match parse_search_args(raw_args) {
            Ok(args) => args,
            Err(e) => return Reply::text(e.to_string()),
        };

        if args.is_empty() && image_url.is_none() {
            return Reply::text(SEARCH_HELP);
        }

        let group_id = chat_id.to_string();
        let config = match self.store.get_or_create(&group_id, self.settings.group_defaults) {
            Ok(config) => config,
            Err(e) => {
                warn!("Store failure for group {group_id}: {e}");
                return Reply::text(SearchError::Store(e).to_string());
            }
        };

        if args.show_status {
            return Reply::text(self.render_status(&config));
        }
        if args.show_tags {
            return Reply::text(format!("Group tags: {}", render_tags(&config.custom_tags)));
        }
        if !config.enabled {
            return Reply::text(
                "Search is not enabled in this group. Admins can turn it on with /configure --on.",
            );
        }

        let text = self.markup.replace_all(&args.text, "").trim().to_string();

        let result = match image_url {
            Some(url) => self.reverse_search(url, &text).await,
            None => self.tag_search(&config, &text, args.options).await,
        };

        result.unwrap_or_else(|e| Reply::text(e.to_string()))
    }

    async fn tag_search(
        &self,
        config: &GroupConfig,
        text: &str,
        options: SearchOptions,
    ) -> Result<Reply, SearchError> {
        let user_tags = split_tags(text);
        let query = build_tag_query(config, &self.settings.default_tags, &user_tags, options)?;

        info!("🔍 Tag search in {}: {}", config.group_id, query.expression());
        let images = self.backend.search_tags(&query).await?;

        let (index, out_of_range) =
            pick_index(query.options.index, images.len()).ok_or(SearchError::NoMatch)?;
        let selected = &images[index];

        let mut text = format!(
            "id: {} | score: {}\ntags: {}",
            selected.id,
            selected.score,
            query.expression()
        );
        if out_of_range {
            text.push_str(&format!(
                "\nNote: index {} is outside this page, picked a random result instead.",
                query.options.index
            ));
        }

        Ok(Reply { text, media: vec![selected.display_media()] })
    }

    async fn reverse_search(&self, image_url: &str, text: &str) -> Result<Reply, SearchError> {
        let distance = parse_distance(text)?;

        info!("🔍 Reverse search (distance {distance})");
        let images = self.backend.search_reverse(image_url, distance).await?;

        if images.len() > REVERSE_MATCH_LIMIT {
            return Err(SearchError::TooManyMatches(images.len()));
        }

        let mut text = format!("distance: {distance}");
        let mut media = Vec::with_capacity(images.len());
        for image in &images {
            text.push_str(&format!("\nid: {} | score: {}", image.id, image.score));
            media.push(image.display_media());
        }

        Ok(Reply { text, media })
    }

    /// Handle a /configure invocation. The caller has already verified the
    /// sender is a chat admin.
    pub async fn handle_configure(&self, chat_id: i64, user_id: i64, raw_args: &str) -> Reply {
        let args = match parse_configure_args(raw_args) {
            Ok(args) => args,
            Err(e) => return Reply::text(e.to_string()),
        };

        if args.is_empty() {
            return Reply::text(CONFIGURE_HELP);
        }
        if args.on && args.off {
            return Reply::text("Cannot enable and disable search at the same time.");
        }
        if args.onglobal && args.offglobal {
            return Reply::text("Cannot enable and disable global tags at the same time.");
        }

        match self.apply_configure(chat_id, user_id, &args) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Store failure for group {chat_id}: {e}");
                Reply::text(SearchError::Store(e).to_string())
            }
        }
    }

    fn apply_configure(
        &self,
        chat_id: i64,
        user_id: i64,
        args: &ConfigureArgs,
    ) -> Result<Reply, String> {
        let group_id = chat_id.to_string();
        let mut responses: Vec<String> = Vec::new();

        if args.on {
            self.update(&group_id, GroupPatch { enabled: Some(true), ..Default::default() })?;
            responses.push("Search is now enabled in this group.".to_string());
        } else if args.off {
            self.update(&group_id, GroupPatch { enabled: Some(false), ..Default::default() })?;
            responses.push("Search is now disabled in this group.".to_string());
        }

        if args.onglobal {
            self.update(&group_id, GroupPatch { use_global_tags: Some(true), ..Default::default() })?;
            responses.push("Global tags enabled.".to_string());
        } else if args.offglobal {
            match self.confirm.request(chat_id, user_id) {
                Confirmation::FirstRequest => {
                    info!("⚠️ offglobal pending confirmation in {group_id} by {user_id}");
                    return Ok(Reply::text(OFFGLOBAL_WARNING));
                }
                Confirmation::Confirmed => {
                    self.update(
                        &group_id,
                        GroupPatch { use_global_tags: Some(false), ..Default::default() },
                    )?;
                    responses.push("Global tags disabled.".to_string());
                }
            }
        }

        if args.add.is_some() || args.rm.is_some() {
            let config = self.store.get_or_create(&group_id, self.settings.group_defaults)?;
            let mut tags = config.custom_tags;

            if let Some(ref add) = args.add {
                for tag in split_tags(add) {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
            }
            if let Some(ref rm) = args.rm {
                let remove = split_tags(rm);
                tags.retain(|t| !remove.contains(t));
            }

            let updated =
                self.update(&group_id, GroupPatch { custom_tags: Some(tags), ..Default::default() })?;
            responses.push(format!(
                "Tags updated, group tags are now: {}",
                render_tags(&updated.custom_tags)
            ));
        }

        Ok(Reply::text(responses.join("\n")))
    }

    fn update(&self, group_id: &str, patch: GroupPatch) -> Result<GroupConfig, String> {
        self.store.update(group_id, patch, self.settings.group_defaults)
    }

    fn render_status(&self, config: &GroupConfig) -> String {
        format!(
            "Search settings for this group:\nEnabled: {}\nTags: {}\nGlobal tags: {}",
            if config.enabled { "yes" } else { "no" },
            render_tags(&config.custom_tags),
            if config.use_global_tags { "enabled" } else { "disabled" },
        )
    }
}

fn render_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(", ")
    }
}
