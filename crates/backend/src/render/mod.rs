//! HTML rendering of aggregated pages.

mod template;
mod templates;

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use timble_core::{Channel, Page, PageConfig, PageMessage};
use tracing::debug;

pub use self::template::substitute;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
  #[error("Failed to read template {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Template {template} references unknown placeholder '{name}'")]
  UnknownPlaceholder { template: String, name: String },
  #[error("Template {template} is malformed at byte {offset}: {reason}")]
  Malformed {
    template: String,
    offset: usize,
    reason: &'static str,
  },
}

/// Everything a renderer needs besides the page itself.
#[derive(Debug, Clone)]
pub struct RenderContext {
  /// Channels offered in the navigation, in display order.
  pub channels: Vec<Channel>,
  pub title: String,
  pub now: DateTime<Utc>,
}

pub trait PageRenderer: Send + Sync {
  fn render(&self, page: &Page, ctx: &RenderContext) -> Result<String, RenderError>;
}

/// Escape text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

/// Placeholder substitution over three HTML templates: page, message and form.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
  page: String,
  message: String,
  form: String,
}

impl Default for TemplateRenderer {
  fn default() -> Self {
    Self {
      page: templates::PAGE.to_string(),
      message: templates::MESSAGE.to_string(),
      form: templates::FORM.to_string(),
    }
  }
}

impl TemplateRenderer {
  pub fn from_config(config: &PageConfig) -> Result<Self, RenderError> {
    match &config.template_dir {
      Some(dir) => Self::load(dir),
      None => Ok(Self::default()),
    }
  }

  /// Load templates from `dir`. Files that do not exist fall back to the
  /// built-in template of the same role.
  pub fn load(dir: &Path) -> Result<Self, RenderError> {
    Ok(Self {
      page: load_template(dir, templates::PAGE_FILE, templates::PAGE)?,
      message: load_template(dir, templates::MESSAGE_FILE, templates::MESSAGE)?,
      form: load_template(dir, templates::FORM_FILE, templates::FORM)?,
    })
  }

  fn render_message(&self, idx: usize, msg: &PageMessage) -> Result<String, RenderError> {
    let expand_link = format!(
      r##"<a href="#" class="expand-link" data-message-id="{idx}">{}</a>"##,
      if msg.is_truncated { "Show More" } else { "" }
    );
    let full_content = if msg.is_truncated {
      format!(
        r#"<div class="full-message" id="full-message-{idx}" style="display: none;">{}</div>"#,
        escape_html(&msg.body)
      )
    } else {
      String::new()
    };
    let (reply_class, reply_to) = match &msg.reply_to {
      Some(parent) => (
        "reply",
        format!(r#"<div class="reply-to">Replying to: {}</div>"#, escape_html(parent)),
      ),
      None => ("", String::new()),
    };

    let author = escape_html(&msg.author);
    let content = escape_html(&msg.truncated_body);
    let timestamp = msg.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    let hashtags = escape_html(&msg.hashtags.join(" "));
    let message_id = escape_html(&msg.message_id);

    substitute(
      templates::MESSAGE_FILE,
      &self.message,
      &[
        ("author", author.as_str()),
        ("content", content.as_str()),
        ("full_content", full_content.as_str()),
        ("expand_link", expand_link.as_str()),
        ("timestamp", timestamp.as_str()),
        ("hashtags", hashtags.as_str()),
        ("message_id", message_id.as_str()),
        ("reply_class", reply_class),
        ("reply_to", reply_to.as_str()),
      ],
    )
  }
}

impl PageRenderer for TemplateRenderer {
  fn render(&self, page: &Page, ctx: &RenderContext) -> Result<String, RenderError> {
    let channel = page.channel.as_str();

    let mut chat_messages = String::new();
    for (idx, msg) in page.messages.iter().enumerate() {
      chat_messages.push_str(&self.render_message(idx, msg)?);
    }

    let channel_nav = channel_nav(&ctx.channels, &page.channel);
    let current_channel = escape_html(channel);
    let message_form = substitute(
      templates::FORM_FILE,
      &self.form,
      &[("current_channel", current_channel.as_str())],
    )?;
    let message_count = page.total_shown.to_string();
    let current_time = ctx.now.format("%Y-%m-%d %H:%M:%S").to_string();
    let title = escape_html(&format!("{} - #{}", ctx.title, channel));

    let html = substitute(
      templates::PAGE_FILE,
      &self.page,
      &[
        ("chat_messages", chat_messages.as_str()),
        ("message_count", message_count.as_str()),
        ("current_time", current_time.as_str()),
        ("title", title.as_str()),
        ("channel_nav", channel_nav.as_str()),
        ("message_form", message_form.as_str()),
      ],
    )?;

    debug!(channel, messages = page.total_shown, bytes = html.len(), "Rendered page");
    Ok(html)
  }
}

fn channel_nav(channels: &[Channel], current: &Channel) -> String {
  let mut nav = String::from(r#"<div class="channel-nav">"#);
  for channel in channels {
    let active = if channel == current { "active" } else { "" };
    let name = escape_html(channel.as_str());
    nav.push_str(&format!(
      r#"<a href="/chat/{name}.html" class="channel-link {active}">{name}</a>"#
    ));
  }
  nav.push_str("</div>");
  nav
}

fn load_template(dir: &Path, file: &str, fallback: &str) -> Result<String, RenderError> {
  let path = dir.join(file);
  if !path.exists() {
    debug!(path = %path.display(), "Template not found, using built-in");
    return Ok(fallback.to_string());
  }
  fs::read_to_string(&path).map_err(|source| RenderError::Read { path, source })
}
