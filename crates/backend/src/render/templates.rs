//! Built-in templates, used when no template directory overrides them.

pub const PAGE_FILE: &str = "chat_page.html";
pub const MESSAGE_FILE: &str = "chat_message.html";
pub const FORM_FILE: &str = "chat_message_form.html";

pub const PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; margin: 0 auto; max-width: 48rem; padding: 1rem; }}
    .channel-nav {{ display: flex; flex-wrap: wrap; gap: 0.5rem; margin-bottom: 1rem; }}
    .channel-link {{ padding: 0.2rem 0.6rem; border-radius: 0.3rem; text-decoration: none; }}
    .channel-link.active {{ background: #335; color: #fff; }}
    .message {{ border-bottom: 1px solid #ddd; padding: 0.5rem 0; }}
    .message.reply {{ margin-left: 1.5rem; }}
    .message-meta {{ color: #666; font-size: 0.85rem; }}
    .hashtags {{ color: #357; font-size: 0.85rem; }}
    .reply-to {{ color: #888; font-size: 0.8rem; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  {channel_nav}
  {message_form}
  <p class="message-count">{message_count} messages, generated {current_time} UTC</p>
  <div class="chat-messages">
{chat_messages}
  </div>
  <script>
    document.querySelectorAll('.expand-link').forEach(function (link) {{
      link.addEventListener('click', function (event) {{
        event.preventDefault();
        var full = document.getElementById('full-message-' + link.dataset.messageId);
        if (full) {{ full.style.display = full.style.display === 'none' ? 'block' : 'none'; }}
      }});
    }});
  </script>
</body>
</html>
"##;

pub const MESSAGE: &str = r##"    <div class="message {reply_class}" id="message-{message_id}">
      {reply_to}
      <div class="message-meta"><span class="author">{author}</span> <span class="timestamp">{timestamp}</span></div>
      <div class="message-content">{content}</div>
      {full_content}
      {expand_link}
      <div class="hashtags">{hashtags}</div>
    </div>
"##;

pub const FORM: &str = r##"<form class="message-form" method="post" action="/api/chat/submit">
    <input type="hidden" name="channel" value="{current_channel}">
    <input type="text" name="author" placeholder="Name" maxlength="50">
    <textarea name="content" placeholder="Message #{current_channel}" required></textarea>
    <input type="text" name="tags" placeholder="#tags">
    <button type="submit">Send</button>
  </form>"##;
