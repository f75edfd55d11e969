//! `{name}` placeholder substitution.
//!
//! `{{` and `}}` produce literal braces. Every placeholder must be supplied;
//! an unknown name or an unbalanced brace is an error rather than silent output.

use super::RenderError;

pub fn substitute(template_name: &str, template: &str, fields: &[(&str, &str)]) -> Result<String, RenderError> {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(pos) = rest.find(['{', '}']) {
    out.push_str(&rest[..pos]);
    let tail = &rest[pos..];
    let offset = template.len() - tail.len();

    if let Some(after) = tail.strip_prefix("{{") {
      out.push('{');
      rest = after;
      continue;
    }
    if let Some(after) = tail.strip_prefix("}}") {
      out.push('}');
      rest = after;
      continue;
    }
    if tail.starts_with('}') {
      return Err(RenderError::Malformed {
        template: template_name.to_string(),
        offset,
        reason: "single '}' outside a placeholder",
      });
    }

    let Some(close) = tail.find('}') else {
      return Err(RenderError::Malformed {
        template: template_name.to_string(),
        offset,
        reason: "unclosed '{'",
      });
    };
    let name = &tail[1..close];
    let value = fields
      .iter()
      .find(|(field, _)| *field == name)
      .map(|(_, value)| *value)
      .ok_or_else(|| RenderError::UnknownPlaceholder {
        template: template_name.to_string(),
        name: name.to_string(),
      })?;

    out.push_str(value);
    rest = &tail[close + 1..];
  }

  out.push_str(rest);
  Ok(out)
}
