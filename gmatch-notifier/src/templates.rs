// Mail templates
//
// HTML bodies render through tera; the plain-text bodies are built by hand
// and double as the fallback when rendering fails.

use tera::Tera;

pub const MATCHED_SUBJECT: &str = "[G-Match] A new roommate candidate has been matched!";
pub const EXPIRED_SUBJECT: &str = "[G-Match] Your matching request has expired";

pub const MATCHED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background-color: #ffffff; border-radius: 8px; padding: 32px;">
    <div style="text-align: center; padding-bottom: 24px; border-bottom: 1px solid #eee;">
      <div style="font-size: 28px; font-weight: bold; color: #6366f1;">G-Match</div>
    </div>
    <h1 style="font-size: 22px;">We found a roommate candidate for you!</h1>
    <p>Hello, <strong>{{ display_name }}</strong>!</p>
    <p>G-Match found a candidate who looks like a good fit.</p>
    {% if partner_name %}<p><strong>Partner nickname:</strong> {{ partner_name }}</p>{% endif %}
    <p><strong>Compatibility score:</strong> {{ score }}</p>
    <p>Please review their profile and decide within <strong>48 hours</strong>.</p>
    <div style="text-align: center;">
      <a href="{{ match_url }}" style="display: inline-block; background-color: #6366f1; color: #ffffff; text-decoration: none; padding: 14px 28px; border-radius: 8px; font-weight: 600;">View profile</a>
    </div>
    <p style="font-size: 14px; color: #6b7280;">Your candidate is reviewing your profile too. Contact details unlock once both of you accept.</p>
    <div style="text-align: center; padding-top: 24px; border-top: 1px solid #eee; font-size: 12px; color: #9ca3af;">
      <p>This mail was sent automatically by the G-Match service.</p>
    </div>
  </div>
</body>
</html>
"#;

pub const EXPIRED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background-color: #ffffff; border-radius: 8px; padding: 32px;">
    <div style="text-align: center; padding-bottom: 24px; border-bottom: 1px solid #eee;">
      <div style="font-size: 28px; font-weight: bold; color: #6366f1;">G-Match</div>
    </div>
    <h1 style="font-size: 22px;">Your matching request has expired</h1>
    <p>Hello, <strong>{{ display_name }}</strong>!</p>
    <p>We could not find a roommate for you within the waiting window, so your request was removed from the queue.</p>
    <p>You can register again at any time:</p>
    <div style="text-align: center;">
      <a href="{{ match_url }}" style="display: inline-block; background-color: #6366f1; color: #ffffff; text-decoration: none; padding: 14px 28px; border-radius: 8px; font-weight: 600;">Register again</a>
    </div>
    <div style="text-align: center; padding-top: 24px; border-top: 1px solid #eee; font-size: 12px; color: #9ca3af;">
      <p>This mail was sent automatically by the G-Match service.</p>
    </div>
  </div>
</body>
</html>
"#;

/// Register both HTML templates. Template syntax errors surface here, at
/// notifier construction, not per send.
pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("matched.html", MATCHED_HTML)?;
    tera.add_raw_template("expired.html", EXPIRED_HTML)?;
    Ok(tera)
}

pub fn matched_text(
    display_name: &str,
    partner_name: Option<&str>,
    score: f64,
    match_url: &str,
) -> String {
    let partner_line = partner_name
        .map(|name| format!("Partner nickname: {}\n", name))
        .unwrap_or_default();
    format!(
        "Hello, {}!\n\n\
         G-Match found a roommate candidate who looks like a good fit.\n\n\
         {}Compatibility score: {:.1}\n\n\
         Please review their profile and decide within 48 hours.\n\n\
         View profile: {}\n\n\
         Your candidate is reviewing your profile too.\n\
         Contact details unlock once both of you accept.\n\n\
         ---\n\
         This mail was sent automatically by the G-Match service.\n",
        display_name, partner_line, score, match_url
    )
}

pub fn expired_text(display_name: &str, match_url: &str) -> String {
    format!(
        "Hello, {}!\n\n\
         We could not find a roommate for you within the waiting window,\n\
         so your request was removed from the queue.\n\n\
         You can register again at any time: {}\n\n\
         ---\n\
         This mail was sent automatically by the G-Match service.\n",
        display_name, match_url
    )
}
