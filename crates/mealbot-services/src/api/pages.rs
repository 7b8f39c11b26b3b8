//! Minimal HTML pages for the browser side of login and registration.

use mealbot_types::Profile;

/// Escape text for an HTML body or a double-quoted attribute.
pub fn escape(text: &str) -> String {
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

/// Page shown when a login or registration step fails. `reason` is escaped.
pub fn error_page(reason: &str) -> String {
    format!(
        "<h2>❌ Authentication Error</h2><p>{}</p>",
        escape(reason)
    )
}

/// Shown after a login started from chat; the session itself arrives by push.
pub fn chat_login_success() -> String {
    "<h2>✅ Login สำเร็จ</h2><p>กลับไปที่ LINE Chat เพื่อใช้งานต่อได้เลย</p>".to_owned()
}

/// Registration form posting to `action`.
///
/// Carries `token` in a hidden field and shows the profile's current
/// display name and picture.
pub fn registration_form(action: &str, token: &str, profile: &Profile) -> String {
    let picture = profile
        .picture_url
        .as_deref()
        .map(|url| format!(r#"<img src="{}" width="96" alt="">"#, escape(url)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Register</title></head>
<body>
<h2>📝 ลงทะเบียนผู้ใช้</h2>
{picture}
<p>{name}</p>
<form method="post" action="{action}">
<input type="hidden" name="token" value="{token}">
<label>ชื่อ-นามสกุล <input name="full_name" required></label><br>
<label>รหัสนักศึกษา <input name="studentId" required></label><br>
<label>อีเมล <input name="email" type="email" required></label><br>
<button type="submit">ลงทะเบียน</button>
</form>
</body>
</html>"#,
        name = escape(&profile.display_name),
        action = escape(action),
        token = escape(token),
    )
}

/// Confirmation page after a successful registration.
pub fn registration_complete(full_name: &str) -> String {
    format!(
        "<h2>✅ Registration Complete</h2><p>สวัสดีคุณ {}! กลับไปที่ LINE Chat เพื่อใช้งานต่อได้เลย</p>",
        escape(full_name)
    )
}
