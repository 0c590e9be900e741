use std::collections::BTreeMap;
use std::fmt::Write as _;

use bookclub_types::claim::UserClaim;

use crate::rest_api::Pager;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Common HTML shell around every page.
pub fn layout(title: &str, user: Option<&UserClaim>, body: &str) -> String {
    let account = match user {
        Some(user) => format!(
            r#"<a href="/users/profile">{}</a> <a href="/users/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/users/login">Log in</a> <a href="/users/register">Register</a>"#
            .to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} - Bookclub</title></head>
<body>
<nav><a href="/">Home</a> <a href="/books">Books</a> {account}</nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

pub fn error_page(message: &str) -> String {
    layout("Error", None, &format!("<p>{}</p>", escape(message)))
}

/// Error messages attached to one form field.
pub fn field_error_list(errors: &FieldErrors, field: &str) -> String {
    match errors.get(field) {
        Some(messages) => {
            let mut list = String::from(r#"<ul class="errors">"#);
            for message in messages {
                let _ = write!(list, "<li>{}</li>", escape(message));
            }
            list.push_str("</ul>");
            list
        }
        None => String::new(),
    }
}

/// Previous/next navigation under a paginated listing.
pub fn pager_nav(pager: &Pager, base_path: &str, query: Option<&str>) -> String {
    let link = |target_page: u32, label: &str| {
        let mut params = url::form_urlencoded::Serializer::new(String::new());
        if let Some(q) = query {
            params.append_pair("q", q);
        }
        params.append_pair("page", &target_page.to_string());
        params.append_pair("page_size", &pager.page_size.to_string());
        format!(
            r#"<a href="{base_path}?{query}">{label}</a>"#,
            query = params.finish(),
        )
    };
    let previous = if pager.has_previous() {
        link(pager.page - 1, "Previous")
    } else {
        String::new()
    };
    let next = if pager.has_next() {
        link(pager.page + 1, "Next")
    } else {
        String::new()
    };
    format!(
        r#"<nav class="pages">{previous} <span>Page {page} of {total_pages}</span> {next}</nav>"#,
        page = pager.page,
        total_pages = pager.total_pages,
    )
}

/// Star rating select, 1 to 5, with the given value preselected.
pub fn stars_select(selected: i32) -> String {
    let mut options = String::new();
    for stars in 1..=5 {
        let marker = if stars == selected { " selected" } else { "" };
        let _ = write!(options, r#"<option value="{stars}"{marker}>{stars}</option>"#);
    }
    format!(r#"<select name="stars_given">{options}</select>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Fish & Chips"</b>"#),
            "&lt;b&gt;&quot;Fish &amp; Chips&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_field_error_list() {
        let mut errors = FieldErrors::new();
        errors.insert(
            "stars_given".to_string(),
            vec!["greater than 5".to_string()],
        );
        assert!(field_error_list(&errors, "stars_given").contains("greater than 5"));
        assert!(field_error_list(&errors, "comment").is_empty());
    }
}
