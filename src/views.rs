//! HTML assembly. Every dynamic value passes through [`escape`].

use axum::response::Html;

use crate::session::Flash;

/// Escapes text for element content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    htmlescape::encode_minimal(raw)
}

pub struct Nav {
    pub user_name: Option<String>,
    pub logout_form: Option<String>,
}

pub fn page(title: &str, nav: &Nav, flash: &Flash, body: &str) -> Html<String> {
    let mut out = String::with_capacity(body.len() + 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!(
        "<title>{} - Fitness Studio</title>\n</head>\n<body>\n",
        escape(title)
    ));
    out.push_str(&nav_bar(nav));
    if let Some(msg) = &flash.success {
        out.push_str(&format!(
            "<div class=\"alert alert-success\">{}</div>\n",
            escape(msg)
        ));
    }
    if let Some(msg) = &flash.error {
        out.push_str(&format!(
            "<div class=\"alert alert-danger\">{}</div>\n",
            escape(msg)
        ));
    }
    out.push_str("<main>\n");
    out.push_str(body);
    out.push_str("\n</main>\n</body>\n</html>\n");
    Html(out)
}

fn nav_bar(nav: &Nav) -> String {
    let mut links = String::from(
        "<nav><a href=\"/\">Home</a> <a href=\"/recipes\">Recipes</a> \
         <a href=\"/workouts\">Workouts</a> <a href=\"/pages/schedule\">Schedule</a> \
         <a href=\"/pages/about\">About</a> <a href=\"/pages/contact\">Contact</a> ",
    );
    match (&nav.user_name, &nav.logout_form) {
        (Some(name), Some(form)) => {
            links.push_str(&format!("<span>Hello, {}</span> {}", escape(name), form));
        }
        _ => links.push_str("<a href=\"/login\">Log in</a> <a href=\"/register\">Register</a>"),
    }
    links.push_str("</nav>\n");
    links
}

pub fn text_input(name: &str, label: &str, value: &str, extra: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\" {extra}>\n",
        escape(value)
    )
}

pub fn date_input(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input type=\"date\" id=\"{name}\" name=\"{name}\" value=\"{}\" required>\n",
        escape(value)
    )
}

pub fn textarea(name: &str, label: &str, value: &str, rows: u8) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <textarea id=\"{name}\" name=\"{name}\" rows=\"{rows}\">{}</textarea>\n",
        escape(value)
    )
}

pub fn number_input(name: &str, label: &str, value: i32) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input type=\"number\" id=\"{name}\" name=\"{name}\" value=\"{value}\" min=\"0\">\n"
    )
}

/// A one-button POST form, used for delete and logout.
pub fn post_button(action: &str, label: &str, csrf_input: &str) -> String {
    format!(
        "<form method=\"POST\" action=\"{}\" class=\"inline\">{}<button type=\"submit\">{}</button></form>",
        escape(action),
        csrf_input,
        escape(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_script_tags() {
        let escaped = escape(r#"<script>alert("xss")</script>"#);
        assert!(!escaped.contains("<script>"));
        assert!(escaped.contains("&lt;script&gt;"));
    }

    #[test]
    fn escapes_quotes_for_attributes() {
        let html = text_input("title", "Title", r#"" onfocus="evil()"#, "");
        assert!(!html.contains(r#"value="" onfocus"#));
        assert!(html.contains("&quot;"));
    }

    #[test]
    fn page_renders_flash_escaped() {
        let nav = Nav {
            user_name: None,
            logout_form: None,
        };
        let flash = Flash {
            success: Some("<b>done</b>".into()),
            error: None,
        };
        let Html(out) = page("Recipes", &nav, &flash, "<p>body</p>");
        assert!(out.contains("&lt;b&gt;done&lt;/b&gt;"));
        assert!(out.contains("<p>body</p>"));
        assert!(out.contains("Log in"));
    }
}
