//! Server-rendered pages. Every user-supplied string goes through [`escape`];
//! `csrf` arguments are the pre-rendered hidden field from [`crate::csrf::field`].

use std::fmt::Write;

use wiki_types::Article;

const SITE_NAME: &str = "wiki";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn layout(title: &str, user: Option<&str>, content: &str) -> String {
    let nav = match user {
        Some(name) => format!(
            r#"<span>{}</span> <a href="/new">New</a> <a href="/logout">Logout</a>"#,
            escape(name)
        ),
        None => r#"<a href="/login">Login</a> <a href="/signup">Sign up</a>"#.to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title><link rel="stylesheet" href="/static/style.css"></head>
<body>
<header><a href="/">{site}</a> <nav>{nav}</nav></header>
<main>
{content}
</main>
</body>
</html>
"#,
        title = escape(title),
        site = SITE_NAME,
    )
}

pub fn index(user: Option<&str>, articles: &[Article]) -> String {
    let mut content = String::from("<h1>Articles</h1>\n<ul>\n");
    for article in articles {
        let _ = writeln!(
            content,
            r#"<li><a href="/article/{}">{}</a></li>"#,
            article.id,
            escape(&article.title)
        );
    }
    content.push_str("</ul>");
    layout(&format!("Articles - {SITE_NAME}"), user, &content)
}

/// One article. `csrf` is present only for logged-in viewers, who get the
/// edit link and delete button.
pub fn article(user: Option<&str>, csrf: Option<&str>, article: &Article) -> String {
    let mut content = format!(
        "<article>\n<h1>{}</h1>\n<div class=\"body\">{}</div>\n",
        escape(&article.title),
        escape(&article.body)
    );
    if let Some(updated) = article.updated {
        let _ = writeln!(content, "<p class=\"updated\">Updated {}</p>", updated.format("%Y-%m-%d %H:%M"));
    }
    content.push_str("</article>\n");
    if let Some(csrf) = csrf {
        let _ = write!(
            content,
            r#"<a href="/article/{id}/edit">Edit</a>
<form method="post" action="/delete">{csrf}<input type="hidden" name="id" value="{id}"><button type="submit">Delete</button></form>"#,
            id = article.id,
        );
    }
    layout(&format!("{} - {SITE_NAME}", article.title), user, &content)
}

/// Create form when `article` is `None`, edit form otherwise.
pub fn article_form(user: Option<&str>, csrf: &str, article: Option<&Article>) -> String {
    let (heading, id, title, body) = match article {
        Some(a) => ("Edit", a.id.to_string(), a.title.as_str(), a.body.as_str()),
        None => ("New", String::new(), "", ""),
    };
    let content = format!(
        r#"<h1>{heading}</h1>
<form method="post" action="/save">{csrf}
<input type="hidden" name="id" value="{id}">
<p><input type="text" name="title" value="{title}"></p>
<p><textarea name="body">{body}</textarea></p>
<p><button type="submit">Save</button></p>
</form>"#,
        title = escape(title),
        body = escape(body),
    );
    layout(&format!("{heading}: {SITE_NAME}"), user, &content)
}

pub fn signup(user: Option<&str>, csrf: &str) -> String {
    let content = format!(
        r#"<h1>Sign up</h1>
<form method="post" action="/signup">{csrf}
<p><input type="text" name="name" placeholder="name"></p>
<p><input type="email" name="email" placeholder="email"></p>
<p><input type="password" name="password" placeholder="password"></p>
<p><button type="submit">Sign up</button></p>
</form>"#
    );
    layout("Sign up", user, &content)
}

pub fn login(user: Option<&str>, csrf: &str, flashes: &[String]) -> String {
    let mut content = String::from("<h1>Login</h1>\n");
    for flash in flashes {
        let _ = writeln!(content, r#"<p class="flash">{}</p>"#, escape(flash));
    }
    let _ = write!(
        content,
        r#"<form method="post" action="/login">{csrf}
<p><input type="email" name="email" placeholder="email"></p>
<p><input type="password" name="password" placeholder="password"></p>
<p><button type="submit">Login</button></p>
</form>"#
    );
    layout("Login", user, &content)
}

pub fn logout(user: Option<&str>, csrf: &str) -> String {
    let content = format!(
        r#"<h1>Logout</h1>
<form method="post" action="/logout">{csrf}<button type="submit">Logout</button></form>"#
    );
    layout("Logout", user, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn article_titles_are_escaped_in_index() {
        let articles = vec![Article {
            id: 3,
            title: "<b>bold</b>".into(),
            ..Default::default()
        }];
        let html = index(None, &articles);
        assert!(html.contains(r#"<a href="/article/3">&lt;b&gt;bold&lt;/b&gt;</a>"#));
        assert!(html.contains(r#"href="/login""#));
    }

    #[test]
    fn anonymous_viewer_gets_no_edit_controls() {
        let a = Article {
            id: 1,
            title: "t".into(),
            ..Default::default()
        };
        assert!(!article(None, None, &a).contains("/delete"));
        assert!(article(Some("alice"), Some("<input>"), &a).contains("/delete"));
    }

    #[test]
    fn login_page_shows_flashes() {
        let html = login(None, "", &["Login failed".to_string()]);
        assert!(html.contains(r#"<p class="flash">Login failed</p>"#));
    }
}
