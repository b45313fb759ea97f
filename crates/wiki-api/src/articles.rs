use axum::http::StatusCode;
use tracing::info;
use wiki_db::articles::{delete_article, insert_article, update_article};
use wiki_types::Article;

use crate::{Context, Error, HandlerResult, csrf, pages};

/// Article index.
pub fn root(cx: &mut Context) -> HandlerResult {
    let articles = cx.state.db.articles()?;
    let html = pages::index(cx.current_name(), &articles);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

pub fn show(cx: &mut Context) -> HandlerResult {
    let id = parse_id(cx.param("id").unwrap_or(""))?;
    let article = cx.state.db.article(id)?;

    let csrf = if cx.logged_in() {
        Some(csrf::field(cx)?)
    } else {
        None
    };
    let html = pages::article(cx.current_name(), csrf.as_deref(), &article);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

pub fn new_form(cx: &mut Context) -> HandlerResult {
    let csrf = csrf::field(cx)?;
    let html = pages::article_form(cx.current_name(), &csrf, None);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

pub fn edit(cx: &mut Context) -> HandlerResult {
    let id = parse_id(cx.param("id").unwrap_or(""))?;
    let article = cx.state.db.article(id)?;
    let csrf = csrf::field(cx)?;
    let html = pages::article_form(cx.current_name(), &csrf, Some(&article));
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

/// Create when `id` is empty, otherwise update in place. Either way the
/// client lands on the article page.
pub fn save(cx: &mut Context) -> HandlerResult {
    let title = cx.required("title")?;
    let body = cx.form_value("body").to_string();
    let raw_id = cx.form_value("id").trim().to_string();

    let id = if raw_id.is_empty() {
        let id = cx.state.db.run_in_transaction(|tx| {
            let id = insert_article(tx, &title, &body)?;
            tx.commit()?;
            Ok(id)
        })?;
        info!("Article {} created", id);
        id
    } else {
        let id = parse_id(&raw_id)?;
        let article = Article {
            id,
            title,
            body,
            ..Default::default()
        };
        let changed = cx.state.db.run_in_transaction(|tx| {
            let changed = update_article(tx, &article)?;
            tx.commit()?;
            Ok(changed)
        })?;
        if changed > 0 {
            info!("Article {} updated", id);
        }
        id
    };

    cx.response.redirect(&format!("/article/{}", id))
}

/// Deleting an id that does not exist is not an error.
pub fn delete(cx: &mut Context) -> HandlerResult {
    let raw_id = cx.form_value("id").trim().to_string();
    if raw_id.is_empty() {
        return Err(Error::bad_request("id required but not specified"));
    }
    let id = parse_id(&raw_id)?;

    let removed = cx.state.db.run_in_transaction(|tx| {
        let removed = delete_article(tx, id)?;
        tx.commit()?;
        Ok(removed)
    })?;
    if removed > 0 {
        info!("Article {} deleted", id);
    }

    cx.response.redirect("/")
}

fn parse_id(raw: &str) -> Result<i64, Error> {
    raw.parse()
        .map_err(|_| Error::bad_request(format!("invalid article id {:?}", raw)))
}
