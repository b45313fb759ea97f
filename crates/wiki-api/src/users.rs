use axum::http::StatusCode;
use tracing::{info, warn};
use wiki_db::users::insert_user;

use crate::{Context, HandlerResult, csrf, pages};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed: wrong email address or password.";
pub const EMAIL_TAKEN_MESSAGE: &str = "given email address is already used.";

pub fn signup_form(cx: &mut Context) -> HandlerResult {
    let csrf = csrf::field(cx)?;
    let html = pages::signup(cx.current_name(), &csrf);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

/// Register a new account. A taken email is answered in-band with 200 rather
/// than as an error status.
pub fn signup(cx: &mut Context) -> HandlerResult {
    let name = cx.required("name")?;
    let email = cx.required("email")?;
    let password = cx.required("password")?;

    if cx.state.db.user_exists(&email)? {
        cx.response.text(StatusCode::OK, EMAIL_TAKEN_MESSAGE);
        return Ok(());
    }

    let created = cx.state.db.run_in_transaction(|tx| {
        let id = insert_user(tx, &name, &email, &password)?;
        tx.commit()?;
        Ok(id)
    });
    match created {
        Ok(id) => {
            info!("User {} signed up as {}", id, email);
            cx.response.redirect("/")
        }
        // Lost a race with a concurrent signup for the same address.
        Err(e) if matches!(e.root(), wiki_db::Error::EmailTaken) => {
            cx.response.text(StatusCode::OK, EMAIL_TAKEN_MESSAGE);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn login_form(cx: &mut Context) -> HandlerResult {
    let flashes = cx.session.take_flashes();
    if !flashes.is_empty() {
        cx.save_session()?;
    }
    let csrf = csrf::field(cx)?;
    let html = pages::login(cx.current_name(), &csrf, &flashes);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

pub fn login(cx: &mut Context) -> HandlerResult {
    let email = cx.form_value("email").to_string();
    let password = cx.form_value("password").to_string();

    match cx.state.db.authenticate(&email, &password) {
        Ok(user) => {
            cx.session.reset();
            cx.session.set("id", user.id);
            cx.session.set("name", user.name.as_str());
            cx.session.set("email", user.email.as_str());
            cx.save_session()?;
            csrf::rotate(cx)?;
            info!("User {} logged in", user.id);
            cx.response.redirect("/")
        }
        Err(e @ (wiki_db::Error::NotFound | wiki_db::Error::PasswordMismatch)) => {
            warn!("Login failed for {}: {}", email, e);
            let was_logged_in = cx.logged_in();
            cx.session.reset();
            cx.session.add_flash(LOGIN_FAILED_MESSAGE);
            cx.save_session()?;
            if was_logged_in {
                csrf::rotate(cx)?;
            }
            cx.response.redirect("/login")
        }
        Err(e) => Err(e.into()),
    }
}

pub fn logout_form(cx: &mut Context) -> HandlerResult {
    let csrf = csrf::field(cx)?;
    let html = pages::logout(cx.current_name(), &csrf);
    cx.response.html(StatusCode::OK, html);
    Ok(())
}

pub fn logout(cx: &mut Context) -> HandlerResult {
    if let Some(id) = cx.session.get_i64("id") {
        info!("User {} logged out", id);
    }
    cx.session.clear();
    cx.save_session()?;
    csrf::rotate(cx)?;
    cx.response.redirect("/")
}
