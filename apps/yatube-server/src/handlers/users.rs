//! Account pages under `/auth/`: signup, login/logout, password change and
//! the emailed password reset.

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use yatube_core::FormErrors;
use yatube_core::domain::{NewUser, User};
use yatube_core::error::RepoError;
use yatube_core::forms::{
    FormData, LoginForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm, SignupForm,
    USERNAME_TAKEN, WRONG_OLD_PASSWORD,
};
use yatube_core::ports::EmailMessage;
use yatube_shared::dto::FormDto;

use super::form_data::read_form;
use super::query_param;
use super::render::{form_dto_without, redirect, render};
use crate::middleware::auth::{Identity, SESSION_COOKIE};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const PASSWORD_FIELDS: [&str; 6] = [
    "password",
    "password1",
    "password2",
    "old_password",
    "new_password1",
    "new_password2",
];

#[derive(Serialize)]
struct FormContext {
    form: FormDto,
}

#[derive(Serialize)]
struct LoginContext {
    form: FormDto,
    next: Option<String>,
}

#[derive(Serialize)]
struct ResetConfirmContext {
    validlink: bool,
    form: Option<FormDto>,
}

#[derive(Serialize)]
struct Empty {}

fn form(data: &FormData, errors: Option<FormErrors>) -> FormDto {
    form_dto_without(data, errors, &PASSWORD_FIELDS)
}

fn session_cookie(token: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn login_response(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = state
        .tokens
        .issue_session(user.id, &user.username, &user.password_hash)?;
    let mut response = redirect(location);
    response
        .add_cookie(&session_cookie(token, state.tokens.session_seconds()))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

fn username_taken() -> FormErrors {
    let mut errors = FormErrors::new();
    errors.add("username", USERNAME_TAKEN);
    errors
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

/// GET /auth/signup/
pub async fn signup_form() -> AppResult<HttpResponse> {
    render(
        "users/signup.html",
        FormContext {
            form: form(&FormData::new(), None),
        },
    )
}

/// POST /auth/signup/
pub async fn signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let rerender = |errors: FormErrors| {
        render(
            "users/signup.html",
            FormContext {
                form: form(&data, Some(errors)),
            },
        )
    };

    let cleaned = match SignupForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => return rerender(errors),
    };

    if state.users.find_by_username(&cleaned.username).await?.is_some() {
        return rerender(username_taken());
    }

    let password_hash = state.passwords.hash(&cleaned.password)?;
    let new_user = NewUser {
        username: cleaned.username,
        email: cleaned.email,
        first_name: cleaned.first_name,
        last_name: cleaned.last_name,
        password_hash,
    };

    match state.users.insert(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.username, "User signed up");
            Ok(redirect("/"))
        }
        Err(RepoError::Constraint(_)) => rerender(username_taken()),
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/login/
pub async fn login_form(req: HttpRequest) -> AppResult<HttpResponse> {
    render(
        "users/login.html",
        LoginContext {
            form: form(&FormData::new(), None),
            next: query_param(&req, "next"),
        },
    )
}

/// POST /auth/login/
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let next = data
        .field("next")
        .map(str::to_string)
        .or_else(|| query_param(&req, "next"));
    let rerender = |errors: FormErrors| {
        render(
            "users/login.html",
            LoginContext {
                form: form(&data, Some(errors)),
                next: next.clone(),
            },
        )
    };

    let cleaned = match LoginForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => return rerender(errors),
    };

    let user = match state.users.find_by_username(&cleaned.username).await? {
        Some(user) if state.passwords.verify(&cleaned.password, &user.password_hash)? => user,
        _ => {
            tracing::info!(username = %cleaned.username, "Failed login");
            return rerender(LoginForm::invalid_login());
        }
    };

    tracing::info!(user_id = user.id, "User logged in");
    login_response(&state, &user, safe_next(next.as_deref()).unwrap_or("/"))
}

/// GET|POST /auth/logout/
pub async fn logout() -> AppResult<HttpResponse> {
    let mut response = render("users/logged_out.html", Empty {})?;
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    response
        .add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

/// GET /auth/password_change/
pub async fn password_change_form(_identity: Identity) -> AppResult<HttpResponse> {
    render(
        "users/password_change_form.html",
        FormContext {
            form: form(&FormData::new(), None),
        },
    )
}

/// POST /auth/password_change/
pub async fn password_change(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let rerender = |errors: FormErrors| {
        render(
            "users/password_change_form.html",
            FormContext {
                form: form(&data, Some(errors)),
            },
        )
    };

    let cleaned = match PasswordChangeForm::clean(&data, identity.username()) {
        Ok(cleaned) => cleaned,
        Err(errors) => return rerender(errors),
    };

    let mut user = identity.user;
    if !state.passwords.verify(&cleaned.old_password, &user.password_hash)? {
        let mut errors = FormErrors::new();
        errors.add("old_password", WRONG_OLD_PASSWORD);
        return rerender(errors);
    }

    user.password_hash = state.passwords.hash(&cleaned.new_password)?;
    let user = state.users.update(user).await?;

    tracing::info!(user_id = user.id, "Password changed");
    login_response(&state, &user, "/auth/password_change/done/")
}

/// GET /auth/password_change/done/
pub async fn password_change_done(_identity: Identity) -> AppResult<HttpResponse> {
    render("users/password_change_done.html", Empty {})
}

/// GET /auth/password_reset/
pub async fn password_reset_form() -> AppResult<HttpResponse> {
    render(
        "users/password_reset_form.html",
        FormContext {
            form: form(&FormData::new(), None),
        },
    )
}

/// POST /auth/password_reset/
///
/// Redirects to the same page whether or not the address is known.
pub async fn password_reset(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let cleaned = match PasswordResetForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return render(
                "users/password_reset_form.html",
                FormContext {
                    form: form(&data, Some(errors)),
                },
            );
        }
    };

    if let Some(user) = state.users.find_by_email(&cleaned.email).await? {
        let token = state
            .tokens
            .issue_password_reset(user.id, &user.password_hash)?;
        let link = format!(
            "{}/auth/reset/{}/{}/",
            state.settings.site_url, user.id, token
        );

        state
            .mailer
            .send(EmailMessage {
                from: state.settings.default_from_email.clone(),
                to: vec![user.email.clone()],
                subject: "Password reset".to_string(),
                body: format!(
                    "You're receiving this email because you requested a password reset \
                     for your user account.\n\n\
                     Please go to the following page and choose a new password:\n\n\
                     {}\n\n\
                     Your username, in case you've forgotten: {}\n",
                    link, user.username
                ),
            })
            .await?;
        tracing::info!(user_id = user.id, "Password reset requested");
    }

    Ok(redirect("/auth/password_reset/done/"))
}

/// GET /auth/password_reset/done/
pub async fn password_reset_done() -> AppResult<HttpResponse> {
    render("users/password_reset_done.html", Empty {})
}

/// The user a reset link was issued for, when the link is still valid.
async fn reset_user(state: &AppState, uid: &str, token: &str) -> AppResult<Option<User>> {
    let Ok(user_id) = uid.parse::<i32>() else {
        return Ok(None);
    };
    let Some(user) = state.users.find_by_id(user_id).await? else {
        return Ok(None);
    };

    match state
        .tokens
        .validate_password_reset(token, user.id, &user.password_hash)
    {
        Ok(()) => Ok(Some(user)),
        Err(e) => {
            tracing::debug!(user_id, error = %e, "Invalid reset link");
            Ok(None)
        }
    }
}

fn reset_confirm_page(validlink: bool, form: Option<FormDto>) -> AppResult<HttpResponse> {
    render(
        "users/password_reset_confirm.html",
        ResetConfirmContext { validlink, form },
    )
}

/// GET /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm_form(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (uid, token) = path.into_inner();
    match reset_user(&state, &uid, &token).await? {
        Some(_) => reset_confirm_page(true, Some(form(&FormData::new(), None))),
        None => reset_confirm_page(false, None),
    }
}

/// POST /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let (uid, token) = path.into_inner();
    let Some(mut user) = reset_user(&state, &uid, &token).await? else {
        return reset_confirm_page(false, None);
    };

    let data = read_form(&req, body, state.settings.max_upload_bytes).await?;
    let cleaned = match SetPasswordForm::clean(&data, &user.username) {
        Ok(cleaned) => cleaned,
        Err(errors) => return reset_confirm_page(true, Some(form(&data, Some(errors)))),
    };

    user.password_hash = state.passwords.hash(&cleaned.new_password)?;
    let user = state.users.update(user).await?;

    tracing::info!(user_id = user.id, "Password reset completed");
    Ok(redirect("/auth/reset/done/"))
}

/// GET /auth/reset/done/
pub async fn password_reset_complete() -> AppResult<HttpResponse> {
    render("users/password_reset_complete.html", Empty {})
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/create/")), Some("/create/"));
        assert_eq!(safe_next(Some("//evil.com/")), None);
        assert_eq!(safe_next(Some("https://evil.com/")), None);
        assert_eq!(safe_next(None), None);
    }
}
