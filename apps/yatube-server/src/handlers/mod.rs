//! HTTP handlers and route configuration.

mod form_data;
mod health;
mod posts;
mod render;
mod users;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};
use yatube_shared::ErrorResponse;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::index))
        .route("/health/", web::get().to(health::health_check))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/follow/", web::get().to(posts::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::scope("/profile/{username}")
                .route("/", web::get().to(posts::profile))
                .route("/follow/", web::to(posts::profile_follow))
                .route("/unfollow/", web::to(posts::profile_unfollow)),
        )
        .service(
            web::scope("/posts/{post_id}")
                .route("/", web::get().to(posts::post_detail))
                .service(
                    web::resource("/edit/")
                        .route(web::get().to(posts::post_edit_form))
                        .route(web::post().to(posts::post_edit)),
                )
                .route("/comment/", web::post().to(posts::add_comment)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(users::signup_form))
                        .route(web::post().to(users::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(users::login_form))
                        .route(web::post().to(users::login)),
                )
                .route("/logout/", web::to(users::logout))
                .service(
                    web::resource("/password_change/")
                        .route(web::get().to(users::password_change_form))
                        .route(web::post().to(users::password_change)),
                )
                .route(
                    "/password_change/done/",
                    web::get().to(users::password_change_done),
                )
                .service(
                    web::resource("/password_reset/")
                        .route(web::get().to(users::password_reset_form))
                        .route(web::post().to(users::password_reset)),
                )
                .route(
                    "/password_reset/done/",
                    web::get().to(users::password_reset_done),
                )
                .service(
                    web::resource("/reset/{uid}/{token}/")
                        .route(web::get().to(users::password_reset_confirm_form))
                        .route(web::post().to(users::password_reset_confirm)),
                )
                .route("/reset/done/", web::get().to(users::password_reset_complete)),
        )
        .default_service(web::to(not_found));
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(
        ErrorResponse::not_found("The requested page does not exist").with_instance(req.path()),
    )
}

/// A single query-string value, decoded.
pub(crate) fn query_param(req: &HttpRequest, name: &str) -> Option<String> {
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Login page URL that returns to `next` afterwards. Slashes stay readable.
pub(crate) fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", encoded.replace("%2F", "/"))
}
