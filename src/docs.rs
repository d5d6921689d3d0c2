use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::ServerBuilder;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::signup,
        routes::auth::token,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::get_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::users::me,
        routes::users::update_me,
        routes::categories::list_categories,
        routes::categories::create_category,
        routes::categories::delete_category,
        routes::genres::list_genres,
        routes::genres::create_genre,
        routes::genres::delete_genre,
        routes::titles::list_titles,
        routes::titles::create_title,
        routes::titles::get_title,
        routes::titles::update_title,
        routes::titles::delete_title,
        routes::reviews::list_reviews,
        routes::reviews::create_review,
        routes::reviews::get_review,
        routes::reviews::update_review,
        routes::reviews::delete_review,
        routes::comments::list_comments,
        routes::comments::create_comment,
        routes::comments::get_comment,
        routes::comments::update_comment,
        routes::comments::delete_comment,
    ),
    components(
        schemas(
            models::user::Role,
            models::user::User,
            models::user::SignupRequest,
            models::user::SignupResponse,
            models::user::TokenRequest,
            models::user::TokenResponse,
            models::user::AdminUserCreateRequest,
            models::user::AdminUserUpdateRequest,
            models::user::ProfileUpdateRequest,
            models::category::Category,
            models::category::CategoryCreateRequest,
            models::genre::Genre,
            models::genre::GenreCreateRequest,
            models::title::Title,
            models::title::TitleCreateRequest,
            models::title::TitleUpdateRequest,
            models::review::Review,
            models::review::ReviewCreateRequest,
            models::review::ReviewUpdateRequest,
            models::comment::Comment,
            models::comment::CommentCreateRequest,
            models::comment::CommentUpdateRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Signup and token endpoints"),
        (name = "Users", description = "User administration and own profile"),
        (name = "Categories", description = "Title categories"),
        (name = "Genres", description = "Title genres"),
        (name = "Titles", description = "Works under review"),
        (name = "Reviews", description = "Reviews on titles"),
        (name = "Comments", description = "Comments on reviews")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![ServerBuilder::new()
        .url(format!("http://localhost:{port}"))
        .build()]);
    doc
}

pub fn swagger_routes(port: u16) -> Router {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", build_openapi(port))
        .into()
}
