use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/birds", sighting_routes(config))
        .nest(&config.public_prefix(), upload_routes())
}

fn sighting_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::sighting::list_sightings,
            handlers::sighting::create_sighting
        ))
        .routes(routes!(
            handlers::sighting::get_sighting,
            handlers::sighting::update_sighting,
            handlers::sighting::delete_sighting
        ))
        .layer(handlers::sighting::sighting_body_limit(
            config.storage.max_blob_size,
        ))
}

fn upload_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::uploads::get_upload))
}
