use std::sync::Arc;

use poem::Route;
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    callbacks::CallbacksEndpoints, health::HealthEndpoints, messages::MessagesEndpoints,
    root::ApiState,
};

pub mod endpoints;
pub mod errors;
pub mod mappers;
pub mod requests;
pub mod responses;

pub fn routes(state: Arc<ApiState>, server_url: &str) -> Route {
    let api_service = OpenApiService::new(
        (
            HealthEndpoints,
            MessagesEndpoints::new(state.clone()),
            CallbacksEndpoints::new(state),
        ),
        "SMS Scheduler API",
        "0.1.0",
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();
    Route::new().nest("/api", api_service).nest("/", ui)
}
