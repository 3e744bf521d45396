//! HTTP surface. Every handler returns a JSON body or an [`Error`] rejection
//! that [`handle_rejection`] turns into one.

pub mod recipes;
pub mod users;

use std::convert::Infallible;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    constants::MAX_BODY_BYTES,
    error::{Error, ErrorKind},
    form::{Form, FormData},
    state::State,
};

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    error: String,
}

pub(crate) fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub(crate) fn no_content() -> Response {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
}

/// JSON object body. Anything else is rejected before a handler runs.
pub(crate) fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json::<FormData>())
        .map(Form::from_data)
}

/// `PUT` yields `true` (full update), `PATCH` yields `false`.
pub(crate) fn update_method() -> impl Filter<Extract = (bool,), Error = Rejection> + Clone {
    warp::put()
        .map(|| true)
        .or(warp::patch().map(|| false))
        .unify()
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(e) = err.find::<Error>() {
        (e.code, e.to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (400, format!("Malformed JSON body: {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (413, String::from("Request body too large"))
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (411, String::from("Content-Length header required"))
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (415, String::from("Expected a JSON body"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (400, String::from("Malformed query string"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (405, String::from("Method not allowed"))
    } else if err.is_not_found() {
        (404, ErrorKind::NotFound.to_string())
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (500, ErrorKind::InternalServerError.to_string())
    };

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(json_reply(&ErrorBody { code, error: message }, status))
}

/// Every route of the service with error recovery and request logging.
pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(recipes::routes(state))
        .unify()
        .recover(handle_rejection)
        .with(warp::log("recipe_api"))
}
