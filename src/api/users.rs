use serde::Serialize;
use warp::{filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_reply, update_method, with_form};
use crate::{
    actions,
    form::{Credentials, Form, UserForm},
    middleware::{with_session, SessionData},
    schema::UserProfile,
    state::{with_state, State},
};

#[derive(Serialize)]
struct TokenReply {
    token: String,
}

async fn create_user(form: Form, state: State) -> Result<Response, Rejection> {
    let form = UserForm::parse(&form)?;
    let profile = actions::register_user(state.store.as_ref(), &form).await?;

    Ok(json_reply(&profile, StatusCode::CREATED))
}

async fn create_token(form: Form, state: State) -> Result<Response, Rejection> {
    let credentials = Credentials::parse(&form)?;
    let token = actions::login_user(state.store.as_ref(), &state.keys, &credentials).await?;

    Ok(json_reply(&TokenReply { token }, StatusCode::OK))
}

async fn get_me(session: SessionData) -> Result<Response, Rejection> {
    Ok(json_reply(&UserProfile::from(&session.user), StatusCode::OK))
}

async fn update_me(
    full: bool,
    session: SessionData,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    let form = UserForm::parse(&form)?;
    let profile = actions::update_user(state.store.as_ref(), &session.user, &form, full).await?;

    Ok(json_reply(&profile, StatusCode::OK))
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_user);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_token);

    let me = warp::path!("api" / "user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and_then(get_me);

    let update = warp::path!("api" / "user" / "me")
        .and(update_method())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state))
        .and_then(update_me);

    create
        .or(token)
        .unify()
        .or(me)
        .unify()
        .or(update)
        .unify()
        .boxed()
}
