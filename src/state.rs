use std::{convert::Infallible, sync::Arc};

use warp::Filter;

use crate::{jwt::TokenKeys, store::Store};

/// Handles shared by every request.
#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn Store>,
    pub keys: TokenKeys,
}

impl State {
    pub fn new(store: Arc<dyn Store>, keys: TokenKeys) -> Self {
        Self { store, keys }
    }
}

pub fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
