use std::collections::HashMap;

use warp::{filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter};

use super::{json_reply, no_content, update_method, with_form};
use crate::{
    actions,
    error::TypeError,
    form::{parse_entity, Form, RecipeForm},
    middleware::{with_session, SessionData},
    schema::{EntityKind, Id, RecipeFilter},
    state::{with_state, State},
};

type Query = HashMap<String, String>;

/// Comma-separated ids. A missing or empty parameter applies no restriction.
fn parse_ids(query: &Query, key: &str) -> Result<Option<Vec<Id>>, TypeError> {
    let value = match query.get(key).map(|value| value.trim()) {
        None | Some("") => return Ok(None),
        Some(value) => value,
    };

    value
        .split(',')
        .map(|id| {
            id.trim().parse::<Id>().map_err(|_| {
                TypeError::new(&format!("{key}: Expected a comma-separated list of ids"))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_filter(query: &Query) -> Result<RecipeFilter, TypeError> {
    Ok(RecipeFilter {
        tags: parse_ids(query, EntityKind::Tag.key())?,
        ingredients: parse_ids(query, EntityKind::Ingredient.key())?,
    })
}

fn parse_assigned_only(query: &Query) -> Result<bool, TypeError> {
    match query.get("assigned_only").map(|value| value.trim()) {
        None | Some("") | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(_) => Err(TypeError::new("assigned_only: Expected 0 or 1")),
    }
}

async fn list_recipes(query: Query, session: SessionData, state: State) -> Result<Response, Rejection> {
    let filter = parse_filter(&query)?;
    let recipes = actions::list_recipes(state.store.as_ref(), session.owner(), &filter).await?;

    Ok(json_reply(&recipes, StatusCode::OK))
}

async fn create_recipe(session: SessionData, form: Form, state: State) -> Result<Response, Rejection> {
    let form = RecipeForm::parse(&form)?;
    let recipe = actions::create_recipe(state.store.as_ref(), session.owner(), &form).await?;

    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn get_recipe(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    let recipe = actions::get_recipe(state.store.as_ref(), session.owner(), id).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn update_recipe(
    id: Id,
    full: bool,
    session: SessionData,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    let form = RecipeForm::parse(&form)?;
    let recipe =
        actions::update_recipe(state.store.as_ref(), session.owner(), id, &form, full).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn delete_recipe(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    actions::delete_recipe(state.store.as_ref(), session.owner(), id).await?;

    Ok(no_content())
}

async fn list_entities(
    kind: EntityKind,
    query: Query,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let assigned_only = parse_assigned_only(&query)?;
    let entities =
        actions::list_entities(state.store.as_ref(), kind, session.owner(), assigned_only).await?;

    Ok(json_reply(&entities, StatusCode::OK))
}

/// A PATCH without `name` changes nothing and returns the entity as stored.
async fn update_entity(
    kind: EntityKind,
    id: Id,
    full: bool,
    session: SessionData,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    if !full && !form.contains("name") {
        let entity = actions::get_entity(state.store.as_ref(), kind, session.owner(), id).await?;
        return Ok(json_reply(&entity, StatusCode::OK));
    }

    let fields = parse_entity(&form)?;
    let entity =
        actions::update_entity(state.store.as_ref(), kind, session.owner(), id, &fields).await?;

    Ok(json_reply(&entity, StatusCode::OK))
}

async fn delete_entity(
    kind: EntityKind,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    actions::delete_entity(state.store.as_ref(), kind, session.owner(), id).await?;

    Ok(no_content())
}

/// `/api/recipe/tags` or `/api/recipe/ingredients` and their detail routes.
fn entity_routes(kind: EntityKind, state: State) -> BoxedFilter<(Response,)> {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.key()));

    let list = base
        .clone()
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(move |query: Query, session: SessionData, state: State| {
            list_entities(kind, query, session, state)
        });

    let detail = base.and(warp::path::param::<Id>()).and(warp::path::end());

    let update = detail
        .clone()
        .and(update_method())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(move |id: Id, full: bool, session: SessionData, form: Form, state: State| {
            update_entity(kind, id, full, session, form, state)
        });

    let delete = detail
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(move |id: Id, session: SessionData, state: State| {
            delete_entity(kind, id, session, state)
        });

    list.or(update).unify().or(delete).unify().boxed()
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "recipe" / "recipes")
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("api" / "recipe" / "recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_recipe);

    let detail = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_recipe);

    let update = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(update_method())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe);

    list.or(create)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(entity_routes(EntityKind::Tag, state.clone()))
        .unify()
        .or(entity_routes(EntityKind::Ingredient, state))
        .unify()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> Query {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn filter_reads_comma_separated_ids() {
        let filter = parse_filter(&query(&[("tags", "1, 2"), ("ingredients", "3")])).unwrap();

        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, Some(vec![3]));
        assert_eq!(parse_filter(&query(&[("tags", "")])).unwrap(), RecipeFilter::default());
    }

    #[test]
    fn filter_rejects_malformed_ids() {
        assert!(parse_filter(&query(&[("tags", "1,x")])).is_err());
        assert!(parse_filter(&query(&[("ingredients", "1,,2")])).is_err());
    }

    #[test]
    fn assigned_only_flag() {
        assert!(!parse_assigned_only(&query(&[])).unwrap());
        assert!(!parse_assigned_only(&query(&[("assigned_only", "0")])).unwrap());
        assert!(parse_assigned_only(&query(&[("assigned_only", "1")])).unwrap());
        assert!(parse_assigned_only(&query(&[("assigned_only", "yes")])).is_err());
    }
}
