use super::reconcile::reconcile;
use crate::{
    error::{Error, ErrorKind},
    form::RecipeForm,
    permissions::{ensure_owned, Owner},
    schema::{EntityKind, Id, Recipe, RecipeDetail, RecipeFilter, RecipeSummary},
    store::{Store, Transaction},
};

async fn load_detail(tx: &mut dyn Transaction, recipe: &Recipe) -> Result<RecipeDetail, Error> {
    let tags = tx.list_association(EntityKind::Tag, recipe.id).await?;
    let ingredients = tx.list_association(EntityKind::Ingredient, recipe.id).await?;

    Ok(RecipeDetail::new(recipe, tags, ingredients))
}

pub async fn list_recipes(
    store: &dyn Store,
    owner: Owner,
    filter: &RecipeFilter,
) -> Result<Vec<RecipeSummary>, Error> {
    let mut tx = store.begin().await?;
    let rows = tx.list_recipes(owner, filter).await?;

    let mut recipes = Vec::with_capacity(rows.len());
    for recipe in rows {
        recipes.push(load_detail(&mut *tx, &recipe).await?.summary);
    }

    Ok(recipes)
}

pub async fn get_recipe(store: &dyn Store, owner: Owner, id: Id) -> Result<RecipeDetail, Error> {
    let mut tx = store.begin().await?;
    let recipe = ensure_owned(owner, tx.get_recipe(owner, id).await?, "recipe")?;

    load_detail(&mut *tx, &recipe).await
}

/// Inserts the scalar row, then attaches the nested tags and ingredients.
/// Nothing is stored unless every step succeeds.
pub async fn create_recipe(
    store: &dyn Store,
    owner: Owner,
    form: &RecipeForm,
) -> Result<RecipeDetail, Error> {
    let fields = form.to_fields()?;

    let mut tx = store.begin().await?;
    let recipe = tx.insert_recipe(owner, &fields).await?;
    for kind in EntityKind::ALL {
        let descriptors = form.entities(kind).unwrap_or_default();
        reconcile(&mut *tx, kind, owner, &recipe, descriptors).await?;
    }

    let detail = load_detail(&mut *tx, &recipe).await?;
    tx.commit().await?;

    log::info!("User {} created recipe {}", owner.id(), recipe.id);
    Ok(detail)
}

/// `full` is a PUT and requires every mandatory scalar. Either way, an
/// association listed in the payload is replaced and one left out is kept.
pub async fn update_recipe(
    store: &dyn Store,
    owner: Owner,
    id: Id,
    form: &RecipeForm,
    full: bool,
) -> Result<RecipeDetail, Error> {
    if full {
        form.require_complete()?;
    }

    let mut tx = store.begin().await?;
    let mut recipe = ensure_owned(owner, tx.get_recipe(owner, id).await?, "recipe")?;

    form.apply(&mut recipe);
    tx.update_recipe(&recipe).await?;

    for kind in EntityKind::ALL {
        if let Some(descriptors) = form.entities(kind) {
            tx.clear_association(kind, recipe.id).await?;
            reconcile(&mut *tx, kind, owner, &recipe, descriptors).await?;
        }
    }

    let detail = load_detail(&mut *tx, &recipe).await?;
    tx.commit().await?;

    log::trace!("User {} updated recipe {}", owner.id(), recipe.id);
    Ok(detail)
}

pub async fn delete_recipe(store: &dyn Store, owner: Owner, id: Id) -> Result<(), Error> {
    let mut tx = store.begin().await?;
    if !tx.delete_recipe(owner, id).await? {
        return Err(ErrorKind::NotFound.new("No recipe found with the specified id"));
    }
    tx.commit().await?;

    log::info!("User {} deleted recipe {id}", owner.id());
    Ok(())
}
