//! Storage seam.
//!
//! Everything the actions need from persistence goes through a
//! [`Transaction`]. Queries that touch owned records take the requesting
//! [`Owner`] and never see rows belonging to anyone else.

use async_trait::async_trait;

use crate::{
    error::Error,
    permissions::Owner,
    schema::{EntityFields, EntityKind, Id, NamedEntity, NewUser, Recipe, RecipeFields, RecipeFilter, User},
};

#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a unit of work. Dropping it without calling
    /// [`Transaction::commit`] discards every write made through it.
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error>;

    /// Succeeds once the backing database accepts queries.
    async fn ping(&self) -> Result<(), Error>;
}

#[async_trait]
pub trait Transaction: Send {
    /// Returns `None` when the email is already taken.
    async fn insert_user(&mut self, user: &NewUser) -> Result<Option<User>, Error>;
    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, Error>;
    async fn user_by_id(&mut self, id: Id) -> Result<Option<User>, Error>;
    /// Writes every column of `user`. Fails with a conflict on a taken email.
    async fn update_user(&mut self, user: &User) -> Result<(), Error>;

    /// Exact match on the owner and every field in `fields`.
    async fn find_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error>;
    /// Returns `None` when an entity with the same `(owner, name)` exists.
    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error>;
    async fn get_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
    ) -> Result<Option<NamedEntity>, Error>;
    /// Ordered by name, descending.
    async fn list_entities(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error>;
    /// Fails with a conflict when the new name is taken.
    async fn update_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error>;
    async fn delete_entity(&mut self, kind: EntityKind, owner: Owner, id: Id)
        -> Result<bool, Error>;

    async fn insert_recipe(&mut self, owner: Owner, fields: &RecipeFields) -> Result<Recipe, Error>;
    async fn get_recipe(&mut self, owner: Owner, id: Id) -> Result<Option<Recipe>, Error>;
    /// Ordered by id, newest first.
    async fn list_recipes(
        &mut self,
        owner: Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, Error>;
    /// Writes the scalar columns of `recipe`. Owner and id are match keys only.
    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), Error>;
    async fn delete_recipe(&mut self, owner: Owner, id: Id) -> Result<bool, Error>;

    /// Adding an existing member is a no-op.
    async fn add_to_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
        entity_id: Id,
    ) -> Result<(), Error>;
    async fn clear_association(&mut self, kind: EntityKind, recipe_id: Id) -> Result<(), Error>;
    /// Ordered by entity id.
    async fn list_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
    ) -> Result<Vec<NamedEntity>, Error>;

    async fn commit(&mut self) -> Result<(), Error>;
}
