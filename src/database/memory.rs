use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{Error, ErrorKind},
    permissions::Owner,
    schema::{EntityFields, EntityKind, Id, NamedEntity, NewUser, Recipe, RecipeFields, RecipeFilter, User},
    store::{Store, Transaction},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: Id,
    users: BTreeMap<Id, User>,
    tags: BTreeMap<Id, NamedEntity>,
    ingredients: BTreeMap<Id, NamedEntity>,
    recipes: BTreeMap<Id, Recipe>,
    /// (recipe_id, entity_id)
    recipe_tags: BTreeSet<(Id, Id)>,
    recipe_ingredients: BTreeSet<(Id, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn entities(&self, kind: EntityKind) -> &BTreeMap<Id, NamedEntity> {
        match kind {
            EntityKind::Tag => &self.tags,
            EntityKind::Ingredient => &self.ingredients,
        }
    }

    fn entities_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<Id, NamedEntity> {
        match kind {
            EntityKind::Tag => &mut self.tags,
            EntityKind::Ingredient => &mut self.ingredients,
        }
    }

    fn links(&self, kind: EntityKind) -> &BTreeSet<(Id, Id)> {
        match kind {
            EntityKind::Tag => &self.recipe_tags,
            EntityKind::Ingredient => &self.recipe_ingredients,
        }
    }

    fn links_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<(Id, Id)> {
        match kind {
            EntityKind::Tag => &mut self.recipe_tags,
            EntityKind::Ingredient => &mut self.recipe_ingredients,
        }
    }

    fn find_entity(&self, kind: EntityKind, owner: Owner, fields: &EntityFields) -> Option<&NamedEntity> {
        self.entities(kind)
            .values()
            .find(|entity| entity.user_id == owner.id() && fields.matches(entity))
    }

    fn recipe_has_any(&self, kind: EntityKind, recipe_id: Id, ids: &[Id]) -> bool {
        self.links(kind)
            .iter()
            .any(|(recipe, entity)| *recipe == recipe_id && ids.contains(entity))
    }
}

/// Process-local store with the same semantics as the Postgres one.
///
/// A transaction holds the store lock for its whole lifetime and works on a
/// copy of the tables, so transactions are serialized and an uncommitted one
/// leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        let guard = self.tables.clone().lock_owned().await;
        let work = Tables::clone(&guard);

        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            work,
        }))
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<Tables>>,
    work: Tables,
}

impl MemoryTransaction {
    fn tables(&mut self) -> Result<&mut Tables, Error> {
        match self.guard {
            Some(_) => Ok(&mut self.work),
            None => Err(ErrorKind::InternalServerError.new("Transaction already finished")),
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn insert_user(&mut self, user: &NewUser) -> Result<Option<User>, Error> {
        let tables = self.tables()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Ok(None);
        }

        let row = User {
            id: tables.next_id(),
            email: user.email.to_owned(),
            name: user.name.to_owned(),
            password: user.password.to_owned(),
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        tables.users.insert(row.id, row.clone());

        Ok(Some(row))
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        let tables = self.tables()?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&mut self, id: Id) -> Result<Option<User>, Error> {
        let tables = self.tables()?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), Error> {
        let tables = self.tables()?;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(ErrorKind::Conflict.default());
        }
        if let Some(row) = tables.users.get_mut(&user.id) {
            *row = user.clone();
        }

        Ok(())
    }

    async fn find_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let tables = self.tables()?;
        Ok(tables.find_entity(kind, owner, fields).cloned())
    }

    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let tables = self.tables()?;
        if tables.find_entity(kind, owner, fields).is_some() {
            return Ok(None);
        }

        let row = NamedEntity {
            id: tables.next_id(),
            user_id: owner.id(),
            name: fields.name.to_owned(),
        };
        tables.entities_mut(kind).insert(row.id, row.clone());

        Ok(Some(row))
    }

    async fn get_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
    ) -> Result<Option<NamedEntity>, Error> {
        let tables = self.tables()?;
        Ok(tables
            .entities(kind)
            .get(&id)
            .filter(|entity| entity.user_id == owner.id())
            .cloned())
    }

    async fn list_entities(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error> {
        let tables = self.tables()?;
        let links = tables.links(kind);

        let mut rows: Vec<NamedEntity> = tables
            .entities(kind)
            .values()
            .filter(|entity| entity.user_id == owner.id())
            .filter(|entity| !assigned_only || links.iter().any(|(_, id)| *id == entity.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name));

        Ok(rows)
    }

    async fn update_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let tables = self.tables()?;
        if tables
            .find_entity(kind, owner, fields)
            .is_some_and(|existing| existing.id != id)
        {
            return Err(ErrorKind::Conflict.default());
        }

        Ok(tables
            .entities_mut(kind)
            .get_mut(&id)
            .filter(|entity| entity.user_id == owner.id())
            .map(|entity| {
                entity.name = fields.name.to_owned();
                entity.clone()
            }))
    }

    async fn delete_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
    ) -> Result<bool, Error> {
        let tables = self.tables()?;
        let owned = tables
            .entities(kind)
            .get(&id)
            .is_some_and(|entity| entity.user_id == owner.id());
        if !owned {
            return Ok(false);
        }

        tables.entities_mut(kind).remove(&id);
        tables.links_mut(kind).retain(|(_, entity)| *entity != id);

        Ok(true)
    }

    async fn insert_recipe(&mut self, owner: Owner, fields: &RecipeFields) -> Result<Recipe, Error> {
        let tables = self.tables()?;
        let row = Recipe {
            id: tables.next_id(),
            user_id: owner.id(),
            title: fields.title.to_owned(),
            description: fields.description.to_owned(),
            time_minutes: fields.time_minutes,
            price: fields.price,
            link: fields.link.to_owned(),
            image: None,
        };
        tables.recipes.insert(row.id, row.clone());

        Ok(row)
    }

    async fn get_recipe(&mut self, owner: Owner, id: Id) -> Result<Option<Recipe>, Error> {
        let tables = self.tables()?;
        Ok(tables
            .recipes
            .get(&id)
            .filter(|recipe| recipe.user_id == owner.id())
            .cloned())
    }

    async fn list_recipes(
        &mut self,
        owner: Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, Error> {
        let tables = self.tables()?;
        let matches = |recipe: &Recipe| {
            EntityKind::ALL.iter().all(|kind| match filter.ids(*kind) {
                Some(ids) => tables.recipe_has_any(*kind, recipe.id, ids),
                None => true,
            })
        };

        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|recipe| recipe.user_id == owner.id() && matches(recipe))
            .cloned()
            .collect())
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), Error> {
        let tables = self.tables()?;
        if let Some(row) = tables
            .recipes
            .get_mut(&recipe.id)
            .filter(|row| row.user_id == recipe.user_id)
        {
            *row = recipe.clone();
        }

        Ok(())
    }

    async fn delete_recipe(&mut self, owner: Owner, id: Id) -> Result<bool, Error> {
        let tables = self.tables()?;
        let owned = tables
            .recipes
            .get(&id)
            .is_some_and(|recipe| recipe.user_id == owner.id());
        if !owned {
            return Ok(false);
        }

        tables.recipes.remove(&id);
        for kind in EntityKind::ALL {
            tables.links_mut(kind).retain(|(recipe, _)| *recipe != id);
        }

        Ok(true)
    }

    async fn add_to_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
        entity_id: Id,
    ) -> Result<(), Error> {
        let tables = self.tables()?;
        if !tables.recipes.contains_key(&recipe_id) || !tables.entities(kind).contains_key(&entity_id) {
            return Err(ErrorKind::InternalServerError.new(&format!(
                "Foreign key violation linking recipe {recipe_id} to {kind} {entity_id}"
            )));
        }
        tables.links_mut(kind).insert((recipe_id, entity_id));

        Ok(())
    }

    async fn clear_association(&mut self, kind: EntityKind, recipe_id: Id) -> Result<(), Error> {
        let tables = self.tables()?;
        tables.links_mut(kind).retain(|(recipe, _)| *recipe != recipe_id);

        Ok(())
    }

    async fn list_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
    ) -> Result<Vec<NamedEntity>, Error> {
        let tables = self.tables()?;
        let entities = tables.entities(kind);

        Ok(tables
            .links(kind)
            .iter()
            .filter(|(recipe, _)| *recipe == recipe_id)
            .filter_map(|(_, id)| entities.get(id).cloned())
            .collect())
    }

    async fn commit(&mut self) -> Result<(), Error> {
        match self.guard.take() {
            Some(mut guard) => {
                *guard = std::mem::take(&mut self.work);
                Ok(())
            }
            None => Err(ErrorKind::InternalServerError.new("Transaction already finished")),
        }
    }
}
