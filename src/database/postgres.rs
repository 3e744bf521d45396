use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres};

use crate::{
    constants::SCHEMA,
    error::{Error, ErrorKind, QueryError},
    permissions::Owner,
    schema::{EntityFields, EntityKind, Id, NamedEntity, NewUser, Recipe, RecipeFields, RecipeFilter, User},
    store::{Store, Transaction},
};

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    /// Builds the pool without connecting; see `wait_for_db` for readiness.
    pub fn connect(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(database_url)
            .map_err(QueryError::from)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        let mut tr = self.pool.begin().await.map_err(QueryError::from)?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tr)
                .await
                .map_err(QueryError::from)?;
        }

        tr.commit().await.map_err(QueryError::from)?;
        log::info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        let tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        Ok(Box::new(PgTransaction { inner: Some(tr) }))
    }

    async fn ping(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(())
    }
}

pub struct PgTransaction {
    inner: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, Error> {
        self.inner
            .as_deref_mut()
            .ok_or_else(|| ErrorKind::InternalServerError.new("Transaction already finished"))
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn insert_user(&mut self, user: &NewUser) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as(
            "
            INSERT INTO users (email, name, password, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            ON CONFLICT (email) DO NOTHING RETURNING *;
        ",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_optional(self.conn()?)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn user_by_id(&mut self, id: Id) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn update_user(&mut self, user: &User) -> Result<(), Error> {
        sqlx::query(
            "
            UPDATE users
            SET email = $2, name = $3, password = $4, is_active = $5, is_staff = $6, is_superuser = $7
            WHERE id = $1
        ",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .execute(self.conn()?)
        .await
        .map_err(QueryError::from)?;

        Ok(())
    }

    async fn find_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let sql = format!(
            "SELECT * FROM {} WHERE user_id = $1 AND name = $2",
            kind.table()
        );
        let row: Option<NamedEntity> = sqlx::query_as(&sql)
            .bind(owner.id())
            .bind(&fields.name)
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let sql = format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) ON CONFLICT (user_id, name) DO NOTHING RETURNING *",
            kind.table()
        );
        let row: Option<NamedEntity> = sqlx::query_as(&sql)
            .bind(owner.id())
            .bind(&fields.name)
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
    ) -> Result<Option<NamedEntity>, Error> {
        let sql = format!("SELECT * FROM {} WHERE id = $1 AND user_id = $2", kind.table());
        let row: Option<NamedEntity> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner.id())
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_entities(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<NamedEntity>, Error> {
        let sql = format!(
            "
            SELECT e.* FROM {table} e
            WHERE e.user_id = $1
              AND (NOT $2 OR EXISTS (SELECT 1 FROM {links} l WHERE l.{column} = e.id))
            ORDER BY e.name DESC
        ",
            table = kind.table(),
            links = kind.association_table(),
            column = kind.association_column(),
        );
        let rows: Vec<NamedEntity> = sqlx::query_as(&sql)
            .bind(owner.id())
            .bind(assigned_only)
            .fetch_all(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn update_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
        fields: &EntityFields,
    ) -> Result<Option<NamedEntity>, Error> {
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
            kind.table()
        );
        let row: Option<NamedEntity> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner.id())
            .bind(&fields.name)
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn delete_entity(
        &mut self,
        kind: EntityKind,
        owner: Owner,
        id: Id,
    ) -> Result<bool, Error> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", kind.table());
        let query = sqlx::query(&sql)
            .bind(id)
            .bind(owner.id())
            .execute(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(query.rows_affected() > 0)
    }

    async fn insert_recipe(&mut self, owner: Owner, fields: &RecipeFields) -> Result<Recipe, Error> {
        let row: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ",
        )
        .bind(owner.id())
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.time_minutes)
        .bind(fields.price)
        .bind(&fields.link)
        .fetch_one(self.conn()?)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_recipe(&mut self, owner: Owner, id: Id) -> Result<Option<Recipe>, Error> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .fetch_optional(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_recipes(
        &mut self,
        owner: Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, Error> {
        let rows: Vec<Recipe> = sqlx::query_as(
            "
            SELECT r.* FROM recipes r
            WHERE r.user_id = $1
              AND ($2::INTEGER[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
              AND ($3::INTEGER[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
            ORDER BY r.id DESC
        ",
        )
        .bind(owner.id())
        .bind(filter.tags.clone())
        .bind(filter.ingredients.clone())
        .fetch_all(self.conn()?)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), Error> {
        sqlx::query(
            "
            UPDATE recipes
            SET title = $3, description = $4, time_minutes = $5, price_cents = $6, link = $7, image = $8
            WHERE id = $1 AND user_id = $2
        ",
        )
        .bind(recipe.id)
        .bind(recipe.user_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.link)
        .bind(&recipe.image)
        .execute(self.conn()?)
        .await
        .map_err(QueryError::from)?;

        Ok(())
    }

    async fn delete_recipe(&mut self, owner: Owner, id: Id) -> Result<bool, Error> {
        let query = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .execute(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(query.rows_affected() > 0)
    }

    async fn add_to_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
        entity_id: Id,
    ) -> Result<(), Error> {
        let sql = format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.association_table(),
            kind.association_column()
        );
        sqlx::query(&sql)
            .bind(recipe_id)
            .bind(entity_id)
            .execute(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(())
    }

    async fn clear_association(&mut self, kind: EntityKind, recipe_id: Id) -> Result<(), Error> {
        let sql = format!("DELETE FROM {} WHERE recipe_id = $1", kind.association_table());
        sqlx::query(&sql)
            .bind(recipe_id)
            .execute(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(())
    }

    async fn list_association(
        &mut self,
        kind: EntityKind,
        recipe_id: Id,
    ) -> Result<Vec<NamedEntity>, Error> {
        let sql = format!(
            "
            SELECT e.* FROM {table} e
            INNER JOIN {links} l ON l.{column} = e.id
            WHERE l.recipe_id = $1
            ORDER BY e.id
        ",
            table = kind.table(),
            links = kind.association_table(),
            column = kind.association_column(),
        );
        let rows: Vec<NamedEntity> = sqlx::query_as(&sql)
            .bind(recipe_id)
            .fetch_all(self.conn()?)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn commit(&mut self) -> Result<(), Error> {
        match self.inner.take() {
            Some(tr) => tr
                .commit()
                .await
                .map_err(|_| QueryError::new("Could not commit transaction".to_owned()).into()),
            None => Err(ErrorKind::InternalServerError.new("Transaction already finished")),
        }
    }
}
