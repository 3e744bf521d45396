#![allow(dead_code)]

use std::sync::Arc;

use recipe_api::{
    api,
    jwt::TokenKeys,
    memory::MemoryStore,
    permissions::Owner,
    schema::{EntityFields, EntityKind, NamedEntity, NewUser, Price, Recipe, RecipeFields, User},
    state::State,
    store::Store,
};
use serde_json::Value;
use warp::http::StatusCode;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub keys: TokenKeys,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            keys: TokenKeys::new(b"integration-test-secret", 1).unwrap(),
        }
    }

    fn state(&self) -> State {
        State::new(self.store.clone(), self.keys.clone())
    }

    /// Inserts a user without going through password hashing and returns a
    /// token for it.
    pub async fn user(&self, email: &str) -> (User, String) {
        let mut tx = self.store.begin().await.unwrap();
        let user = tx
            .insert_user(&NewUser {
                email: email.to_string(),
                name: "Test Name".to_string(),
                password: "!".to_string(),
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        let token = self.keys.generate(&user).unwrap();
        (user, token)
    }

    pub async fn recipe(&self, user: &User, title: &str) -> Recipe {
        let mut tx = self.store.begin().await.unwrap();
        let recipe = tx
            .insert_recipe(
                Owner::from(user),
                &RecipeFields {
                    title: title.to_string(),
                    description: String::new(),
                    time_minutes: 10,
                    price: Price::parse("5.00").unwrap(),
                    link: String::new(),
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        recipe
    }

    pub async fn entity(&self, kind: EntityKind, user: &User, name: &str) -> NamedEntity {
        let mut tx = self.store.begin().await.unwrap();
        let entity = tx
            .insert_entity(kind, Owner::from(user), &EntityFields::new(name))
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();
        entity
    }

    pub async fn attach(&self, kind: EntityKind, recipe: &Recipe, entity: &NamedEntity) {
        let mut tx = self.store.begin().await.unwrap();
        tx.add_to_association(kind, recipe.id, entity.id).await.unwrap();
        tx.commit().await.unwrap();
    }

    pub async fn members(&self, kind: EntityKind, recipe: &Recipe) -> Vec<NamedEntity> {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_association(kind, recipe.id).await.unwrap()
    }

    pub async fn entities(&self, kind: EntityKind, user: &User) -> Vec<NamedEntity> {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_entities(kind, Owner::from(user), false).await.unwrap()
    }

    pub async fn stored_recipe(&self, user: &User, id: i32) -> Option<Recipe> {
        let mut tx = self.store.begin().await.unwrap();
        tx.get_recipe(Owner::from(user), id).await.unwrap()
    }

    pub async fn send(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = token {
            request = request.header("authorization", format!("Token {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let reply = request.reply(&api::routes(self.state())).await;
        let body = if reply.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(reply.body()).unwrap()
        };

        Response {
            status: reply.status(),
            body,
        }
    }

    pub async fn get(&self, path: &str, token: &str) -> Response {
        self.send("GET", path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Response {
        self.send("POST", path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Response {
        self.send("PATCH", path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Response {
        self.send("PUT", path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response {
        self.send("DELETE", path, Some(token), None).await
    }
}

pub fn names(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect()
}
