mod common;

use common::{names, TestApp};
use recipe_api::schema::EntityKind;
use serde_json::json;
use warp::http::StatusCode;

fn list_url(kind: EntityKind) -> String {
    format!("/api/recipe/{}", kind.key())
}

fn detail_url(kind: EntityKind, id: i32) -> String {
    format!("/api/recipe/{}/{id}", kind.key())
}

#[tokio::test]
async fn auth_required() {
    let app = TestApp::new();

    for kind in EntityKind::ALL {
        let res = app.send("GET", &list_url(kind), None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn retrieve_ingredients_sorted_by_name_descending() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let kale = app.entity(EntityKind::Ingredient, &user, "Kale").await;
    let vanilla = app.entity(EntityKind::Ingredient, &user, "Vanilla").await;

    let res = app.get(&list_url(EntityKind::Ingredient), &token).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!([
            {"id": vanilla.id, "name": "Vanilla"},
            {"id": kale.id, "name": "Kale"},
        ])
    );
}

#[tokio::test]
async fn tags_limited_to_user() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let (other, _) = app.user("other@example.com").await;
    app.entity(EntityKind::Tag, &other, "Fruity").await;
    let comfort = app.entity(EntityKind::Tag, &user, "Comfort Food").await;

    let res = app.get(&list_url(EntityKind::Tag), &token).await;

    assert_eq!(res.body, json!([{"id": comfort.id, "name": "Comfort Food"}]));
}

#[tokio::test]
async fn update_ingredient() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let cilantro = app.entity(EntityKind::Ingredient, &user, "Cilantro").await;

    let res = app
        .patch(
            &detail_url(EntityKind::Ingredient, cilantro.id),
            &token,
            json!({"name": "Coriander"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"id": cilantro.id, "name": "Coriander"}));
    let stored = app.entities(EntityKind::Ingredient, &user).await;
    assert_eq!(stored[0].name, "Coriander");
    assert_eq!(stored[0].user_id, user.id);
}

#[tokio::test]
async fn rename_onto_existing_name_is_rejected() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let dinner = app.entity(EntityKind::Tag, &user, "Dinner").await;
    app.entity(EntityKind::Tag, &user, "Lunch").await;

    let res = app
        .put(&detail_url(EntityKind::Tag, dinner.id), &token, json!({"name": "Lunch"}))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(names(&app.get(&list_url(EntityKind::Tag), &token).await.body), ["Lunch", "Dinner"]);
}

#[tokio::test]
async fn update_requires_name() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let tag = app.entity(EntityKind::Tag, &user, "Dinner").await;

    let res = app
        .patch(&detail_url(EntityKind::Tag, tag.id), &token, json!({"name": "  "}))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_patch_leaves_entity_unchanged() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let tag = app.entity(EntityKind::Tag, &user, "Dinner").await;

    let patch = app.patch(&detail_url(EntityKind::Tag, tag.id), &token, json!({})).await;
    let put = app.put(&detail_url(EntityKind::Tag, tag.id), &token, json!({})).await;

    assert_eq!(patch.status, StatusCode::OK);
    assert_eq!(patch.body, json!({"id": tag.id, "name": "Dinner"}));
    assert_eq!(put.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.entities(EntityKind::Tag, &user).await, vec![tag]);
}

#[tokio::test]
async fn empty_patch_on_other_users_entity_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user("user@example.com").await;
    let (other, _) = app.user("other@example.com").await;
    let tag = app.entity(EntityKind::Tag, &other, "Fruity").await;

    let res = app.patch(&detail_url(EntityKind::Tag, tag.id), &token, json!({})).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_ingredient() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let lettuce = app.entity(EntityKind::Ingredient, &user, "Lettuce").await;
    let recipe = app.recipe(&user, "Salad").await;
    app.attach(EntityKind::Ingredient, &recipe, &lettuce).await;

    let res = app
        .delete(&detail_url(EntityKind::Ingredient, lettuce.id), &token)
        .await;

    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.entities(EntityKind::Ingredient, &user).await.is_empty());
    assert!(app.members(EntityKind::Ingredient, &recipe).await.is_empty());
    assert!(app.stored_recipe(&user, recipe.id).await.is_some());
}

#[tokio::test]
async fn other_users_entity_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user("user@example.com").await;
    let (other, _) = app.user("other@example.com").await;
    let tag = app.entity(EntityKind::Tag, &other, "Fruity").await;

    let patch = app
        .patch(&detail_url(EntityKind::Tag, tag.id), &token, json!({"name": "Mine"}))
        .await;
    let delete = app.delete(&detail_url(EntityKind::Tag, tag.id), &token).await;

    assert_eq!(patch.status, StatusCode::NOT_FOUND);
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(app.entities(EntityKind::Tag, &other).await, vec![tag]);
}

#[tokio::test]
async fn filter_assigned_only() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let apples = app.entity(EntityKind::Ingredient, &user, "Apples").await;
    app.entity(EntityKind::Ingredient, &user, "Turkey").await;
    let recipe = app.recipe(&user, "Apple Crumble").await;
    app.attach(EntityKind::Ingredient, &recipe, &apples).await;

    let res = app
        .get(&format!("{}?assigned_only=1", list_url(EntityKind::Ingredient)), &token)
        .await;

    assert_eq!(names(&res.body), ["Apples"]);
}

#[tokio::test]
async fn assigned_only_returns_unique_entities() {
    let app = TestApp::new();
    let (user, token) = app.user("user@example.com").await;
    let breakfast = app.entity(EntityKind::Tag, &user, "Breakfast").await;
    app.entity(EntityKind::Tag, &user, "Dinner").await;
    for title in ["Pancakes", "Porridge"] {
        let recipe = app.recipe(&user, title).await;
        app.attach(EntityKind::Tag, &recipe, &breakfast).await;
    }

    let res = app
        .get(&format!("{}?assigned_only=1", list_url(EntityKind::Tag)), &token)
        .await;

    assert_eq!(names(&res.body), ["Breakfast"]);
}
