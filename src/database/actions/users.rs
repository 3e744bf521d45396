use serde_json::Value;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::TokenKeys,
    },
    constants::AUTHENTICATION_FAILED,
    error::{Error, ErrorKind},
    form::{Credentials, Form, FormData, UserForm},
    schema::{NewUser, User, UserProfile},
    store::Store,
};

const EMAIL_TAKEN: &str = "email: user with this email already exists";

/// Lowercases the domain part. The local part is case-sensitive and kept.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

async fn insert_user(store: &dyn Store, user: NewUser) -> Result<User, Error> {
    let mut tx = store.begin().await?;
    let created = tx
        .insert_user(&user)
        .await?
        .ok_or_else(|| ErrorKind::InvalidRequest.new(EMAIL_TAKEN))?;
    tx.commit().await?;

    log::info!("Registered user {} <{}>", created.id, created.email);
    Ok(created)
}

pub async fn register_user(store: &dyn Store, form: &UserForm) -> Result<UserProfile, Error> {
    form.require_complete()?;

    let user = NewUser {
        email: normalize_email(form.email.as_deref().unwrap_or_default()),
        name: form.name.to_owned().unwrap_or_default(),
        password: hash_password(form.password.as_deref().unwrap_or_default())?,
        is_staff: false,
        is_superuser: false,
    };

    Ok(UserProfile::from(&insert_user(store, user).await?))
}

/// Creates an active staff account with every permission. Input goes through
/// the same validation as sign-up.
pub async fn create_superuser(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<User, Error> {
    let mut data = FormData::new();
    data.insert("email".to_string(), Value::from(email));
    data.insert("password".to_string(), Value::from(password));
    data.insert("name".to_string(), Value::from(name.unwrap_or(email)));

    let form = UserForm::parse(&Form::from_data(data))?;
    form.require_complete()?;

    let user = NewUser {
        email: normalize_email(form.email.as_deref().unwrap_or_default()),
        name: form.name.to_owned().unwrap_or_default(),
        password: hash_password(form.password.as_deref().unwrap_or_default())?,
        is_staff: true,
        is_superuser: true,
    };

    insert_user(store, user).await
}

/// Exchanges credentials for a session token. Every failure reads the same
/// so the response doesn't reveal which emails are registered.
pub async fn login_user(
    store: &dyn Store,
    keys: &TokenKeys,
    credentials: &Credentials,
) -> Result<String, Error> {
    let failed = || ErrorKind::InvalidRequest.new(AUTHENTICATION_FAILED);

    let mut tx = store.begin().await?;
    let user = tx
        .user_by_email(&normalize_email(&credentials.email))
        .await?
        .ok_or_else(failed)?;

    if !verify_password(&credentials.password, &user.password) || !user.is_active {
        return Err(failed());
    }

    keys.generate(&user)
}

/// Resolves a bearer token to the active user it was issued for.
pub async fn authenticate(store: &dyn Store, keys: &TokenKeys, token: &str) -> Result<User, Error> {
    let session = keys.verify(token)?;

    let mut tx = store.begin().await?;
    match tx.user_by_id(session.user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ErrorKind::Unauthorized.new("User inactive or deleted")),
    }
}

/// `full` is a PUT and requires every field.
pub async fn update_user(
    store: &dyn Store,
    user: &User,
    form: &UserForm,
    full: bool,
) -> Result<UserProfile, Error> {
    if full {
        form.require_complete()?;
    }

    let mut updated = user.clone();
    if let Some(email) = &form.email {
        updated.email = normalize_email(email);
    }
    if let Some(name) = &form.name {
        updated.name = name.to_owned();
    }
    if let Some(password) = &form.password {
        updated.password = hash_password(password)?;
    }

    let mut tx = store.begin().await?;
    tx.update_user(&updated).await.map_err(|e| match e.kind {
        ErrorKind::Conflict => ErrorKind::InvalidRequest.new(EMAIL_TAKEN),
        _ => e,
    })?;
    tx.commit().await?;

    Ok(UserProfile::from(&updated))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryStore;

    fn user_form(value: Value) -> UserForm {
        UserForm::parse(&Form::from_data(serde_json::from_value(value).unwrap())).unwrap()
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn keys() -> TokenKeys {
        TokenKeys::new(b"test-secret", 1).unwrap()
    }

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(normalize_email("Test@EXAMPLE.com"), "Test@example.com");
        assert_eq!(normalize_email("test@example.com"), "test@example.com");
    }

    #[tokio::test]
    async fn register_hashes_password() {
        let store = MemoryStore::new();
        let profile = register_user(
            &store,
            &user_form(json!({
                "email": "test@EXAMPLE.COM",
                "password": "testpass123",
                "name": "Test Name",
            })),
        )
        .await
        .unwrap();

        assert_eq!(profile.email, "test@example.com");
        let mut tx = store.begin().await.unwrap();
        let stored = tx.user_by_email("test@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "testpass123");
        assert!(verify_password("testpass123", &stored.password));
        assert!(!stored.is_staff);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let form = user_form(json!({
            "email": "test@example.com",
            "password": "testpass123",
            "name": "Test Name",
        }));
        register_user(&store, &form).await.unwrap();

        let error = register_user(&store, &form).await.unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[tokio::test]
    async fn superuser_has_all_flags() {
        let store = MemoryStore::new();
        let user = create_superuser(&store, "admin@example.com", "adminpass", None)
            .await
            .unwrap();

        assert!(user.is_active && user.is_staff && user.is_superuser);
        assert_eq!(user.name, "admin@example.com");
        assert!(create_superuser(&store, "not-an-email", "adminpass", None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let store = MemoryStore::new();
        let keys = keys();
        register_user(
            &store,
            &user_form(json!({
                "email": "test@example.com",
                "password": "testpass",
                "name": "Test",
            })),
        )
        .await
        .unwrap();

        let token = login_user(&store, &keys, &credentials("test@example.com", "testpass"))
            .await
            .unwrap();
        let user = authenticate(&store, &keys, &token).await.unwrap();
        assert_eq!(user.email, "test@example.com");

        let error = login_user(&store, &keys, &credentials("test@example.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), AUTHENTICATION_FAILED);

        let error = login_user(&store, &keys, &credentials("nobody@example.com", "testpass"))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), AUTHENTICATION_FAILED);
    }

    #[tokio::test]
    async fn inactive_users_cannot_authenticate() {
        let store = MemoryStore::new();
        let keys = keys();
        let user = create_superuser(&store, "admin@example.com", "adminpass", None)
            .await
            .unwrap();
        let token = keys.generate(&user).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.update_user(&User {
            is_active: false,
            ..user
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        let error = authenticate(&store, &keys, &token).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Unauthorized);
        let error = login_user(&store, &keys, &credentials("admin@example.com", "adminpass"))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn partial_update_rehashes_password() {
        let store = MemoryStore::new();
        let user = create_superuser(&store, "admin@example.com", "adminpass", Some("Admin"))
            .await
            .unwrap();

        let profile = update_user(
            &store,
            &user,
            &user_form(json!({"name": "Updated", "password": "newpassword123"})),
            false,
        )
        .await
        .unwrap();

        assert_eq!(profile.name, "Updated");
        let mut tx = store.begin().await.unwrap();
        let stored = tx.user_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("newpassword123", &stored.password));
    }
}
