use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::{
    error::TypeError,
    schema::{EntityFields, EntityKind, Price, Recipe, RecipeFields},
};
use crate::constants::{MAX_FIELD_LENGTH, MIN_PASSWORD_LENGTH};

pub type FormData = HashMap<String, Value>;

/// Loosely typed request body. Keys that no form reads are ignored.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: TryFrom<Value, Error = TypeError>,
    {
        match self.inner.get(key) {
            Some(value) => value.to_owned().try_into(),
            None => Err(missing(key)),
        }
    }

    /// Reads an integer sent either as a JSON number or as a numeric string.
    /// A zero fraction such as `30.0` is accepted.
    pub fn get_number<T>(&self, key: &str) -> Result<T, TypeError>
    where
        T: FromStr,
    {
        let invalid = || TypeError::new(&format!("{key}: A valid integer is required"));

        match self.inner.get(key) {
            Some(Value::Number(value)) => whole(&value.to_string()).parse().map_err(|_e| invalid()),
            Some(Value::String(value)) => whole(value.trim()).parse().map_err(|_e| invalid()),
            Some(_) => Err(invalid()),
            None => Err(missing(key)),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(Value::String(value)) => Ok(value.to_string()),
            Some(_) => Err(TypeError::new(&format!("{key}: Not a valid string"))),
            None => Err(missing(key)),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Vec<Form>, TypeError> {
        match self.inner.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(Form::from_data(
                        map.iter()
                            .map(|(k, v)| (k.to_owned(), v.to_owned()))
                            .collect(),
                    )),
                    _ => Err(TypeError::new(&format!(
                        "{key}: Expected a list of objects"
                    ))),
                })
                .collect(),
            Some(_) => Err(TypeError::new(&format!("{key}: Expected a list of items"))),
            None => Err(missing(key)),
        }
    }

    fn optional<T>(
        &self,
        key: &str,
        read: impl FnOnce(&Self, &str) -> Result<T, TypeError>,
    ) -> Result<Option<T>, TypeError> {
        if self.contains(key) {
            read(self, key).map(Some)
        } else {
            Ok(None)
        }
    }
}

fn missing(key: &str) -> TypeError {
    TypeError::new(&format!("{key}: This field is required"))
}

/// Drops a fraction made only of zeros, so `"30.0"` reads as `"30"`.
fn whole(number: &str) -> &str {
    match number.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        _ => number,
    }
}

/// Trimmed text with the length limit of a `varchar(255)` column.
fn text(form: &Form, key: &str, allow_blank: bool) -> Result<String, TypeError> {
    let value = form.get_str(key)?.trim().to_string();

    if !allow_blank && value.is_empty() {
        return Err(TypeError::new(&format!("{key}: This field may not be blank")));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(TypeError::new(&format!(
            "{key}: Ensure this field has no more than {MAX_FIELD_LENGTH} characters"
        )));
    }

    Ok(value)
}

/// Body of a tag or ingredient, either standalone or nested in a recipe.
pub fn parse_entity(form: &Form) -> Result<EntityFields, TypeError> {
    Ok(EntityFields {
        name: text(form, "name", false)?,
    })
}

/// Recipe payload as sent by the client. Every field is optional here; the
/// create and full-update paths call [`RecipeForm::require_complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Price>,
    pub link: Option<String>,
    pub tags: Option<Vec<EntityFields>>,
    pub ingredients: Option<Vec<EntityFields>>,
}

impl RecipeForm {
    pub fn parse(form: &Form) -> Result<Self, TypeError> {
        let entities = |kind: EntityKind| {
            form.optional(kind.key(), |form, key| {
                form.get_list(key)?
                    .iter()
                    .map(parse_entity)
                    .collect::<Result<Vec<_>, _>>()
            })
        };

        Ok(Self {
            title: form.optional("title", |form, key| text(form, key, false))?,
            description: form.optional("description", |form, key| {
                form.get_str(key).map(|v| v.trim().to_string())
            })?,
            time_minutes: form.optional("time_minutes", Form::get_number)?,
            price: form.optional("price", Form::get_value)?,
            link: form.optional("link", |form, key| text(form, key, true))?,
            tags: entities(EntityKind::Tag)?,
            ingredients: entities(EntityKind::Ingredient)?,
        })
    }

    pub fn require_complete(&self) -> Result<(), TypeError> {
        if self.title.is_none() {
            return Err(missing("title"));
        }
        if self.time_minutes.is_none() {
            return Err(missing("time_minutes"));
        }
        if self.price.is_none() {
            return Err(missing("price"));
        }
        Ok(())
    }

    pub fn entities(&self, kind: EntityKind) -> Option<&[EntityFields]> {
        match kind {
            EntityKind::Tag => self.tags.as_deref(),
            EntityKind::Ingredient => self.ingredients.as_deref(),
        }
    }

    /// Scalar columns for a new row.
    pub fn to_fields(&self) -> Result<RecipeFields, TypeError> {
        self.require_complete()?;

        Ok(RecipeFields {
            title: self.title.to_owned().unwrap_or_default(),
            description: self.description.to_owned().unwrap_or_default(),
            time_minutes: self.time_minutes.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            link: self.link.to_owned().unwrap_or_default(),
        })
    }

    /// Overwrites the scalars present in the payload. Owner and id are never
    /// read from the payload, so attempts to change them fall through silently.
    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.to_owned();
        }
        if let Some(description) = &self.description {
            recipe.description = description.to_owned();
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(link) = &self.link {
            recipe.link = link.to_owned();
        }
    }
}

/// Account fields. `require_complete` is used on sign-up and full updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserForm {
    pub fn parse(form: &Form) -> Result<Self, TypeError> {
        Ok(Self {
            email: form.optional("email", |form, key| {
                let email = text(form, key, false)?;
                validate_email(&email)?;
                Ok(email)
            })?,
            password: form.optional("password", |form, key| {
                let password = form.get_str(key)?;
                if password.chars().count() < MIN_PASSWORD_LENGTH {
                    return Err(TypeError::new(&format!(
                        "{key}: Ensure this field has at least {MIN_PASSWORD_LENGTH} characters"
                    )));
                }
                Ok(password)
            })?,
            name: form.optional("name", |form, key| text(form, key, false))?,
        })
    }

    pub fn require_complete(&self) -> Result<(), TypeError> {
        if self.email.is_none() {
            return Err(missing("email"));
        }
        if self.password.is_none() {
            return Err(missing("password"));
        }
        if self.name.is_none() {
            return Err(missing("name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// The password is taken verbatim; surrounding whitespace is significant.
    pub fn parse(form: &Form) -> Result<Self, TypeError> {
        let email = text(form, "email", false)?;
        validate_email(&email)?;

        let password = form.get_str("password")?;
        if password.is_empty() {
            return Err(TypeError::new("password: This field may not be blank"));
        }

        Ok(Self { email, password })
    }
}

fn validate_email(email: &str) -> Result<(), TypeError> {
    let invalid = || TypeError::new("email: Enter a valid email address");

    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels_ok = domain
        .split('.')
        .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'));
    if !labels_ok || !(domain.contains('.') || domain == "localhost") {
        return Err(invalid());
    }

    Ok(())
}
