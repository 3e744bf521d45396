use std::fmt::{self, Display};

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::error::TypeError;

pub type Id = i32;

/// The two owner-scoped registries a recipe can be associated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tag,
    Ingredient,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Tag, EntityKind::Ingredient];

    /// Key used for the nested list in recipe payloads and for the URL segment.
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Tag => "tags",
            EntityKind::Ingredient => "ingredients",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Tag => "tags",
            EntityKind::Ingredient => "ingredients",
        }
    }

    pub fn association_table(&self) -> &'static str {
        match self {
            EntityKind::Tag => "recipe_tags",
            EntityKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn association_column(&self) -> &'static str {
        match self {
            EntityKind::Tag => "tag_id",
            EntityKind::Ingredient => "ingredient_id",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Tag => write!(f, "tag"),
            EntityKind::Ingredient => write!(f, "ingredient"),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// What the API shows of a user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            name: user.name.to_owned(),
        }
    }
}

/// A tag or an ingredient.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedEntity {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub name: String,
}

/// Every caller-supplied field of a named entity.
///
/// Lookup compares all of these and creation writes all of these, so a field
/// added here is honoured by get-or-create without further changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityFields {
    pub name: String,
}

impl EntityFields {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn matches(&self, entity: &NamedEntity) -> bool {
        self.name == entity.name
    }
}

/// A decimal amount with two fractional digits, kept as integer cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i32);

impl Price {
    /// Largest magnitude that fits five digits with two decimal places.
    pub const MAX_CENTS: i32 = 99_999;

    pub fn from_cents(cents: i32) -> Result<Self, TypeError> {
        if cents.abs() > Self::MAX_CENTS {
            return Err(TypeError::new(
                "price: Ensure that there are no more than 5 digits in total",
            ));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i32 {
        self.0
    }

    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let value = value.trim();
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(TypeError::new("price: A valid number is required"));
        }
        if fraction.len() > 2 {
            return Err(TypeError::new(
                "price: Ensure that there are no more than 2 decimal places",
            ));
        }
        let whole = whole.trim_start_matches('0');
        if whole.len() > 3 {
            return Err(TypeError::new(
                "price: Ensure that there are no more than 5 digits in total",
            ));
        }

        let invalid = |_| TypeError::new("price: A valid number is required");
        let whole: i32 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(invalid)?
        };
        let fraction: i32 = format!("{fraction:0<2}").parse().map_err(invalid)?;

        let cents = whole * 100 + fraction;
        Self::from_cents(if negative { -cents } else { cents })
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl TryFrom<Value> for Price {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(value) => Self::parse(&value),
            Value::Number(value) => Self::parse(&value.to_string()),
            _ => Err(TypeError::new("price: A valid number is required")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    #[sqlx(rename = "price_cents")]
    pub price: Price,
    pub link: String,
    pub image: Option<String>,
}

/// Scalar columns written when a recipe row is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
}

/// Restricts a recipe listing to recipes carrying any of the given tags and
/// any of the given ingredients. `None` means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: EntityKind) -> Option<&[Id]> {
        match kind {
            EntityKind::Tag => self.tags.as_deref(),
            EntityKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<NamedEntity>,
    pub ingredients: Vec<NamedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub image: Option<String>,
}

impl RecipeSummary {
    pub fn new(recipe: &Recipe, tags: Vec<NamedEntity>, ingredients: Vec<NamedEntity>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.to_owned(),
            tags,
            ingredients,
        }
    }
}

impl RecipeDetail {
    pub fn new(recipe: &Recipe, tags: Vec<NamedEntity>, ingredients: Vec<NamedEntity>) -> Self {
        Self {
            summary: RecipeSummary::new(recipe, tags, ingredients),
            description: recipe.description.to_owned(),
            image: recipe.image.to_owned(),
        }
    }
}
