use std::time::Duration;

/// Character limit shared by every short text column.
pub const MAX_FIELD_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 5;

pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;
pub const WAIT_FOR_DB_DELAY: Duration = Duration::from_secs(1);

pub const AUTHENTICATION_FAILED: &str = "Unable to authenticate with provided credentials";

/// Statements applied by `PgStore::migrate`, in order.
pub const SCHEMA: &[&str] = &[
    "
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        name VARCHAR(255) NOT NULL,
        password VARCHAR(255) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        is_superuser BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "
    CREATE TABLE IF NOT EXISTS tags (
        id SERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        UNIQUE (user_id, name)
    )",
    "
    CREATE TABLE IF NOT EXISTS ingredients (
        id SERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        UNIQUE (user_id, name)
    )",
    "
    CREATE TABLE IF NOT EXISTS recipes (
        id SERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        time_minutes INTEGER NOT NULL,
        price_cents INTEGER NOT NULL CHECK (price_cents BETWEEN -99999 AND 99999),
        link VARCHAR(255) NOT NULL DEFAULT '',
        image VARCHAR(255)
    )",
    "
    CREATE TABLE IF NOT EXISTS recipe_tags (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, tag_id)
    )",
    "
    CREATE TABLE IF NOT EXISTS recipe_ingredients (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, ingredient_id)
    )",
];
