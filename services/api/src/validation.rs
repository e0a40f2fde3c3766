//! Input validation utilities
//!
//! Each validator returns an [`ApiError::Validation`] naming the offending
//! field. Validators that turn a request into a write model normalize the
//! input on the way (trimming, lowercasing emails, decoding images).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::{
    config::ApiSettings,
    error::{ApiError, ApiResult},
    images,
    models::{
        IngredientAmount, IngredientRequest, NewRecipe, NewUser, RecipeChanges, RecipeRequest,
        RegisterRequest, TagRequest,
    },
};

const NAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;
const TAG_MAX: usize = 50;
const UNIT_MAX: usize = 100;

/// Usernames that would shadow fixed routes
const RESERVED_USERNAMES: [&str; 2] = ["me", "subscriptions"];

fn required(field: &'static str, value: &str, max: usize) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(field, "This field is required"));
    }
    if value.chars().count() > max {
        return Err(ApiError::validation(
            field,
            format!("Must be at most {} characters long", max),
        ));
    }
    Ok(value.to_string())
}

fn required_opt(field: &'static str, value: Option<&str>, max: usize) -> ApiResult<String> {
    required(field, value.unwrap_or_default(), max)
}

fn optional(field: &'static str, value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    value.map(|value| required(field, value, max)).transpose()
}

/// Validate username
pub fn validate_username(username: &str) -> ApiResult<()> {
    if username.is_empty() {
        return Err(ApiError::validation("username", "Username is required"));
    }

    if username.chars().count() > NAME_MAX {
        return Err(ApiError::validation(
            "username",
            format!("Username must be at most {} characters long", NAME_MAX),
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(ApiError::validation(
            "username",
            "Username can only contain letters, digits and @/./+/-/_",
        ));
    }

    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(ApiError::validation(
            "username",
            format!("Username '{}' is reserved", username),
        ));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() {
        return Err(ApiError::validation("email", "Email is required"));
    }

    if email.len() > EMAIL_MAX {
        return Err(ApiError::validation(
            "email",
            format!("Email must be at most {} characters long", EMAIL_MAX),
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(ApiError::validation("email", "Invalid email format"));
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(field: &'static str, password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::validation(field, "Password is required"));
    }

    if password.len() < 8 {
        return Err(ApiError::validation(
            field,
            "Password must be at least 8 characters long",
        ));
    }

    if password.len() > 128 {
        return Err(ApiError::validation(
            field,
            "Password must be at most 128 characters long",
        ));
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() {
            has_special = true;
        }
    }

    let missing = if !has_upper {
        Some("an uppercase letter")
    } else if !has_lower {
        Some("a lowercase letter")
    } else if !has_digit {
        Some("a digit")
    } else if !has_special {
        Some("a special character")
    } else {
        None
    };

    match missing {
        Some(what) => Err(ApiError::validation(
            field,
            format!("Password must contain at least {}", what),
        )),
        None => Ok(()),
    }
}

/// Validate a registration and normalize it
pub fn validate_registration(request: &RegisterRequest) -> ApiResult<NewUser> {
    let email = request.email.trim().to_lowercase();
    validate_email(&email)?;

    let username = request.username.trim().to_string();
    validate_username(&username)?;

    let first_name = required("first_name", &request.first_name, NAME_MAX)?;
    let last_name = required("last_name", &request.last_name, NAME_MAX)?;
    validate_password("password", &request.password)?;

    Ok(NewUser {
        email,
        username,
        first_name,
        last_name,
        password: request.password.clone(),
    })
}

/// A user cannot follow themself
pub fn validate_follow(user_id: Uuid, target_id: Uuid) -> ApiResult<()> {
    if user_id == target_id {
        return Err(ApiError::validation(
            "following",
            "You cannot subscribe to yourself",
        ));
    }
    Ok(())
}

fn validate_tag_ids(tags: &[Uuid]) -> ApiResult<()> {
    if tags.is_empty() {
        return Err(ApiError::validation("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(ApiError::validation("tags", "Tags must not repeat"));
    }

    Ok(())
}

fn validate_ingredient_lines(
    ingredients: &[IngredientAmount],
    settings: &ApiSettings,
) -> ApiResult<()> {
    if ingredients.is_empty() {
        return Err(ApiError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for line in ingredients {
        if !seen.insert(line.id) {
            return Err(ApiError::validation(
                "ingredients",
                "Ingredients must not repeat",
            ));
        }
        if line.amount < settings.min_ingredient_amount {
            return Err(ApiError::validation(
                "ingredients",
                format!(
                    "Ingredient amount must be at least {}",
                    settings.min_ingredient_amount
                ),
            ));
        }
    }

    Ok(())
}

fn validate_cooking_time(cooking_time: i32, settings: &ApiSettings) -> ApiResult<()> {
    if cooking_time < settings.min_cooking_time {
        return Err(ApiError::validation(
            "cooking_time",
            format!(
                "Cooking time must be at least {} minute(s)",
                settings.min_cooking_time
            ),
        ));
    }
    if cooking_time > settings.max_cooking_time {
        return Err(ApiError::validation(
            "cooking_time",
            format!(
                "Cooking time must be at most {} minutes",
                settings.max_cooking_time
            ),
        ));
    }
    Ok(())
}

fn validate_text(text: Option<&str>) -> ApiResult<Option<String>> {
    match text.map(str::trim) {
        Some("") => Err(ApiError::validation("text", "This field is required")),
        other => Ok(other.map(str::to_string)),
    }
}

/// Validate a recipe for creation; every field is required
pub fn validate_new_recipe(request: &RecipeRequest, settings: &ApiSettings) -> ApiResult<NewRecipe> {
    validate_ingredient_lines(&request.ingredients, settings)?;
    validate_tag_ids(&request.tags)?;

    let image = request
        .image
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::validation("image", "This field is required"))?;
    let image = images::decode_data_uri("image", image, settings.max_image_bytes)?;

    let name = required_opt("name", request.name.as_deref(), NAME_MAX)?;
    let text = validate_text(request.text.as_deref())?
        .ok_or_else(|| ApiError::validation("text", "This field is required"))?;
    let cooking_time = request
        .cooking_time
        .ok_or_else(|| ApiError::validation("cooking_time", "This field is required"))?;
    validate_cooking_time(cooking_time, settings)?;

    Ok(NewRecipe {
        name,
        text,
        cooking_time,
        image,
        ingredients: request.ingredients.clone(),
        tags: request.tags.clone(),
    })
}

/// Validate a recipe update; tags and ingredients are still required
pub fn validate_recipe_changes(
    request: &RecipeRequest,
    settings: &ApiSettings,
) -> ApiResult<RecipeChanges> {
    validate_ingredient_lines(&request.ingredients, settings)?;
    validate_tag_ids(&request.tags)?;

    let image = request
        .image
        .as_deref()
        .map(|value| images::decode_data_uri("image", value, settings.max_image_bytes))
        .transpose()?;

    let name = optional("name", request.name.as_deref(), NAME_MAX)?;
    let text = validate_text(request.text.as_deref())?;
    if let Some(cooking_time) = request.cooking_time {
        validate_cooking_time(cooking_time, settings)?;
    }

    Ok(RecipeChanges {
        name,
        text,
        cooking_time: request.cooking_time,
        image,
        ingredients: request.ingredients.clone(),
        tags: request.tags.clone(),
    })
}

fn validate_slug(slug: &str) -> ApiResult<()> {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        SLUG_REGEX.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Failed to compile slug regex"));

    if !regex.is_match(slug) {
        return Err(ApiError::validation(
            "slug",
            "Slug can only contain letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

/// Validate a tag; `partial` allows missing fields for updates
pub fn validate_tag(request: &TagRequest, partial: bool) -> ApiResult<TagRequest> {
    let (name, slug) = if partial {
        (
            optional("name", request.name.as_deref(), TAG_MAX)?,
            optional("slug", request.slug.as_deref(), TAG_MAX)?,
        )
    } else {
        (
            Some(required_opt("name", request.name.as_deref(), TAG_MAX)?),
            Some(required_opt("slug", request.slug.as_deref(), TAG_MAX)?),
        )
    };

    if let Some(slug) = &slug {
        validate_slug(slug)?;
    }

    Ok(TagRequest { name, slug })
}

/// Validate an ingredient; `partial` allows missing fields for updates
pub fn validate_ingredient(
    request: &IngredientRequest,
    partial: bool,
) -> ApiResult<IngredientRequest> {
    if partial {
        return Ok(IngredientRequest {
            name: optional("name", request.name.as_deref(), NAME_MAX)?,
            measurement_unit: optional(
                "measurement_unit",
                request.measurement_unit.as_deref(),
                UNIT_MAX,
            )?,
        });
    }

    Ok(IngredientRequest {
        name: Some(required_opt("name", request.name.as_deref(), NAME_MAX)?),
        measurement_unit: Some(required_opt(
            "measurement_unit",
            request.measurement_unit.as_deref(),
            UNIT_MAX,
        )?),
    })
}
