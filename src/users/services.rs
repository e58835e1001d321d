use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::{
    dto::{PublicUser, UserWithRecipes},
    repo_types::User,
};
use crate::{
    error::{AppError, Validator},
    images::image_url,
    recipes::{self, Recipe},
    state::AppState,
};

pub const MAX_NAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    }
    username.chars().count() <= MAX_NAME_LEN && USERNAME_RE.is_match(username)
}

/// Profile fields shared by registration.
pub(crate) fn check_profile(v: &mut Validator, username: &str, first_name: &str, last_name: &str) {
    if username.is_empty() {
        v.add("username", "This field may not be blank.");
    } else {
        v.check(
            is_valid_username(username),
            "username",
            "Enter a valid username. Letters, digits and @/./+/-/_ only.",
        );
    }
    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if value.trim().is_empty() {
            v.add(field, "This field may not be blank.");
        } else if value.chars().count() > MAX_NAME_LEN {
            v.add(field, "Ensure this field has no more than 150 characters.");
        }
    }
}

pub fn recipes_limit(raw: Option<i64>) -> Result<Option<i64>, AppError> {
    match raw {
        Some(n) if n < 0 => Err(AppError::field(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0.",
        )),
        other => Ok(other),
    }
}

async fn to_public(
    st: &AppState,
    user: User,
    subscribed: &HashSet<Uuid>,
) -> Result<PublicUser, AppError> {
    let avatar = image_url(st, user.avatar_key.as_deref()).await?;
    Ok(PublicUser {
        is_subscribed: subscribed.contains(&user.id),
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        avatar,
    })
}

/// Builds public views, resolving `is_subscribed` for `viewer` in one query.
pub async fn public_users(
    st: &AppState,
    viewer: Option<Uuid>,
    users: Vec<User>,
) -> Result<Vec<PublicUser>, AppError> {
    let subscribed = match viewer {
        Some(v) if !users.is_empty() => {
            let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
            User::subscribed_among(&st.db, v, &ids).await?
        }
        _ => HashSet::new(),
    };
    let mut out = Vec::with_capacity(users.len());
    for u in users {
        out.push(to_public(st, u, &subscribed).await?);
    }
    Ok(out)
}

pub async fn public_user(
    st: &AppState,
    viewer: Option<Uuid>,
    user: User,
) -> Result<PublicUser, AppError> {
    let mut views = public_users(st, viewer, vec![user]).await?;
    views.pop().ok_or(AppError::NotFound)
}

pub async fn with_recipes(
    st: &AppState,
    viewer: Option<Uuid>,
    users: Vec<User>,
    recipes_limit: Option<i64>,
) -> Result<Vec<UserWithRecipes>, AppError> {
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let counts: HashMap<Uuid, i64> = Recipe::count_by_authors(&st.db, &ids)
        .await?
        .into_iter()
        .collect();

    let public = public_users(st, viewer, users).await?;
    let mut out = Vec::with_capacity(public.len());
    for user in public {
        let own = Recipe::list_by_author(&st.db, user.id, recipes_limit).await?;
        out.push(UserWithRecipes {
            recipes_count: counts.get(&user.id).copied().unwrap_or(0),
            recipes: recipes::short_views(st, own).await?,
            user,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("cook@example.com"));
        assert!(!is_valid_email("cook@example"));
        assert!(!is_valid_email("no spaces@example.com"));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("chef.john+1"));
        assert!(is_valid_username("anna_k"));
        assert!(!is_valid_username("bad name"));
        assert!(!is_valid_username(&"x".repeat(151)));
    }

    #[test]
    fn profile_check_reports_each_blank_field() {
        let mut v = Validator::new();
        check_profile(&mut v, "", " ", "Smith");
        let Err(AppError::Validation(errors)) = v.finish() else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("first_name"));
        assert!(!errors.contains_key("last_name"));
    }

    #[test]
    fn negative_recipes_limit_is_rejected() {
        assert_eq!(recipes_limit(None).unwrap(), None);
        assert_eq!(recipes_limit(Some(3)).unwrap(), Some(3));
        assert!(recipes_limit(Some(-1)).is_err());
    }
}
