use serde::Deserialize;
use uuid::Uuid;

use super::repo_types::RecipeFilter;
use crate::{
    error::{AppError, Validator},
    pagination::PageParams,
};

/// Raw `GET /recipes` query string.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub author: Option<Uuid>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

/// Accepts `1/true/True` and `0/false/False`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" | "True" => Some(true),
        "0" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl RecipeQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Relationship filters only apply to a known caller; for anonymous
    /// requests they are validated and then ignored.
    pub fn to_filter(&self, viewer: Option<Uuid>) -> Result<RecipeFilter, AppError> {
        let mut v = Validator::new();
        let mut flag = |field: &str, raw: &Option<String>| -> Option<bool> {
            let raw = raw.as_deref()?;
            let parsed = parse_flag(raw);
            if parsed.is_none() {
                v.add(
                    field,
                    format!("Select a valid choice. {raw} is not one of the available choices."),
                );
            }
            parsed
        };
        let favorited = flag("is_favorited", &self.is_favorited);
        let in_cart = flag("is_in_shopping_cart", &self.is_in_shopping_cart);
        v.finish()?;

        Ok(RecipeFilter {
            author: self.author,
            favorited: viewer.zip(favorited),
            in_cart: viewer.zip(in_cart),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_spellings() {
        for raw in ["1", "true", "True"] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "False"] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        for raw in ["yes", "TRUE", "2", ""] {
            assert_eq!(parse_flag(raw), None, "{raw}");
        }
    }

    #[test]
    fn anonymous_filters_are_noop() {
        let q = RecipeQuery {
            is_favorited: Some("1".into()),
            is_in_shopping_cart: Some("0".into()),
            ..Default::default()
        };
        assert_eq!(q.to_filter(None).unwrap(), RecipeFilter::default());
    }

    #[test]
    fn authenticated_filters_carry_viewer() {
        let viewer = Uuid::new_v4();
        let author = Uuid::new_v4();
        let q = RecipeQuery {
            author: Some(author),
            is_favorited: Some("true".into()),
            is_in_shopping_cart: Some("False".into()),
            ..Default::default()
        };
        let f = q.to_filter(Some(viewer)).unwrap();
        assert_eq!(f.author, Some(author));
        assert_eq!(f.favorited, Some((viewer, true)));
        assert_eq!(f.in_cart, Some((viewer, false)));
    }

    #[test]
    fn invalid_flag_is_rejected_even_for_anonymous() {
        let q = RecipeQuery {
            is_favorited: Some("maybe".into()),
            ..Default::default()
        };
        let Err(AppError::Validation(errors)) = q.to_filter(None) else {
            panic!("expected validation error");
        };
        assert!(errors["is_favorited"][0].contains("maybe"));
    }
}
