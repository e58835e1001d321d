mod dto;
pub mod handlers;
mod repo;
mod repo_types;
mod services;

pub use dto::PublicUser;
pub use repo_types::{NewUser, User};
pub(crate) use services::{check_profile, is_valid_email, public_user, public_users};
