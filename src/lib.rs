pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod ingredients;
pub mod pagination;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod shortlinks;
pub mod state;
pub mod storage;
pub mod users;
