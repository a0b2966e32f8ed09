// Models module - Database entity representations

pub mod bookmark;
pub mod catalog;
pub mod city;
pub mod profession;
pub mod provider;
pub mod refresh_token;
pub mod user;

pub use bookmark::Bookmark;
pub use city::City;
pub use profession::Profession;
pub use provider::{Provider, ProviderCard};
pub use refresh_token::RefreshToken;
pub use user::{PublicUser, User, UserRole};
