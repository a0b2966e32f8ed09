// Services module - Business logic

pub mod auth;
pub mod bookmarks;
pub mod catalog;
pub mod mailer;
pub mod normalize;
pub mod otp;
pub mod password;
pub mod providers;
pub mod tokens;
