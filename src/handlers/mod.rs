pub mod auth;
pub mod groups;
pub mod health;
pub mod oauth;
pub mod posts;
pub mod profiles;

pub use auth::*;
pub use groups::*;
pub use health::*;
pub use oauth::*;
pub use posts::*;
pub use profiles::*;
