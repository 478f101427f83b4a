pub mod auth_service;
pub mod auth_service_impl;
pub mod token;

pub use auth_service::{AuthError, AuthService, NewUser, SignInResult};
pub use auth_service_impl::SeaOrmAuthService;
pub use token::{Identity, TokenError, TokenService};
