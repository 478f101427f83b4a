pub use super::actors::Entity as Actors;
pub use super::movie_actors::Entity as MovieActors;
pub use super::movies::Entity as Movies;
pub use super::reviews::Entity as Reviews;
pub use super::user_credentials::Entity as UserCredentials;
pub use super::users::Entity as Users;
