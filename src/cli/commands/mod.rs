mod init;
mod user;

pub use init::cmd_init;
pub use user::{cmd_user_activate, cmd_user_role};
