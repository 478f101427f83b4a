//! Command-line interface for reelbase.

mod commands;

use clap::{Parser, Subcommand};

/// reelbase - movie catalog REST backend
#[derive(Parser)]
#[command(name = "reelbase")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Allow a registered user to sign in
    Activate {
        /// Email the user signed up with
        email: String,
    },

    /// Block a user from signing in
    Deactivate {
        email: String,
    },

    /// Set or clear a user's role (admin, moderator, ...)
    Role {
        email: String,
        /// Omit to clear the role
        role: Option<String>,
    },
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_role() {
        let cli = Cli::try_parse_from(["reelbase", "user", "role", "ada@example.com", "admin"])
            .unwrap();
        match cli.command {
            Some(Commands::User {
                command: UserCommands::Role { email, role },
            }) => {
                assert_eq!(email, "ada@example.com");
                assert_eq!(role.as_deref(), Some("admin"));
            }
            _ => panic!("expected user role command"),
        }
    }

    #[test]
    fn test_no_command_defaults_to_none() {
        let cli = Cli::try_parse_from(["reelbase"]).unwrap();
        assert!(cli.command.is_none());
    }
}
