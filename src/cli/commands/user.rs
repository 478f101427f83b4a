use crate::config::Config;
use crate::db::{RepoError, Store};

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

pub async fn cmd_user_activate(config: &Config, email: &str, active: bool) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let email = email.trim().to_lowercase();

    match store.users().set_active_by_email(&email, active).await {
        Ok(user) => {
            let state = if user.is_active { "activated" } else { "deactivated" };
            println!("✓ {} {} ({})", user.email, state, user.id);
        }
        Err(RepoError::NotFound { .. }) => println!("No user registered with email {email}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

pub async fn cmd_user_role(config: &Config, email: &str, role: Option<&str>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let email = email.trim().to_lowercase();
    let role = role
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_lowercase);

    match store.users().set_role_by_email(&email, role).await {
        Ok(user) => match &user.role {
            Some(role) => println!("✓ {} is now {role}", user.email),
            None => println!("✓ Cleared role of {}", user.email),
        },
        Err(RepoError::NotFound { .. }) => println!("No user registered with email {email}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
