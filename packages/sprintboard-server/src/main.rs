use std::path::Path;
use std::sync::Arc;

use sprintboard_core::storage::local::LocalStorage;
use sprintboard_core::storage::BoardRepository;
use sprintboard_core::types::{Role, User};
use sprintboard_server::config::{self, ServerConfig};
use sprintboard_server::server::run_server;
use sprintboard_server::state::AppState;

fn open_storage(config: &ServerConfig) -> Result<LocalStorage, Box<dyn std::error::Error>> {
    match &config.data_file {
        Some(path) => {
            let storage = LocalStorage::open(Path::new(path))?;
            log::info!(target: "sprintboard.server", "Using data file {}", path);
            Ok(storage)
        }
        None => {
            log::warn!(target: "sprintboard.server", "No data_file configured, data is kept in memory only");
            Ok(LocalStorage::new())
        }
    }
}

fn seed_admin(storage: &LocalStorage, config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(seed) = &config.seed_admin else {
        return Ok(());
    };
    if storage.get_user(&seed.id).is_some() {
        return Ok(());
    }
    storage.upsert_user(User {
        id: seed.id.clone(),
        email: seed.email.clone(),
        name: seed.name.clone(),
        avatar: None,
        role: Role::Admin,
    })?;
    log::info!(target: "sprintboard.server", "Seeded admin user {}", seed.id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = config::default_config_path();
    let config = config::load_config(&config_path);

    let storage = open_storage(&config)?;
    seed_admin(&storage, &config)?;

    let state = AppState::new(Arc::new(storage), config.port, config.bind_address.clone());
    run_server(state).await
}
