use crate::api::{EmbyClient, MediaServer};
use crate::core::settings::Settings;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize)]
struct DiscoverOutput {
    users: BTreeMap<String, String>,
    libraries: BTreeMap<String, String>,
}

/// Lists users and libraries so the `[library]` section can be filled in.
pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    settings.validate_server()?;

    let client = EmbyClient::new(&settings.server.url, &settings.server.api_key)
        .context("Failed to create Emby client")?;
    client
        .test_connection()
        .await
        .with_context(|| format!("Cannot connect to {}", settings.server.url))?;

    let output = DiscoverOutput {
        users: sorted(client.list_users().await.context("Failed to list users")?),
        libraries: sorted(
            client
                .list_libraries()
                .await
                .context("Failed to list libraries")?,
        ),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_section("Users", "user_id", &output.users);
        println!();
        print_section("Libraries", "tv_library_id / movie_library_id", &output.libraries);
    }

    Ok(())
}

fn sorted(map: HashMap<String, String>) -> BTreeMap<String, String> {
    map.into_iter().collect()
}

fn print_section(title: &str, setting: &str, entries: &BTreeMap<String, String>) {
    println!("{} (use the id for {})", title, setting);
    if entries.is_empty() {
        println!("  (none)");
    }
    for (name, id) in entries {
        println!("  {:<32} {}", name, id);
    }
}
