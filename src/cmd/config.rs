//! Configuration view and validation commands (`delphi config`).

use anyhow::Result;

use super::super::ConfigCommands;

fn print_toml(toml: &delphi::config::DelphiToml) {
    if let Some(name) = &toml.project.name {
        println!("[project]");
        println!("  name = \"{}\"", name);
        println!();
    }

    println!("[identity]");
    println!("  mode = \"{}\"", toml.identity.mode);
    println!("  roster_file = \"{}\"", toml.identity.roster_file);
    println!();

    println!("[corpus]");
    println!("  file = \"{}\"", toml.corpus.file);
    println!();

    println!("[store]");
    println!("  backend = \"{}\"", toml.store.backend);
    println!("  dir = \"{}\"", toml.store.dir);
    println!("  timeout_ms = {}", toml.store.timeout_ms);
    println!();

    println!("[scoring]");
    println!("  dimensions = {:?}", toml.scoring.dimensions);
    println!("  min_score = {}", toml.scoring.min_score);
    println!("  max_score = {}", toml.scoring.max_score);
    println!("  qualitative_fields = {:?}", toml.scoring.qualitative_fields);
    println!("  duplicate_policy = \"{}\"", toml.scoring.duplicate_policy);
    println!();
}

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use delphi::config::{DelphiConfig, DelphiToml};
    use delphi::identity::Roster;
    use delphi::init::get_delphi_dir;

    let delphi_dir = get_delphi_dir(project_dir);
    let config_path = delphi_dir.join("delphi.toml");

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Delphi Configuration");
            println!("====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&DelphiToml::load(&config_path)?);

                println!("Effective values (with env overrides):");
                let config = DelphiConfig::new(project_dir.to_path_buf())?;
                println!("  identity.mode = \"{}\"", config.toml.identity.mode);
                println!("  store.backend = \"{}\"", config.toml.store.backend);
                println!("  store dir = {}", config.store_dir().display());
                println!("  store timeout = {}ms", config.toml.store.timeout_ms);
                println!();
            } else {
                println!("No delphi.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&DelphiToml::default());
                println!("Run 'delphi config init' to create a delphi.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = DelphiConfig::new(project_dir.to_path_buf())?;
            let mut warnings = config.validate();

            match Roster::load(&config.roster_file()) {
                Ok(roster) => warnings.extend(roster.validate()),
                Err(e) => warnings.push(e.to_string()),
            }
            match delphi::catalog::load(&config.corpus_file()) {
                Ok(catalog) if catalog.is_empty() => {
                    warnings.push("corpus is empty: there is nothing to review".to_string());
                }
                Ok(_) => {}
                Err(e) => warnings.push(e.to_string()),
            }

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("delphi.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !delphi_dir.exists() {
                std::fs::create_dir_all(&delphi_dir)?;
            }

            DelphiToml::default().save(&config_path)?;

            println!("Created delphi.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [identity] mode (token or debug), roster_file");
            println!("  - [store] backend (files or jsonl), dir, timeout_ms");
            println!("  - [scoring] dimensions, score range, duplicate_policy");
            println!();
        }
    }

    Ok(())
}
