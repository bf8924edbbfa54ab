//! Config subcommand handlers.

use dialoguer::{Confirm, Input};

use coop_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort_unstable();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Copy of `cfg` with plaintext tokens replaced by a mask.
fn masked(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("********".into());
        }
    }
    cfg
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = masked(&config::load_config_or_default());
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unprintable: {e}>")),
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: coop config init");
                return Ok(());
            }
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(not_found(profile_name, &cfg));
            }

            let token = rpassword::prompt_password("Backend token: ").map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            coop_config::store_token(&profile_name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ─────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let path = config::config_path();
    eprintln!("coop configuration wizard");
    eprintln!("  Config path: {}\n", path.display());

    let mut cfg = config::load_config_or_default();
    let defaults = Profile::default();

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let api_url: String = Input::new()
        .with_prompt("Backend API URL")
        .default(defaults.api_url.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let status_url: String = Input::new()
        .with_prompt("Status stream URL")
        .default(defaults.status_url.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let operator: String = Input::new()
        .with_prompt("Operator email (blank to skip)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let wants_token = Confirm::new()
        .with_prompt("Store a backend token in the system keyring?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;

    let profile = Profile {
        api_url,
        status_url,
        operator: (!operator.trim().is_empty()).then(|| operator.trim().to_owned()),
        ..defaults
    };

    // Validate before writing anything.
    coop_config::profile_to_controller_config(&profile, &profile_name)?;

    if wants_token {
        let token = rpassword::prompt_password("Backend token: ").map_err(prompt_err)?;
        if !token.is_empty() {
            coop_config::store_token(&profile_name, &token)?;
            eprintln!("  ✓ Token stored in system keyring");
        }
    }

    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: coop status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_tokens() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "barn".into(),
            Profile {
                token: Some("s3cret".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("run".into(), Profile::default());

        let shown = masked(&cfg);
        assert_eq!(shown.profiles["barn"].token.as_deref(), Some("********"));
        assert_eq!(shown.profiles["run"].token, None);
    }
}
