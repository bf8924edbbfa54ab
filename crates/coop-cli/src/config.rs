//! CLI-side configuration: `GlobalOpts` overrides layered over the shared
//! profile config, and selection of live or demo services.
//!
//! Core never sees these types -- it receives a pre-built
//! `ControllerConfig` and `Services`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use coop_config::{Config, Profile};
use coop_core::{ControllerConfig, IdentityProvider, Principal, Services, SessionIdentity};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use coop_config::{config_path, load_config_or_default, save_config};

/// Everything needed to build a controller for one invocation.
pub struct Resolved {
    pub profile_name: String,
    pub controller: ControllerConfig,
    pub operator: Option<String>,
}

// ── Profile resolution ───────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn available_profiles(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Apply flag overrides to a copy of `profile`.
fn overlay(profile: &Profile, global: &GlobalOpts) -> Profile {
    let mut merged = profile.clone();
    if let Some(ref url) = global.api_url {
        merged.api_url.clone_from(url);
    }
    if let Some(ref url) = global.status_url {
        merged.status_url.clone_from(url);
    }
    if global.insecure {
        merged.insecure = Some(true);
    }
    if global.timeout.is_some() {
        merged.timeout = global.timeout;
    }
    if global.operator.is_some() {
        merged.operator.clone_from(&global.operator);
    }
    // Demo mode never talks to the backend, so skip the keyring lookup.
    if global.demo {
        merged.keyring = false;
    }
    merged
}

/// Translate config file + flags into a `ControllerConfig`.
///
/// An explicitly requested profile must exist. Without one, a missing
/// default profile falls back to localhost defaults.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, config);

    let base = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        None => Profile::default(),
    };

    let profile = overlay(&base, global);
    let mut controller = coop_config::profile_to_controller_config(&profile, &profile_name)?;

    if let Some(ref token) = global.token {
        controller.token = Some(SecretString::from(token.clone()));
    }
    if let Some(secs) = global.timeout {
        controller.timeout = Duration::from_secs(secs);
    }

    Ok(Resolved {
        profile_name,
        controller,
        operator: profile.operator,
    })
}

// ── Services ─────────────────────────────────────────────────────────

fn identity_for(global: &GlobalOpts, operator: Option<&str>) -> Result<SessionIdentity, CliError> {
    if global.demo {
        return Ok(SessionIdentity::signed_in(
            operator.map_or_else(Principal::demo, Principal::from_email),
        ));
    }

    match operator {
        Some(email) if !email.contains('@') => Err(CliError::Validation {
            field: "operator".into(),
            reason: format!("expected an email address, got '{email}'"),
        }),
        Some(email) => Ok(SessionIdentity::signed_in(Principal::from_email(email))),
        None => Ok(SessionIdentity::new()),
    }
}

/// Build live services, or in-memory ones under `--demo`.
pub fn services(global: &GlobalOpts, resolved: &Resolved) -> Result<Services, CliError> {
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(identity_for(global, resolved.operator.as_deref())?);

    if global.demo {
        tracing::debug!("using in-memory demo services");
        return Ok(Services::demo(&resolved.controller, identity));
    }
    Ok(Services::live(&resolved.controller, identity)?)
}
