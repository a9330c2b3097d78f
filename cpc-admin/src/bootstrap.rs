//! First-run admin provisioning
//!
//! With an empty `admins` collection nobody can log in, so the configured
//! `[bootstrap_admin]` is created as an unrestricted (A1) admin.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use cpc_common::config::BootstrapAdminConfig;
use cpc_common::identity::IdentityError;
use cpc_common::models::to_document;
use cpc_common::store::Collection;
use cpc_common::validation::AdminForm;
use tracing::{info, warn};

use crate::signup::{provision_admin, ProvisionError};
use crate::AppState;

/// Create the bootstrap admin if no admin exists; returns its id when created
pub async fn ensure_bootstrap_admin(
    state: &AppState,
    config: Option<&BootstrapAdminConfig>,
) -> Result<Option<String>> {
    let admins = state
        .store
        .list_all(Collection::Admins)
        .await
        .context("Failed to list admins")?;
    if !admins.is_empty() {
        return Ok(None);
    }

    let Some(config) = config else {
        warn!("No admins exist and no [bootstrap_admin] is configured; nobody can log in");
        return Ok(None);
    };

    let form = AdminForm {
        first_name: config.first_name.clone(),
        middle_name: String::new(),
        last_name: config.last_name.clone(),
        email: config.email.clone(),
        phone: config.phone.clone().unwrap_or_else(|| "0000000000".to_string()),
        username: config.username.clone(),
        admin_type: "A1".to_string(),
        department: config.department.clone(),
    };
    let draft = form
        .validate()
        .map_err(|errors| anyhow!("Invalid [bootstrap_admin] configuration: {}", errors))?;

    let uid = match provision_admin(
        state.identity.as_ref(),
        state.store.as_ref(),
        draft.clone(),
        &config.password,
    )
    .await
    {
        Ok(uid) => uid,
        // Credential survived an earlier admin record deletion
        Err(ProvisionError::Identity(IdentityError::EmailInUse)) => {
            let uid = state
                .identity
                .verify_credential(&config.email, &config.password)
                .await
                .map_err(|e| anyhow!("Bootstrap admin credential check failed: {}", e))?
                .ok_or_else(|| {
                    anyhow!("Bootstrap admin email is registered with a different password")
                })?;
            let profile = draft.into_profile(uid.clone(), Utc::now());
            state
                .store
                .insert_with_id(Collection::Admins, &uid, to_document(&profile)?)
                .await
                .context("Failed to write bootstrap admin profile")?;
            uid
        }
        Err(e) => return Err(anyhow!("Failed to create bootstrap admin: {}", e)),
    };

    info!(admin_id = %uid, username = %config.username, "Provisioned bootstrap admin");
    Ok(Some(uid))
}
