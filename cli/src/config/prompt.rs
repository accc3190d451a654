//! Interactive collection of missing profile fields

use anyhow::Result;
use dialoguer::{Input, Password};
use secrecy::SecretString;

use super::Profile;

/// Ask for every field the profile does not already carry.
///
/// Values supplied via arguments or the profile file are not asked again.
/// Blank answers are kept blank; downstream resolution applies the defaults
/// (branch) or rejects the run (required fields).
pub fn fill_missing(profile: &mut Profile) -> Result<()> {
    if profile.repo_url.is_none() {
        let url: String = Input::new()
            .with_prompt("Repository URL")
            .interact_text()?;
        profile.repo_url = Some(url);
    }

    if profile.credential.is_none() {
        let token = Password::new()
            .with_prompt("Access token (empty for none)")
            .allow_empty_password(true)
            .interact()?;
        if !token.is_empty() {
            profile.credential = Some(SecretString::from(token));
        }
    }

    if profile.branch.is_none() {
        let branch: String = Input::new()
            .with_prompt(format!("Branch [{}]", super::DEFAULT_BRANCH))
            .allow_empty(true)
            .interact_text()?;
        profile.branch = Some(branch);
    }

    if profile.ssh_user.is_none() {
        let user: String = Input::new()
            .with_prompt("SSH user")
            .default("root".to_string())
            .interact_text()?;
        profile.ssh_user = Some(user);
    }

    if profile.ssh_host.is_none() {
        let host: String = Input::new()
            .with_prompt("SSH host")
            .interact_text()?;
        profile.ssh_host = Some(host);
    }

    if profile.key_path.is_none() {
        let key: String = Input::new()
            .with_prompt("SSH key path")
            .default("~/.ssh/id_rsa".to_string())
            .interact_text()?;
        profile.key_path = Some(key.into());
    }

    if profile.app_port.is_none() {
        let port: u16 = Input::new()
            .with_prompt("Application port")
            .default(8080)
            .interact_text()?;
        profile.app_port = Some(port);
    }

    if profile.proxy.is_none() {
        let proxy: String = Input::new()
            .with_prompt("Configure nginx reverse proxy? [y/N]")
            .allow_empty(true)
            .interact_text()?;
        profile.proxy = Some(proxy);
    }

    Ok(())
}
