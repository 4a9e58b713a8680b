//! engine::hosts
//!
//! Host administration: add (with validation), edit (with optional remote
//! rewriting) and remove (without cascading to clone records).

use super::errors::GotError;
use super::resolver::Resolver;
use crate::core::types::HostName;
use crate::registry::{CloneRecord, Host, HostUpdate, StoreError};
use crate::secrets::SecretStore;

/// Password change requested alongside an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PasswordChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Result of [`Resolver::edit_host`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    pub host: Host,
    /// Clones whose origin was rewritten, with the new URL.
    pub rewritten: Vec<(CloneRecord, String)>,
    /// Clones skipped because their directory is gone.
    pub skipped: Vec<CloneRecord>,
}

/// Result of [`Resolver::remove_host`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedHost {
    pub host: Host,
    /// Clone records still naming the removed host.
    pub orphans: Vec<CloneRecord>,
}

impl Resolver<'_> {
    /// Register a new host.
    ///
    /// Unless `force` is set the host is validated first; hosts whose type
    /// cannot validate are accepted.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateHost`] if the name is taken
    /// - [`GotError::HostUnreachable`] if validation fails
    pub async fn add_host(
        &mut self,
        host: Host,
        password: Option<String>,
        secrets: &dyn SecretStore,
        force: bool,
    ) -> Result<(), GotError> {
        if let Some(existing) = self.store().hosts().lookup(&host.name) {
            return Err(StoreError::DuplicateHost {
                name: host.name.clone(),
                url: existing.url.clone(),
            }
            .into());
        }
        host.clone_url_template()
            .map_err(|e| GotError::host(&host.name, e.into()))?;

        if let Some(password) = &password {
            secrets.set(&host.password_key(), password)?;
        }

        if !force {
            let validation = match self.factory().create(&host) {
                Ok(adapter) => adapter.validate().await,
                Err(err) => Err(err),
            };
            match validation {
                Ok(()) => log::debug!("{}: validated", host.name),
                Err(err) if err.is_unsupported() => {
                    log::debug!("{}: {}; skipping validation", host.name, err)
                }
                Err(err) => {
                    if password.is_some() {
                        if let Err(cleanup) = secrets.delete(&host.password_key()) {
                            log::warn!("{}: cannot discard password: {}", host.name, cleanup);
                        }
                    }
                    return Err(GotError::HostUnreachable {
                        host: host.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        log::info!("added host {} ({}, {})", host.name, host.kind, host.url);
        self.store_mut().hosts_mut().insert(host)?;
        Ok(())
    }

    /// Update a host's fields in place.
    ///
    /// With `rewrite_remotes`, every existing clone from the host gets its
    /// origin pointed at the URL the updated host now produces.
    pub async fn edit_host(
        &mut self,
        name: &HostName,
        update: &HostUpdate,
        password: PasswordChange,
        secrets: &dyn SecretStore,
        rewrite_remotes: bool,
    ) -> Result<EditReport, GotError> {
        let mut candidate = self
            .store()
            .hosts()
            .lookup(name)
            .cloned()
            .ok_or_else(|| GotError::UnknownHost(name.clone()))?;
        candidate.apply(update);
        candidate
            .clone_url_template()
            .map_err(|e| GotError::host(name, e.into()))?;

        let host = if update.is_empty() {
            candidate
        } else {
            self.store_mut().hosts_mut().edit(name, update)?.clone()
        };
        match password {
            PasswordChange::Keep => {}
            PasswordChange::Set(value) => secrets.set(&host.password_key(), &value)?,
            PasswordChange::Clear => secrets.delete(&host.password_key())?,
        }
        self.forget_adapter(name);

        let mut report = EditReport {
            host: host.clone(),
            rewritten: Vec::new(),
            skipped: Vec::new(),
        };
        if !rewrite_remotes {
            return Ok(report);
        }
        if !update.affects_clone_urls() {
            log::info!("{name}: clone URLs are unchanged; origins left alone");
            return Ok(report);
        }

        let records: Vec<CloneRecord> = self.store().clones().for_host(name).cloned().collect();
        for record in records {
            if !record.exists_on_disk() {
                log::warn!(
                    "{}: {} no longer exists; origin not updated",
                    record.repospec(),
                    record.path.display()
                );
                report.skipped.push(record);
                continue;
            }
            let url = match self.adapter(&host) {
                Ok(adapter) => adapter.resolve_clone_url(&record.name).await,
                Err(err) => Err(err),
            }
            .map_err(|e| GotError::host(name, e))?;
            self.vcs().set_remote_url(&record.path, &url)?;
            log::info!("{}: origin set to {}", record.repospec(), url);
            report.rewritten.push((record, url));
        }
        Ok(report)
    }

    /// Remove a host and its stored password.
    ///
    /// Clone records are left in place and reported as orphans.
    pub fn remove_host(
        &mut self,
        name: &HostName,
        secrets: &dyn SecretStore,
    ) -> Result<RemovedHost, GotError> {
        let host = self.store_mut().hosts_mut().remove(name)?;
        secrets.delete(&host.password_key())?;
        self.forget_adapter(name);
        let orphans: Vec<CloneRecord> = self.store().clones().for_host(name).cloned().collect();
        for orphan in &orphans {
            log::warn!(
                "{} is now orphaned; it still resolves from {}",
                orphan.repospec(),
                orphan.path.display()
            );
        }
        Ok(RemovedHost { host, orphans })
    }
}
