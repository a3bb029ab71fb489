//! Background purge of expired grants

use super::authorization_code::AuthorizationCodeService;
use super::token_store::TokenStore;
use crate::error::Result;
use crate::repository::{AccessTokenRepository, AuthorizationCodeRepository, RefreshTokenRepository};
use crate::telemetry::metrics::GRANTS_PURGED;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Grants removed by one reaper cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub access_tokens: u64,
    pub refresh_tokens: u64,
    pub authorization_codes: u64,
}

impl PurgeStats {
    pub fn total(&self) -> u64 {
        self.access_tokens + self.refresh_tokens + self.authorization_codes
    }
}

/// Periodically deletes expired tokens and spent authorization codes
pub struct GrantReaper<A, F, C>
where
    A: AccessTokenRepository,
    F: RefreshTokenRepository,
    C: AuthorizationCodeRepository,
{
    tokens: Arc<TokenStore<A, F>>,
    codes: Arc<AuthorizationCodeService<C>>,
    interval: Duration,
}

impl<A, F, C> GrantReaper<A, F, C>
where
    A: AccessTokenRepository,
    F: RefreshTokenRepository,
    C: AuthorizationCodeRepository,
{
    pub fn new(
        tokens: Arc<TokenStore<A, F>>,
        codes: Arc<AuthorizationCodeService<C>>,
        interval: Duration,
    ) -> Self {
        Self {
            tokens,
            codes,
            interval,
        }
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "Starting grant reaper");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "Error while purging expired grants");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Grant reaper stopped");
    }

    /// Run one purge cycle
    pub async fn run_once(&self) -> Result<PurgeStats> {
        let now = Utc::now();
        let ((access_tokens, refresh_tokens), authorization_codes) = tokio::try_join!(
            self.tokens.purge_expired(now),
            self.codes.purge_expired(now)
        )?;

        let stats = PurgeStats {
            access_tokens,
            refresh_tokens,
            authorization_codes,
        };

        counter!(GRANTS_PURGED, "grant" => "access_token").increment(access_tokens);
        counter!(GRANTS_PURGED, "grant" => "refresh_token").increment(refresh_tokens);
        counter!(GRANTS_PURGED, "grant" => "authorization_code").increment(authorization_codes);

        if stats.total() > 0 {
            info!(access_tokens, refresh_tokens, authorization_codes, "Purged expired grants");
        } else {
            debug!("No expired grants found");
        }

        Ok(stats)
    }
}
