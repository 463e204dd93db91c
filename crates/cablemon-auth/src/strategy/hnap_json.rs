//! HNAP challenge-response login over JSON

use cablemon_core::{AuthConfig, AuthStrategyType};
use tracing::warn;

use super::{AuthStrategy, LoginOutcome};
use crate::hnap::{challenge_login, HnapJsonClient};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default)]
pub struct HnapJsonStrategy;

impl AuthStrategy for HnapJsonStrategy {
    fn strategy_type(&self) -> AuthStrategyType {
        AuthStrategyType::HnapJson
    }

    fn login(
        &self,
        session: &mut Session,
        base_url: &str,
        username: &str,
        password: &str,
        config: &AuthConfig,
    ) -> LoginOutcome {
        let client = HnapJsonClient::new(config);
        match challenge_login(&client, session, base_url, username, password) {
            Ok(result) => LoginOutcome::success(result),
            Err(e) => {
                warn!(error = %e, "HNAP JSON login failed");
                LoginOutcome::failure(e)
            }
        }
    }
}
