//! Plain HTML form login

use cablemon_core::{AuthConfig, AuthStrategyType};
use tracing::{debug, info, warn};

use super::{AuthStrategy, LoginOutcome};
use crate::error::{AuthError, TransportError};
use crate::session::{join_url, Session};

/// Single url-encoded POST of username/password to the configured form target.
///
/// Succeeds on a 2xx/3xx response whose body does not contain the configured
/// login page marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormPlainStrategy;

impl AuthStrategy for FormPlainStrategy {
    fn strategy_type(&self) -> AuthStrategyType {
        AuthStrategyType::FormPlain
    }

    fn login(
        &self,
        session: &mut Session,
        base_url: &str,
        username: &str,
        password: &str,
        config: &AuthConfig,
    ) -> LoginOutcome {
        session.clear_private_key();

        let (Some(user_field), Some(pass_field)) =
            (config.username_field.as_deref(), config.password_field.as_deref())
        else {
            warn!(login_url = %config.login_url, "Form login configured without field names");
            return LoginOutcome::failure(AuthError::Config(
                "Form login requires username and password field names".to_string(),
            ));
        };

        let url = join_url(base_url, &config.login_url);
        debug!(url = %url, username = %username, "Submitting login form");

        let response = match session.post_form(&url, &[(user_field, username), (pass_field, password)]) {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "Form login request failed");
                return LoginOutcome::failure(e.into());
            }
        };

        if !(response.is_success() || response.is_redirect()) {
            warn!(url = %url, status = response.status, "Form login rejected");
            return LoginOutcome::failure(TransportError::Status(response.status).into());
        }

        if let Some(marker) = config.login_page_indicator.as_deref() {
            if response.body.contains(marker) {
                warn!(url = %url, "Login page served again after submit");
                return LoginOutcome::rejected("Login page returned after submit");
            }
        }

        info!(url = %url, status = response.status, "Form login successful");
        LoginOutcome::success(format!("HTTP status {}", response.status))
    }
}
