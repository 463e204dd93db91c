//! Login strategies and the factory that selects them

mod form;
mod hnap_json;
mod hnap_soap;

pub use form::FormPlainStrategy;
pub use hnap_json::HnapJsonStrategy;
pub use hnap_soap::HnapSoapStrategy;

use cablemon_core::{AuthConfig, AuthStrategyType};

use crate::error::AuthError;
use crate::session::Session;

/// Result of one login attempt
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub success: bool,
    /// Device response or failure reason, never a secret
    pub detail: Option<String>,
    /// Why the attempt failed; `None` on success or when skipped
    pub error: Option<AuthError>,
}

impl LoginOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn failure(error: AuthError) -> Self {
        Self {
            success: false,
            detail: Some(error.to_string()),
            error: Some(error),
        }
    }

    /// The device refused the credentials
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::failure(AuthError::Rejected(reason.into()))
    }

    /// No attempt was made (no credentials or no auth configuration)
    pub fn skipped() -> Self {
        Self {
            success: false,
            detail: None,
            error: None,
        }
    }

    /// An attempt was made and did not succeed
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// The attempt failed because the credentials were refused.
    ///
    /// Network failures are not rejections; retrying them is safe.
    pub fn is_rejected(&self) -> bool {
        self.error.as_ref().is_some_and(AuthError::is_auth_failure)
    }
}

/// A login protocol.
///
/// Implementations are stateless; everything an attempt produces lands on the
/// session. On failure no PrivateKey is left behind.
pub trait AuthStrategy: Send + Sync {
    fn strategy_type(&self) -> AuthStrategyType;

    fn login(
        &self,
        session: &mut Session,
        base_url: &str,
        username: &str,
        password: &str,
        config: &AuthConfig,
    ) -> LoginOutcome;
}

static FORM_PLAIN: FormPlainStrategy = FormPlainStrategy;
static HNAP_SESSION: HnapSoapStrategy = HnapSoapStrategy;
static HNAP_JSON: HnapJsonStrategy = HnapJsonStrategy;

/// Shared strategy instance for a strategy type
pub fn strategy_for(strategy: AuthStrategyType) -> &'static dyn AuthStrategy {
    match strategy {
        AuthStrategyType::FormPlain => &FORM_PLAIN,
        AuthStrategyType::HnapSession => &HNAP_SESSION,
        AuthStrategyType::HnapJson => &HNAP_JSON,
    }
}

/// Look up a strategy by identifier (`form_plain`, `hnap_session`, `hnap_json`)
pub fn get_strategy(strategy_id: &str) -> Result<&'static dyn AuthStrategy, AuthError> {
    let strategy: AuthStrategyType = strategy_id.parse()?;
    Ok(strategy_for(strategy))
}
