//! HNAP request signing and the XML/SOAP and JSON request clients
//!
//! Every HNAP request carries two headers:
//! - `SOAPAction: "{namespace}{action}"` (quotes included)
//! - `HNAP_AUTH: HMAC_MD5(key, timestamp + SOAPAction) + " " + timestamp`
//!
//! where `key` is the session PrivateKey, or `withoutloginkey` before login.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use cablemon_core::{derive_login_password, derive_private_key, keyed_hash, AuthConfig};
use chrono::Utc;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::session::{join_url, Session};
use crate::transport::{HttpRequest, RequestBody};

/// Signing key used before a PrivateKey exists
pub const WITHOUT_LOGIN_KEY: &str = "withoutloginkey";

/// Action used for both login steps
pub const LOGIN_ACTION: &str = "Login";

/// Batched action understood by JSON firmware
pub const MULTIPLE_ACTION: &str = "GetMultipleHNAPs";

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Flattened fields of one `{action}Response` object
pub type HnapFields = BTreeMap<String, String>;

/// Builds `HNAP_AUTH` header values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnapSigner {
    modulus: u64,
}

impl HnapSigner {
    pub const fn new(modulus: u64) -> Self {
        Self { modulus }
    }

    /// Current wall-clock milliseconds reduced by the firmware's modulus
    pub fn timestamp(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        now % self.modulus
    }

    /// Quoted SOAPAction URI
    pub fn soap_action(namespace: &str, action: &str) -> String {
        format!("\"{}{}\"", namespace, action)
    }

    pub fn sign(&self, private_key: Option<&str>, namespace: &str, action: &str) -> String {
        self.sign_at(private_key, namespace, action, self.timestamp())
    }

    pub fn sign_at(
        &self,
        private_key: Option<&str>,
        namespace: &str,
        action: &str,
        timestamp: u64,
    ) -> String {
        let key = private_key.unwrap_or(WITHOUT_LOGIN_KEY);
        let message = format!("{}{}", timestamp, Self::soap_action(namespace, action));
        format!("{} {}", keyed_hash(key, &message), timestamp)
    }
}

/// A request client for one HNAP wire encoding
pub trait HnapClient: Send + Sync {
    /// Invoke one action and return the fields of `{action}Response`
    fn call_single(
        &self,
        session: &mut Session,
        base_url: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<HnapFields, AuthError>;

    /// Invoke several parameterless actions, keyed by action name
    fn call_multiple(
        &self,
        session: &mut Session,
        base_url: &str,
        actions: &[&str],
    ) -> Result<BTreeMap<String, HnapFields>, AuthError>;
}

/// Endpoint settings shared by both encodings
#[derive(Debug, Clone)]
struct HnapTarget {
    endpoint: String,
    namespace: String,
    session_timeout_indicator: Option<String>,
}

impl HnapTarget {
    fn from_config(config: &AuthConfig) -> Self {
        Self {
            endpoint: config.endpoint().to_string(),
            namespace: config.namespace().to_string(),
            session_timeout_indicator: config.session_timeout_indicator.clone(),
        }
    }

    /// POST a signed HNAP request and return the response body
    fn post(
        &self,
        signer: &HnapSigner,
        session: &mut Session,
        base_url: &str,
        action: &str,
        content_type: &str,
        body: String,
    ) -> Result<String, AuthError> {
        let url = join_url(base_url, &self.endpoint);
        let auth = signer.sign(session.private_key(), &self.namespace, action);
        let request = HttpRequest::post(&url, RequestBody::Text(body))
            .with_header("SOAPAction", &HnapSigner::soap_action(&self.namespace, action))
            .with_header("HNAP_AUTH", &auth)
            .with_header("Content-Type", content_type);

        debug!(action = %action, url = %url, "Sending HNAP request");
        let response = session.send(request)?.error_for_status()?;
        if action == LOGIN_ACTION && response.status != 200 {
            return Err(AuthError::Protocol(format!(
                "{} returned HTTP status {}",
                action, response.status
            )));
        }

        if let Some(indicator) = &self.session_timeout_indicator {
            if response.body.contains(indicator.as_str()) {
                return Err(AuthError::Rejected(format!(
                    "{} returned session timeout marker {}",
                    action, indicator
                )));
            }
        }
        Ok(response.body)
    }
}

/// HNAP over XML/SOAP envelopes; one HTTP request per action
#[derive(Debug, Clone)]
pub struct HnapSoapClient {
    target: HnapTarget,
    signer: HnapSigner,
}

impl HnapSoapClient {
    pub const TIMESTAMP_MODULUS: u64 = 2_000_000_000_000;

    pub fn new(config: &AuthConfig) -> Self {
        Self {
            target: HnapTarget::from_config(config),
            signer: HnapSigner::new(Self::TIMESTAMP_MODULUS),
        }
    }

    fn envelope(&self, action: &str, params: &[(&str, &str)]) -> String {
        let mut inner = String::new();
        for (name, value) in params {
            let _ = write!(inner, "<{name}>{}</{name}>", escape(*value));
        }
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>",
                "<soap:Envelope xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
                "xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" xmlns:soap=\"{envelope}\">",
                "<soap:Body><{action} xmlns=\"{namespace}\">{inner}</{action}></soap:Body>",
                "</soap:Envelope>"
            ),
            envelope = SOAP_ENVELOPE_NS,
            action = action,
            namespace = self.target.namespace,
            inner = inner,
        )
    }
}

/// Collect the direct children of `<{action}Response>` as text fields
fn parse_soap_response(xml: &str, action: &str) -> Result<HnapFields, AuthError> {
    let wanted = format!("{}Response", action);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = HnapFields::new();
    let mut depth = 0usize;
    let mut response_depth: Option<usize> = None;
    let mut current: Option<String> = None;
    let mut found = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match response_depth {
                    None if name == wanted => {
                        response_depth = Some(depth);
                        found = true;
                    }
                    Some(d) if depth == d + 1 => {
                        fields.insert(name.clone(), String::new());
                        current = Some(name);
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match response_depth {
                    None if name == wanted => found = true,
                    Some(d) if depth == d => {
                        fields.insert(name, String::new());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(name) = &current {
                    let text = t
                        .unescape()
                        .map_err(|e| AuthError::Protocol(format!("Invalid XML text: {}", e)))?;
                    fields.insert(name.clone(), text.into_owned());
                }
            }
            Ok(Event::End(_)) => {
                if let Some(d) = response_depth {
                    if depth == d + 1 {
                        current = None;
                    } else if depth == d {
                        break;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AuthError::Protocol(format!(
                    "Malformed XML in {}: {}",
                    wanted, e
                )))
            }
            _ => {}
        }
    }

    if !found {
        return Err(AuthError::Protocol(format!("Response has no {}", wanted)));
    }
    Ok(fields)
}

impl HnapClient for HnapSoapClient {
    fn call_single(
        &self,
        session: &mut Session,
        base_url: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<HnapFields, AuthError> {
        let body = self.envelope(action, params);
        let xml = self.target.post(
            &self.signer,
            session,
            base_url,
            action,
            "text/xml; charset=utf-8",
            body,
        )?;
        parse_soap_response(&xml, action)
    }

    fn call_multiple(
        &self,
        session: &mut Session,
        base_url: &str,
        actions: &[&str],
    ) -> Result<BTreeMap<String, HnapFields>, AuthError> {
        let mut merged = BTreeMap::new();
        for action in actions {
            match self.call_single(session, base_url, action, &[]) {
                Ok(fields) => {
                    merged.insert(action.to_string(), fields);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(action = %action, error = %e, "HNAP action failed, continuing");
                    merged.insert(action.to_string(), HnapFields::new());
                }
            }
        }
        Ok(merged)
    }
}

/// HNAP over JSON bodies; batches via `GetMultipleHNAPs`
#[derive(Debug, Clone)]
pub struct HnapJsonClient {
    target: HnapTarget,
    signer: HnapSigner,
}

impl HnapJsonClient {
    pub const TIMESTAMP_MODULUS: u64 = 2_000_000_000_000;

    pub fn new(config: &AuthConfig) -> Self {
        Self {
            target: HnapTarget::from_config(config),
            signer: HnapSigner::new(Self::TIMESTAMP_MODULUS),
        }
    }

    fn post_json(
        &self,
        session: &mut Session,
        base_url: &str,
        action: &str,
        body: Value,
    ) -> Result<Value, AuthError> {
        let text = self.target.post(
            &self.signer,
            session,
            base_url,
            action,
            "application/json",
            body.to_string(),
        )?;
        serde_json::from_str(&text)
            .map_err(|e| AuthError::Protocol(format!("{} response is not JSON: {}", action, e)))
    }
}

/// Flatten a JSON response object into string fields
fn flatten_fields(value: &Value) -> HnapFields {
    let mut fields = HnapFields::new();
    if let Value::Object(map) = value {
        for (key, v) in map {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            fields.insert(key.clone(), text);
        }
    }
    fields
}

impl HnapClient for HnapJsonClient {
    fn call_single(
        &self,
        session: &mut Session,
        base_url: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<HnapFields, AuthError> {
        let params: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let mut request = Map::new();
        request.insert(action.to_string(), Value::Object(params));

        let response = self.post_json(session, base_url, action, Value::Object(request))?;
        let key = format!("{}Response", action);
        response
            .get(&key)
            .map(flatten_fields)
            .ok_or_else(|| AuthError::Protocol(format!("Response has no {}", key)))
    }

    fn call_multiple(
        &self,
        session: &mut Session,
        base_url: &str,
        actions: &[&str],
    ) -> Result<BTreeMap<String, HnapFields>, AuthError> {
        let batch: Map<String, Value> = actions
            .iter()
            .map(|a| (a.to_string(), Value::Object(Map::new())))
            .collect();
        let mut request = Map::new();
        request.insert(MULTIPLE_ACTION.to_string(), Value::Object(batch));

        debug!(actions = ?actions, "Sending batched HNAP request");
        let response = self.post_json(session, base_url, MULTIPLE_ACTION, Value::Object(request))?;
        let outer_key = format!("{}Response", MULTIPLE_ACTION);
        let outer = response
            .get(&outer_key)
            .ok_or_else(|| AuthError::Protocol(format!("Response has no {}", outer_key)))?;

        let mut merged = BTreeMap::new();
        for action in actions {
            match outer.get(format!("{}Response", action)) {
                Some(value) => {
                    merged.insert(action.to_string(), flatten_fields(value));
                }
                None => warn!(action = %action, "Batched response missing action"),
            }
        }
        Ok(merged)
    }
}

/// One-time challenge material from the first login step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub challenge: String,
    pub cookie: String,
    pub public_key: String,
}

impl Challenge {
    pub fn from_fields(fields: &HnapFields) -> Result<Self, AuthError> {
        let take = |key: &str| -> Result<String, AuthError> {
            fields
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| AuthError::Protocol(format!("Challenge response missing {}", key)))
        };
        Ok(Self {
            challenge: take("Challenge")?,
            cookie: take("Cookie")?,
            public_key: take("PublicKey")?,
        })
    }
}

fn login_fields<'a>(action: &'a str, username: &'a str, login_password: &'a str) -> [(&'a str, &'a str); 4] {
    [
        ("Action", action),
        ("Username", username),
        ("LoginPassword", login_password),
        ("Captcha", ""),
    ]
}

/// Run the two-step HNAP challenge-response login.
///
/// Returns the `LoginResult` on success. The session PrivateKey is cleared
/// first and only left set when the device accepts the login.
pub fn challenge_login(
    client: &dyn HnapClient,
    session: &mut Session,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    session.clear_private_key();
    session.remove_cookie("PrivateKey");

    let result = exchange(client, session, base_url, username, password);
    if result.is_err() {
        session.clear_private_key();
        session.remove_cookie("PrivateKey");
    }
    result
}

fn exchange(
    client: &dyn HnapClient,
    session: &mut Session,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let fields = client.call_single(session, base_url, LOGIN_ACTION, &login_fields("request", username, ""))?;
    let challenge = Challenge::from_fields(&fields)?;
    debug!(
        challenge = %challenge.challenge.chars().take(8).collect::<String>(),
        "Received HNAP challenge"
    );

    session.set_cookie("uid", &challenge.cookie);
    let private_key = derive_private_key(&challenge.public_key, password, &challenge.challenge);
    let login_password = derive_login_password(&private_key, &challenge.challenge);
    session.set_private_key(private_key);

    let fields = client.call_single(
        session,
        base_url,
        LOGIN_ACTION,
        &login_fields("login", username, &login_password),
    )?;
    let login_result = fields.get("LoginResult").cloned().unwrap_or_default();

    if login_result.eq_ignore_ascii_case("OK") || login_result.eq_ignore_ascii_case("SUCCESS") {
        if let Some(key) = session.private_key().map(str::to_string) {
            session.set_cookie("PrivateKey", &key);
        }
        info!(result = %login_result, "HNAP login successful");
        Ok(login_result)
    } else {
        Err(AuthError::Rejected(format!("LoginResult={}", login_result)))
    }
}
