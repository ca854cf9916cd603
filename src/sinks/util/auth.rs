use std::fmt;

use crate::{
    config::{
        BearerToken, ComponentKey,
        secret::{PASSWORD, TOKEN, USERNAME},
    },
    element::{BlockKey, BlockWriter, Element},
    sinks::{BuildError, SinkContext},
};

#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic { user: String, password: String },
    Bearer { token: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"**REDACTED**")
                .finish(),
            Auth::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"**REDACTED**")
                .finish(),
        }
    }
}

/// The `auth` section of an HTTP based sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    sink: ComponentKey,
    auth: Auth,
}

impl AuthConfig {
    /// Chooses a bearer token first, then basic credentials, then nothing.
    ///
    /// An explicit authentication spec is the only source when present: its
    /// token (a secret key or the collector's service account), else its
    /// username and password. Without one, the `token`, `username` and
    /// `password` keys of the output's secret are used. Basic credentials
    /// need both a username and a password.
    pub fn build(cx: &SinkContext<'_>) -> Result<Option<Self>, BuildError> {
        let (token, user, password) = match cx.output.authentication() {
            Some(explicit) => {
                let token = match explicit.token.as_ref() {
                    Some(BearerToken::Secret { secret }) => cx.resolve_value(secret)?,
                    Some(BearerToken::ServiceAccount) => cx
                        .service_account_secret()?
                        .map(|name| format!("SECRET[kubernetes_secret.{}/token]", name)),
                    None => None,
                };
                let user = match explicit.username.as_ref() {
                    Some(reference) => cx.resolve_value(reference)?,
                    None => None,
                };
                let password = match explicit.password.as_ref() {
                    Some(reference) => cx.resolve_value(reference)?,
                    None => None,
                };
                (token, user, password)
            }
            None => (
                cx.output_secret_value(TOKEN),
                cx.output_secret_value(USERNAME),
                cx.output_secret_value(PASSWORD),
            ),
        };
        if let Some(token) = token {
            return Ok(Some(Self::new(&cx.id, Auth::Bearer { token })));
        }

        match (user, password) {
            (Some(user), Some(password)) => {
                Ok(Some(Self::new(&cx.id, Auth::Basic { user, password })))
            }
            (None, None) => Ok(None),
            _ => {
                warn!(
                    message = "Basic auth needs both a username and a password, omitting auth.",
                    output = %cx.output.name,
                );
                Ok(None)
            }
        }
    }

    pub fn new(sink: &ComponentKey, auth: Auth) -> Self {
        Self {
            sink: sink.clone(),
            auth,
        }
    }

    pub const fn auth(&self) -> &Auth {
        &self.auth
    }
}

impl Element for AuthConfig {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "auth",
        }
    }

    fn description(&self) -> Option<&str> {
        Some(match self.auth {
            Auth::Basic { .. } => "Basic Auth Config",
            Auth::Bearer { .. } => "Bearer Auth Config",
        })
    }

    fn render(&self, out: &mut BlockWriter) {
        match &self.auth {
            Auth::Basic { user, password } => {
                out.string("strategy", "basic");
                out.string("user", user);
                out.string("password", password);
            }
            Auth::Bearer { token } => {
                out.string("strategy", "bearer");
                out.string("token", token);
            }
        }
    }
}
