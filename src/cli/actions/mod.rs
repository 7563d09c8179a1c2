pub mod account;
pub mod session;

// Internal "interpreter" for `Action`.
mod run;

use secrecy::SecretString;
use serde_json::json;
use std::process::ExitCode;
use tracing::error;

use crate::cli::globals::GlobalArgs;
use crate::warden::{AuthError, IdentityProvider, Role};

#[derive(Debug)]
pub enum Action {
    Register {
        email: String,
        password: SecretString,
        password_repeat: SecretString,
    },
    Login {
        email: String,
        password: SecretString,
        device: String,
    },
    Refresh {
        token: String,
        device: String,
    },
    Logout {
        token: String,
    },
    ProviderLogin {
        provider: IdentityProvider,
        token: SecretString,
        device: String,
    },
    ResetRequest {
        email: String,
    },
    ResetPassword {
        token: SecretString,
        password: SecretString,
    },
    Verify {
        token: SecretString,
        required_roles: Vec<Role>,
    },
}

impl Action {
    /// Run the action and print its JSON result, or a JSON error body.
    pub async fn execute(self, globals: &GlobalArgs) -> ExitCode {
        match run::execute(self, globals).await {
            Ok(output) => {
                println!("{output}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                if let AuthError::Internal(inner) = &err {
                    error!("{inner:#}");
                }
                println!("{}", error_body(&err));
                ExitCode::FAILURE
            }
        }
    }
}

fn error_body(err: &AuthError) -> serde_json::Value {
    json!({
        "code": err.code(),
        "message": err.public_message(),
    })
}
