// Credential exchange collaborator
//
// The protocol itself lives in the transport layer; the session store only
// needs the issued token and the tenant profile that goes with it.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Profile returned for an issued token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub company_name: String,
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn exchange(&self, username: &str, password: &str) -> Result<String>;

    /// Fetch the profile of the token's owner
    async fn profile(&self, token: &str) -> Result<Profile>;
}
