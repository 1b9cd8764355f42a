use std::collections::BTreeMap;
use std::{env, fs, path::PathBuf};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::security::Security;
use crate::{FiledockError, Result};

pub const API_HOST: &str = "https://api.filedock.io";
pub const UPLOAD_HOST: &str = "https://upload.filedock.io";
pub const CDN_HOST: &str = "https://cdn.filedock.io";

/// SDK initialization options.
///
/// Every field may be omitted; `ClientOptions::default()` yields a client
/// talking to the default hosts with no security attached.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientOptions {
    /// Signed policy/signature pair attached to every secured operation.
    pub security: Option<Security>,
    /// Custom domain. Rewrites all three service hosts to
    /// `api.<cname>`, `upload.<cname>` and `cdn.<cname>`.
    pub cname: Option<String>,
    /// Persist security credentials across client instances.
    pub session_cache: bool,
}

/// Resolved per-client state: apikey, hosts and optional security.
#[derive(Debug, Clone)]
pub struct Session {
    pub apikey: String,
    pub security: Option<Security>,
    pub api_host: Url,
    pub upload_host: Url,
    pub cdn_host: Url,
}

impl Session {
    pub fn new(apikey: &str, options: &ClientOptions) -> Result<Self> {
        if apikey.trim().is_empty() {
            return Err(FiledockError::InvalidOption(
                "an apikey is required".to_owned(),
            ));
        }

        let (api, upload, cdn) = match &options.cname {
            Some(cname) => {
                trace!("Resolving service hosts against cname {}", cname);
                (
                    format!("https://api.{}", cname),
                    format!("https://upload.{}", cname),
                    format!("https://cdn.{}", cname),
                )
            }
            None => (
                API_HOST.to_owned(),
                UPLOAD_HOST.to_owned(),
                CDN_HOST.to_owned(),
            ),
        };

        Ok(Self {
            apikey: apikey.to_owned(),
            security: options.security.clone(),
            api_host: Url::parse(&api)?,
            upload_host: Url::parse(&upload)?,
            cdn_host: Url::parse(&cdn)?,
        })
    }

    /// Query parameters every authenticated request carries.
    pub(crate) fn auth_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("key", self.apikey.clone())];
        if let Some(security) = &self.security {
            pairs.push(("policy", security.policy.clone()));
            pairs.push(("signature", security.signature.clone()));
        }
        pairs
    }
}

/// On-disk cache of security credentials, keyed by apikey.
///
/// Persisted to TOML under the user's platform config directory:
/// - Linux: $XDG_CONFIG_HOME/filedock/sessions.toml or
///   $HOME/.config/filedock/sessions.toml
/// - macOS: $HOME/Library/Application Support/filedock/sessions.toml
/// - Windows: %APPDATA%\filedock\sessions.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionCache {
    pub sessions: BTreeMap<String, Security>,
}

impl SessionCache {
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = env::var("APPDATA") {
                return Ok(PathBuf::from(appdata).join("filedock"));
            }
            return Err(FiledockError::InvalidOption(
                "unable to determine config directory (missing APPDATA)"
                    .to_owned(),
            ));
        }

        #[cfg(target_os = "macos")]
        {
            if let Ok(home) = env::var("HOME") {
                return Ok(PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("filedock"));
            }
            return Err(FiledockError::InvalidOption(
                "unable to determine config directory (missing HOME)"
                    .to_owned(),
            ));
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let base = if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg)
            } else if let Ok(home) = env::var("HOME") {
                PathBuf::from(home).join(".config")
            } else {
                return Err(FiledockError::InvalidOption(
                    "unable to determine config directory (missing XDG_CONFIG_HOME/HOME)"
                        .to_owned(),
                ));
            };
            Ok(base.join("filedock"))
        }
    }

    pub fn cache_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("sessions.toml"))
    }

    /// Load the cache from disk; a missing file yields an empty cache.
    pub fn load() -> Result<Self> {
        let file = Self::cache_file()?;
        if !file.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&file)?;
        let cache: SessionCache = toml::from_str(&content)?;
        trace!("Loaded {} cached session(s)", cache.sessions.len());
        Ok(cache)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(Self::cache_file()?, content)?;
        Ok(())
    }

    pub fn get(&self, apikey: &str) -> Option<&Security> {
        self.sessions.get(apikey)
    }

    pub fn insert(&mut self, apikey: &str, security: Security) {
        self.sessions.insert(apikey.to_owned(), security);
    }

    /// Drop the entry for `apikey` and persist. Returns whether an entry
    /// was present.
    pub fn remove(&mut self, apikey: &str) -> Result<bool> {
        let removed = self.sessions.remove(apikey).is_some();
        if removed {
            debug!("Removed cached session for apikey {}", apikey);
            self.save()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hosts() {
        let session =
            Session::new("A5kYm2PqR", &ClientOptions::default()).unwrap();
        assert_eq!(session.api_host.as_str(), "https://api.filedock.io/");
        assert_eq!(session.upload_host.as_str(), "https://upload.filedock.io/");
        assert_eq!(session.cdn_host.as_str(), "https://cdn.filedock.io/");
    }

    #[test]
    fn cname_rewrites_all_hosts() {
        let options = ClientOptions {
            cname: Some("files.example.com".to_owned()),
            ..Default::default()
        };
        let session = Session::new("A5kYm2PqR", &options).unwrap();
        assert_eq!(session.api_host.as_str(), "https://api.files.example.com/");
        assert_eq!(
            session.upload_host.as_str(),
            "https://upload.files.example.com/"
        );
        assert_eq!(session.cdn_host.as_str(), "https://cdn.files.example.com/");
    }

    #[test]
    fn empty_apikey_is_rejected() {
        assert!(Session::new("", &ClientOptions::default()).is_err());
        assert!(Session::new("   ", &ClientOptions::default()).is_err());
    }

    #[test]
    fn auth_pairs_include_security_when_present() {
        let mut options = ClientOptions::default();
        options.security = Some(Security {
            policy: "cG9saWN5".to_owned(),
            signature: "deadbeef".to_owned(),
        });
        let session = Session::new("A5kYm2PqR", &options).unwrap();
        let pairs = session.auth_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("key", "A5kYm2PqR".to_owned()));
        assert_eq!(pairs[1].0, "policy");
        assert_eq!(pairs[2].0, "signature");
    }
}
