//! Console runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the gateway, the
//! session store and the console routes. Nothing reads environment variables while handling
//! a request; binaries call [`ConsoleConfig::from_lookup`] with `std::env::var` and tests call
//! it with a closure over a fixed map.

use crate::constants::{
    DEFAULT_CONSOLE_ADDR, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SERVICE_HOST, DEFAULT_STATE_DIR,
    FIRST_SERVICE_PORT, SESSION_FILENAME,
};
use crate::{ConsoleError, ConsoleResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// The remote microservices the console talks to, in port order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
    Accounts,
    Admins,
    Algorithms,
    DatasetOps,
    Datasets,
    Doctors,
    Models,
    Patients,
    Widgets,
    Utils,
    Tools,
}

impl Service {
    /// Every service in catalogue order.
    pub const ALL: [Service; 11] = [
        Service::Accounts,
        Service::Admins,
        Service::Algorithms,
        Service::DatasetOps,
        Service::Datasets,
        Service::Doctors,
        Service::Models,
        Service::Patients,
        Service::Widgets,
        Service::Utils,
        Service::Tools,
    ];

    /// The services shown on the admin dashboard status table.
    pub const DASHBOARD: [Service; 10] = [
        Service::Accounts,
        Service::Admins,
        Service::Algorithms,
        Service::DatasetOps,
        Service::Datasets,
        Service::Doctors,
        Service::Models,
        Service::Patients,
        Service::Widgets,
        Service::Utils,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Service::Accounts => "Accounts",
            Service::Admins => "Admins",
            Service::Algorithms => "Algorithms",
            Service::DatasetOps => "DatasetOps",
            Service::Datasets => "Datasets",
            Service::Doctors => "Doctors",
            Service::Models => "Models",
            Service::Patients => "Patients",
            Service::Widgets => "Widgets",
            Service::Utils => "Utils",
            Service::Tools => "Tools",
        }
    }

    /// Environment variable overriding this service's base URL.
    pub fn env_key(self) -> &'static str {
        match self {
            Service::Accounts => "HRC_ACCOUNTS_URL",
            Service::Admins => "HRC_ADMINS_URL",
            Service::Algorithms => "HRC_ALGORITHMS_URL",
            Service::DatasetOps => "HRC_DATASET_OPS_URL",
            Service::Datasets => "HRC_DATASETS_URL",
            Service::Doctors => "HRC_DOCTORS_URL",
            Service::Models => "HRC_MODELS_URL",
            Service::Patients => "HRC_PATIENTS_URL",
            Service::Widgets => "HRC_WIDGETS_URL",
            Service::Utils => "HRC_UTILS_URL",
            Service::Tools => "HRC_TOOLS_URL",
        }
    }

    fn default_port(self) -> u16 {
        let index = Service::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default();
        FIRST_SERVICE_PORT + index as u16
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl serde::Serialize for Service {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Service {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::ALL
            .into_iter()
            .find(|service| service.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConsoleError::InvalidInput(format!("unknown service: {s}")))
    }
}

/// Base URL of every remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoints {
    urls: BTreeMap<Service, String>,
}

impl ServiceEndpoints {
    /// Default layout: `http://127.0.0.1:8001` for Accounts through `:8011` for Tools.
    pub fn local_defaults() -> Self {
        let urls = Service::ALL
            .into_iter()
            .map(|service| {
                (
                    service,
                    format!("http://{}:{}", DEFAULT_SERVICE_HOST, service.default_port()),
                )
            })
            .collect();
        Self { urls }
    }

    /// Builds endpoints from defaults, overriding each service whose variable is set.
    pub fn from_lookup<F>(lookup: F) -> ConsoleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut endpoints = Self::local_defaults();
        for service in Service::ALL {
            let value = lookup(service.env_key())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if let Some(url) = value {
                endpoints.set(service, url)?;
            }
        }
        Ok(endpoints)
    }

    /// Points `service` at `url`. Trailing slashes are dropped so paths join cleanly.
    pub fn set(&mut self, service: Service, url: impl Into<String>) -> ConsoleResult<()> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConsoleError::InvalidConfig(format!(
                "{} must be an http(s) URL, got {url:?}",
                service.env_key()
            )));
        }
        self.urls
            .insert(service, url.trim_end_matches('/').to_string());
        Ok(())
    }

    pub fn base_url(&self, service: Service) -> &str {
        self.urls.get(&service).map(String::as_str).unwrap_or_default()
    }

    /// Full URL for `path` on `service`; `path` must start with `/`.
    pub fn url(&self, service: Service, path: &str) -> String {
        format!("{}{}", self.base_url(service), path)
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::local_defaults()
    }
}

/// Console configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    endpoints: ServiceEndpoints,
    probe_timeout: Duration,
    state_dir: PathBuf,
    console_addr: String,
}

impl ConsoleConfig {
    pub fn new(
        endpoints: ServiceEndpoints,
        probe_timeout: Duration,
        state_dir: PathBuf,
        console_addr: String,
    ) -> ConsoleResult<Self> {
        if probe_timeout.is_zero() {
            return Err(ConsoleError::InvalidConfig(
                "probe timeout must be greater than zero".into(),
            ));
        }
        if console_addr.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig(
                "console address cannot be empty".into(),
            ));
        }

        Ok(Self {
            endpoints,
            probe_timeout,
            state_dir,
            console_addr,
        })
    }

    /// Resolves the whole configuration from a variable lookup.
    ///
    /// Reads `HRC_<SERVICE>_URL`, `HRC_PROBE_TIMEOUT_MS`, `HRC_STATE_DIR` and
    /// `HRC_CONSOLE_ADDR`; anything unset falls back to the local defaults.
    pub fn from_lookup<F>(lookup: F) -> ConsoleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoints = ServiceEndpoints::from_lookup(&lookup)?;
        let probe_timeout = probe_timeout_from_value(lookup("HRC_PROBE_TIMEOUT_MS"))?;
        let state_dir = lookup("HRC_STATE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        let console_addr = lookup("HRC_CONSOLE_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONSOLE_ADDR.into());

        Self::new(endpoints, probe_timeout, state_dir, console_addr)
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn session_file(&self) -> PathBuf {
        self.state_dir.join(SESSION_FILENAME)
    }

    pub fn console_addr(&self) -> &str {
        &self.console_addr
    }
}

/// Parse the probe timeout from an optional millisecond value.
///
/// `None` or blank yields the default.
pub fn probe_timeout_from_value(value: Option<String>) -> ConsoleResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let millis = match value {
        Some(v) => v.parse::<u64>().map_err(|_| {
            ConsoleError::InvalidConfig(format!("HRC_PROBE_TIMEOUT_MS is not a number: {v:?}"))
        })?,
        None => DEFAULT_PROBE_TIMEOUT_MS,
    };
    Ok(Duration::from_millis(millis))
}
