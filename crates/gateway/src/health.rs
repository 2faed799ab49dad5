//! Service health polling for the admin dashboard.
//!
//! Every service is probed concurrently and independently. A probe that errors or does not
//! answer within the timeout marks its service `Down`; the others are unaffected. Each
//! report carries its own timestamp, so a slow service does not hold back the time shown for
//! a fast one.

use crate::{Gateway, GatewayError, GatewayResult};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use hrc_core::{DEFAULT_PROBE_TIMEOUT_MS, Service};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Something that can tell whether a service is up.
pub trait HealthProbe: Send + Sync {
    fn probe(&self, service: Service) -> impl Future<Output = GatewayResult<()>> + Send;
}

impl HealthProbe for Gateway {
    fn probe(&self, service: Service) -> impl Future<Output = GatewayResult<()>> + Send {
        async move { self.check_health(service).await.map(|_| ()) }
    }
}

impl<P: HealthProbe> HealthProbe for Arc<P> {
    fn probe(&self, service: Service) -> impl Future<Output = GatewayResult<()>> + Send {
        (**self).probe(service)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    Operational,
    Down,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Operational => f.pad("Operational"),
            ServiceStatus::Down => f.pad("Down"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProbeReport {
    pub service: Service,
    pub status: ServiceStatus,
    pub checked_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Why the service is down; `None` when operational.
    pub error: Option<String>,
}

/// One report per polled service, ordered by service.
#[derive(Clone, Debug, Default)]
pub struct StatusTable {
    reports: BTreeMap<Service, ProbeReport>,
}

impl StatusTable {
    pub fn get(&self, service: Service) -> Option<&ProbeReport> {
        self.reports.get(&service)
    }

    pub fn count(&self, status: ServiceStatus) -> usize {
        self.reports
            .values()
            .filter(|report| report.status == status)
            .count()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &ProbeReport> {
        self.reports.values()
    }
}

pub struct HealthPoller<P> {
    probe: P,
    timeout: Duration,
}

impl<P: HealthProbe> HealthPoller<P> {
    pub fn new(probe: P, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    pub fn with_default_timeout(probe: P) -> Self {
        Self::new(probe, Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probes every service in `services` at once and waits for all of them.
    pub async fn poll(&self, services: &[Service]) -> StatusTable {
        let probes = services.iter().map(|&service| self.probe_one(service));
        let reports = join_all(probes).await;

        let up = reports
            .iter()
            .filter(|r| r.status == ServiceStatus::Operational)
            .count();
        tracing::info!("health poll: {up}/{} services operational", reports.len());

        StatusTable {
            reports: reports.into_iter().map(|r| (r.service, r)).collect(),
        }
    }

    async fn probe_one(&self, service: Service) -> ProbeReport {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.probe.probe(service)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                service,
                timeout: self.timeout,
            }),
        };

        let (status, error) = match outcome {
            Ok(()) => (ServiceStatus::Operational, None),
            Err(e) => {
                tracing::warn!("{service} health check failed: {e}");
                (ServiceStatus::Down, Some(e.to_string()))
            }
        };

        ProbeReport {
            service,
            status,
            checked_at: Utc::now(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{endpoints_for, spawn_stub, unused_base_url};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::{HashMap, HashSet};

    /// Sleeps for the service's delay, then fails for services in `down` and succeeds for
    /// the rest.
    #[derive(Default)]
    struct FakeProbe {
        down: HashSet<Service>,
        delays: HashMap<Service, Duration>,
    }

    impl HealthProbe for FakeProbe {
        fn probe(&self, service: Service) -> impl Future<Output = GatewayResult<()>> + Send {
            let down = self.down.contains(&service);
            let delay = self.delays.get(&service).copied();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if down {
                    return Err(GatewayError::Status {
                        service,
                        status: 503,
                        body: "unavailable".into(),
                    });
                }
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn seven_up_three_down() {
        // Models fails first and Utils fails last; the operational services answer in
        // reverse dashboard order in between.
        let mut delays: HashMap<Service, Duration> = Service::DASHBOARD
            .iter()
            .rev()
            .enumerate()
            .map(|(i, service)| (*service, Duration::from_millis(10 + 10 * i as u64)))
            .collect();
        delays.insert(Service::Models, Duration::ZERO);
        delays.insert(Service::Utils, Duration::from_millis(150));
        let probe = FakeProbe {
            down: [Service::Models, Service::Widgets, Service::Utils].into(),
            delays,
        };
        let poller = HealthPoller::new(probe, Duration::from_millis(500));

        let table = poller.poll(&Service::DASHBOARD).await;

        assert_eq!(table.len(), 10);
        assert_eq!(table.count(ServiceStatus::Operational), 7);
        assert_eq!(table.count(ServiceStatus::Down), 3);
        assert!(table.get(Service::Tools).is_none());

        let order: Vec<Service> = table.rows().map(|r| r.service).collect();
        assert_eq!(order, Service::DASHBOARD.to_vec());

        for service in [Service::Models, Service::Widgets, Service::Utils] {
            let row = table.get(service).unwrap();
            assert_eq!(row.status, ServiceStatus::Down, "{service}");
            assert!(row.error.as_deref().unwrap().contains("503"));
        }
        assert!(table.get(Service::Accounts).unwrap().error.is_none());
    }

    #[tokio::test]
    async fn slow_service_times_out_without_blocking_others() {
        let probe = FakeProbe {
            delays: [(Service::Datasets, Duration::from_secs(60))].into(),
            ..FakeProbe::default()
        };
        let poller = HealthPoller::new(probe, Duration::from_millis(50));

        let started = Instant::now();
        let table = poller
            .poll(&[Service::Accounts, Service::Datasets, Service::Patients])
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        let datasets = table.get(Service::Datasets).unwrap();
        assert_eq!(datasets.status, ServiceStatus::Down);
        assert!(datasets.error.as_deref().unwrap().contains("did not answer"));
        assert_eq!(table.count(ServiceStatus::Operational), 2);
    }

    #[tokio::test]
    async fn rows_follow_service_order() {
        let probe = FakeProbe::default();
        let poller = HealthPoller::with_default_timeout(Arc::new(probe));

        let table = poller
            .poll(&[Service::Utils, Service::Accounts, Service::Patients])
            .await;
        let order: Vec<Service> = table.rows().map(|r| r.service).collect();

        assert_eq!(order, vec![Service::Accounts, Service::Patients, Service::Utils]);
    }

    #[tokio::test]
    async fn gateway_probe_hits_health_endpoint() {
        let healthy = Router::new().route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "ok"})) }),
        );
        let up = spawn_stub(healthy).await;
        let down = unused_base_url().await;
        let gateway = Gateway::new(endpoints_for(&[
            (Service::Accounts, &up),
            (Service::Admins, &down),
        ]))
        .unwrap();
        let poller = HealthPoller::new(gateway, Duration::from_secs(2));

        let table = poller.poll(&[Service::Accounts, Service::Admins]).await;

        assert_eq!(
            table.get(Service::Accounts).unwrap().status,
            ServiceStatus::Operational
        );
        assert_eq!(table.get(Service::Admins).unwrap().status, ServiceStatus::Down);
    }
}
