use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::notify::{CompletionNotice, CompletionNotifier, LogNotifier};
use super::state::*;
use crate::breach::{self, BreachLookup};
use crate::config::ReconConfig;
use crate::db::Database;
use crate::errors::ReconError;
use crate::intel::{self, IntelScope, IntelligenceOrchestrator, LocalFallbackProvider};
use crate::models::{IntelligenceData, RiskAssessment, ScanJob, ScanResult, ScanStatus, ScanType, SubdomainFinding};
use crate::probes::{
    DirectoryProber, NetworkProbe, PathDiscovery, PortProbe, SubdomainDiscovery, SubdomainResolver, TlsInspector,
    TlsProbe,
};
use crate::risk;
use crate::utils::truncation::truncate_error;

/// Runs the requested stages of one scan and owns its state transitions.
pub struct ScanCoordinator {
    db: Database,
    intel: IntelligenceOrchestrator,
    ports: Arc<dyn PortProbe>,
    tls: Arc<dyn TlsProbe>,
    subdomains: Arc<dyn SubdomainDiscovery>,
    paths: Arc<dyn PathDiscovery>,
    breaches: Arc<dyn BreachLookup>,
    notifier: Arc<dyn CompletionNotifier>,
}

/// Per-scan working state. Intelligence is fetched lazily, at most once.
struct ScanRun<'a> {
    job: &'a ScanJob,
    scan: ScanResult,
    intel: Option<IntelligenceData>,
    assessment: Option<RiskAssessment>,
    events: Option<&'a mpsc::UnboundedSender<ScanEvent>>,
}

impl ScanRun<'_> {
    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = self.events {
            let _ = tx.send(event);
        }
    }
}

impl ScanCoordinator {
    pub fn new(
        db: Database,
        intel: IntelligenceOrchestrator,
        ports: Arc<dyn PortProbe>,
        tls: Arc<dyn TlsProbe>,
        subdomains: Arc<dyn SubdomainDiscovery>,
        paths: Arc<dyn PathDiscovery>,
        breaches: Arc<dyn BreachLookup>,
    ) -> Self {
        Self {
            db,
            intel,
            ports,
            tls,
            subdomains,
            paths,
            breaches,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Wire the live scanners, providers and collaborators described by `config`.
    pub fn from_config(config: &ReconConfig, db: Database) -> Result<Self, ReconError> {
        let scan = &config.scan;
        let ports: Arc<dyn PortProbe> = Arc::new(NetworkProbe::new(scan.port_timeout()));
        let resolver: Arc<dyn SubdomainDiscovery> = Arc::new(SubdomainResolver::new(scan)?);
        let fallback = Arc::new(LocalFallbackProvider::new(ports.clone(), resolver.clone()));

        let mut orchestrator = IntelligenceOrchestrator::new(intel::providers_from_config(config), fallback)
            .with_retry_policy(config.retry.policy())
            .with_ttl(config.cache.ttl());
        if config.cache.enabled {
            orchestrator = orchestrator.with_cache(Arc::new(db.clone()));
        }

        Ok(Self::new(
            db,
            orchestrator,
            ports,
            Arc::new(TlsInspector::new(scan.tls_timeout())?),
            resolver,
            Arc::new(DirectoryProber::new(scan)?),
            breach::from_config(&config.breach)?,
        )
        .with_notifier(super::notify::from_config(&config.notifications)?))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run the job's scan to a terminal state.
    ///
    /// `Err` means the scan could not be started at all (missing row, database
    /// down); once it is `running`, every failure is recorded on the scan and
    /// reported as [`ScanOutcome::Failed`].
    pub async fn run(
        &self,
        job: &ScanJob,
        events: Option<&mpsc::UnboundedSender<ScanEvent>>,
    ) -> Result<ScanOutcome, ReconError> {
        match self.db.start_scan(&job.scan_id)? {
            ScanStatus::Pending => {}
            ScanStatus::Running => info!(scan_id = %job.scan_id, domain = %job.domain, "Resuming interrupted scan"),
            terminal => {
                info!(scan_id = %job.scan_id, status = %terminal, "Scan already finished, skipping");
                return Ok(ScanOutcome::Skipped(terminal));
            }
        }

        info!(scan_id = %job.scan_id, domain = %job.domain, types = job.types.len(), "Scan started");
        if let Some(tx) = events {
            let _ = tx.send(ScanEvent::Progress { percent: START_PROGRESS });
        }

        match self.execute(job, events).await {
            Ok(report) => {
                let notice = CompletionNotice {
                    tenant_id: job.tenant_id.clone(),
                    scan_type: job.types.iter().map(ScanType::as_str).collect::<Vec<_>>().join(","),
                    scan_result_id: job.scan_id.clone(),
                };
                if let Err(e) = self.notifier.notify(&notice).await {
                    warn!(scan_id = %job.scan_id, error = %e, "Completion notification failed");
                }
                if let Some(tx) = events {
                    let _ = tx.send(ScanEvent::Progress { percent: FINISHED_PROGRESS });
                }
                info!(scan_id = %job.scan_id, domain = %job.domain, "Scan completed");
                Ok(ScanOutcome::Completed(Box::new(report)))
            }
            Err(e) => {
                let message = truncate_error(&e.to_string());
                warn!(scan_id = %job.scan_id, domain = %job.domain, error = %message, "Scan failed");
                if let Err(db_err) = self.db.fail_scan(&job.scan_id, &message) {
                    warn!(scan_id = %job.scan_id, error = %db_err, "Could not record scan failure");
                }
                Ok(ScanOutcome::Failed(message))
            }
        }
    }

    async fn execute(
        &self,
        job: &ScanJob,
        events: Option<&mpsc::UnboundedSender<ScanEvent>>,
    ) -> Result<ScanReport, ReconError> {
        let scan = self
            .db
            .get_scan_result(&job.scan_id)?
            .ok_or_else(|| ReconError::Internal(format!("Scan {} disappeared", job.scan_id)))?;

        let mut run = ScanRun { job, scan, intel: None, assessment: None, events };

        for stage in ScanType::ALL.into_iter().filter(|t| job.types.contains(t)) {
            run.emit(ScanEvent::StageStarted { stage });
            match self.run_stage(stage, &mut run).await {
                Ok(()) => {
                    info!(scan_id = %job.scan_id, stage = %stage, "Stage finished");
                    run.emit(ScanEvent::StageCompleted { stage });
                }
                Err(e) => {
                    warn!(scan_id = %job.scan_id, stage = %stage, error = %e, "Stage failed, continuing");
                    run.emit(ScanEvent::StageFailed { stage, error: e.to_string() });
                }
            }
            if let Some(percent) = stage_milestone(stage) {
                run.emit(ScanEvent::Progress { percent });
            }
        }

        if !self.db.complete_scan(&run.scan)? {
            return Err(ReconError::Internal(format!("Scan {} was no longer running", job.scan_id)));
        }
        run.scan.status = ScanStatus::Completed;
        Ok(ScanReport { scan: run.scan, assessment: run.assessment })
    }

    async fn run_stage(&self, stage: ScanType, run: &mut ScanRun<'_>) -> Result<(), ReconError> {
        let job = run.job;
        let domain = job.domain.as_str();
        match stage {
            ScanType::PortScan => {
                let intel = self.intelligence(run).await;
                let ports = intel.ports.clone();
                let vulns = intel.vulnerabilities.clone().unwrap_or_default();
                run.scan.set_ports(ports);
                run.scan.outdated_software = risk::detect_outdated(&run.scan.ports);
                run.scan.vulnerabilities = vulns.iter().map(risk::vulnerability_finding).collect();
            }
            ScanType::SslCheck => {
                run.scan.tls_finding = Some(self.tls.inspect(domain).await);
            }
            ScanType::SubdomainEnum => {
                let from_intel = self.intelligence(run).await.subdomains.clone();
                let subdomains = if from_intel.is_empty() {
                    self.subdomains.discover_subdomains(domain).await
                } else {
                    self.verify_subdomains(from_intel).await
                };
                run.scan.set_subdomains(subdomains);
            }
            ScanType::DirectoryScan => {
                run.scan.discovered_paths = self.paths.discover_paths(domain).await;
            }
            ScanType::BreachCheck => {
                let tenant = job.tenant_id.as_str();
                for email in self.db.monitored_emails(tenant)? {
                    for record in self.breaches.lookup(&email).await {
                        self.db.upsert_breach_record(tenant, &record)?;
                    }
                }
                return Ok(());
            }
            ScanType::RiskCalc => {
                let breaches = self.db.breach_records_for_tenant(&job.tenant_id)?;
                let assessment = risk::assess(&run.scan, &breaches);
                self.db.insert_risk_assessment(&run.scan.id, &job.tenant_id, &assessment)?;
                run.assessment = Some(assessment);
                return Ok(());
            }
        }
        if !self.db.save_scan_progress(&run.scan)? {
            return Err(ReconError::Internal(format!("Scan {} is not running", run.scan.id)));
        }
        Ok(())
    }

    /// Without a port-scan there is no point paying for the fallback port sweep.
    async fn intelligence<'r>(&self, run: &'r mut ScanRun<'_>) -> &'r IntelligenceData {
        if run.intel.is_none() {
            let scope = if run.job.types.contains(&ScanType::PortScan) {
                IntelScope::Full
            } else {
                IntelScope::Subdomains
            };
            run.intel = Some(self.intel.gather_scoped(&run.job.domain, scope).await);
        }
        run.intel.get_or_insert_with(IntelligenceData::default)
    }

    /// Names without an address are unverified candidates; they only count as
    /// active once they resolve.
    async fn verify_subdomains(&self, found: Vec<SubdomainFinding>) -> Vec<SubdomainFinding> {
        let (mut resolved, candidates): (Vec<_>, Vec<_>) = found.into_iter().partition(|s| s.ip.is_some());
        if !candidates.is_empty() {
            let names: Vec<String> = candidates.into_iter().map(|s| s.subdomain).collect();
            resolved.extend(self.subdomains.resolve_names(&names).await);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::errors::ProviderError;
    use crate::intel::IntelligenceProvider;
    use crate::models::{
        BreachRecord, BreachSource, DiscoveredPath, NewScanJob, PortFinding, Severity, SubdomainStatus, TlsFinding,
    };

    #[derive(Default)]
    struct Probes {
        port_calls: AtomicUsize,
        tls_calls: AtomicUsize,
        subdomain_calls: AtomicUsize,
        path_calls: AtomicUsize,
    }

    struct Mock(Arc<Probes>);

    #[async_trait]
    impl PortProbe for Mock {
        async fn scan_ports(&self, _host: &str) -> Vec<PortFinding> {
            self.0.port_calls.fetch_add(1, Ordering::SeqCst);
            vec![PortFinding::open(22, "ssh")]
        }
    }

    #[async_trait]
    impl TlsProbe for Mock {
        async fn inspect(&self, domain: &str) -> TlsFinding {
            self.0.tls_calls.fetch_add(1, Ordering::SeqCst);
            TlsFinding::new(domain, "Test CA".into(), Some(domain.into()), None, chrono::Utc::now(), 90, vec![])
        }
    }

    #[async_trait]
    impl SubdomainDiscovery for Mock {
        async fn discover_subdomains(&self, domain: &str) -> Vec<SubdomainFinding> {
            self.0.subdomain_calls.fetch_add(1, Ordering::SeqCst);
            vec![SubdomainFinding::active(&format!("www.{}", domain), "192.0.2.1".into())]
        }

        async fn resolve_names(&self, names: &[String]) -> Vec<SubdomainFinding> {
            names
                .iter()
                .map(|name| {
                    if name.starts_with("ghost.") {
                        SubdomainFinding::inactive(name)
                    } else {
                        SubdomainFinding::active(name, "192.0.2.10".into())
                    }
                })
                .collect()
        }
    }

    #[async_trait]
    impl PathDiscovery for Mock {
        async fn discover_paths(&self, _domain: &str) -> Vec<DiscoveredPath> {
            self.0.path_calls.fetch_add(1, Ordering::SeqCst);
            vec![DiscoveredPath { path: "/.env".into(), status: 200, kind: "sensitive-file".into() }]
        }
    }

    struct OneBreach;

    #[async_trait]
    impl BreachLookup for OneBreach {
        async fn lookup(&self, email: &str) -> Vec<BreachRecord> {
            vec![BreachRecord {
                email: email.to_string(),
                breach_name: "Adobe".into(),
                breach_date: "2013-10-04".into(),
                data_classes: vec!["Passwords".into()],
                source: BreachSource::LocalDataset,
                severity: Severity::Critical,
            }]
        }

        fn source(&self) -> BreachSource {
            BreachSource::LocalDataset
        }
    }

    struct CountingProvider(Arc<AtomicUsize>);

    #[async_trait]
    impl IntelligenceProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, _domain: &str) -> Result<IntelligenceData, ProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(IntelligenceData { ports: vec![PortFinding::open(443, "https")], ..Default::default() })
        }
    }

    /// Historical names only, none verified.
    struct HistoricalNames;

    #[async_trait]
    impl IntelligenceProvider for HistoricalNames {
        fn name(&self) -> &str {
            "historical"
        }

        async fn fetch(&self, domain: &str) -> Result<IntelligenceData, ProviderError> {
            Ok(IntelligenceData {
                ports: vec![PortFinding::open(443, "https")],
                subdomains: vec![
                    SubdomainFinding::inactive(&format!("ghost.{}", domain)),
                    SubdomainFinding::inactive(&format!("api.{}", domain)),
                ],
                ..Default::default()
            })
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl CompletionNotifier for FailingNotifier {
        async fn notify(&self, _notice: &CompletionNotice) -> Result<(), ReconError> {
            Err(ReconError::Notification("down".into()))
        }
    }

    fn coordinator_with(
        db: &Database,
        probes: Arc<Probes>,
        providers: Vec<Arc<dyn IntelligenceProvider>>,
    ) -> ScanCoordinator {
        let mock = Arc::new(Mock(probes));
        let fallback = Arc::new(LocalFallbackProvider::new(mock.clone(), mock.clone()));
        let orchestrator = IntelligenceOrchestrator::new(providers, fallback);
        ScanCoordinator::new(db.clone(), orchestrator, mock.clone(), mock.clone(), mock.clone(), mock, Arc::new(OneBreach))
    }

    fn coordinator(db: &Database, probes: Arc<Probes>, intel_calls: Arc<AtomicUsize>) -> ScanCoordinator {
        coordinator_with(db, probes, vec![Arc::new(CountingProvider(intel_calls))])
    }

    fn enqueue(db: &Database, types: &[ScanType]) -> ScanJob {
        let types: BTreeSet<ScanType> = types.iter().copied().collect();
        db.enqueue_job(&NewScanJob { tenant_id: "tenant-1".into(), domain: "example.com".into(), types, priority: 0 }, 3)
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_scan_completes() {
        let db = Database::in_memory().unwrap();
        db.add_monitored_email("tenant-1", "ops@example.com").unwrap();
        let intel_calls = Arc::new(AtomicUsize::new(0));
        let coord = coordinator(&db, Arc::new(Probes::default()), intel_calls.clone());
        let job = enqueue(&db, &ScanType::ALL);

        let outcome = coord.run(&job, None).await.unwrap();
        let ScanOutcome::Completed(report) = outcome else { panic!("expected completion") };

        // Intelligence shared between port-scan and subdomain-enum
        assert_eq!(intel_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.scan.ports[0].port, 443);
        assert!(report.assessment.is_some());

        let stored = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert_eq!(stored.discovered_paths.len(), 1);
        assert_eq!(db.breach_records_for_tenant("tenant-1").unwrap().len(), 1);
        assert!(db.latest_risk_assessment(&job.scan_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_only_requested_stages_run() {
        let db = Database::in_memory().unwrap();
        let probes = Arc::new(Probes::default());
        let intel_calls = Arc::new(AtomicUsize::new(0));
        let coord = coordinator(&db, probes.clone(), intel_calls.clone());
        let job = enqueue(&db, &[ScanType::SslCheck]);

        coord.run(&job, None).await.unwrap();

        assert_eq!(probes.tls_calls.load(Ordering::SeqCst), 1);
        assert_eq!(probes.port_calls.load(Ordering::SeqCst), 0);
        assert_eq!(probes.path_calls.load(Ordering::SeqCst), 0);
        assert_eq!(intel_calls.load(Ordering::SeqCst), 0);
        let stored = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        assert!(stored.tls_finding.is_some());
        assert!(stored.ports.is_empty());
    }

    #[tokio::test]
    async fn test_subdomains_fall_back_to_resolver() {
        let db = Database::in_memory().unwrap();
        let probes = Arc::new(Probes::default());
        let coord = coordinator(&db, probes.clone(), Arc::new(AtomicUsize::new(0)));
        let job = enqueue(&db, &[ScanType::SubdomainEnum]);

        coord.run(&job, None).await.unwrap();

        assert_eq!(probes.subdomain_calls.load(Ordering::SeqCst), 1);
        let stored = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        assert_eq!(stored.subdomains[0].subdomain, "www.example.com");
    }

    #[tokio::test]
    async fn test_intel_subdomains_must_resolve_to_count_as_active() {
        let db = Database::in_memory().unwrap();
        let probes = Arc::new(Probes::default());
        let coord = coordinator_with(&db, probes.clone(), vec![Arc::new(HistoricalNames)]);
        let job = enqueue(&db, &[ScanType::SubdomainEnum]);

        coord.run(&job, None).await.unwrap();

        let stored = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        let find = |name: &str| stored.subdomains.iter().find(|s| s.subdomain == name).unwrap().clone();
        let ghost = find("ghost.example.com");
        assert_eq!(ghost.status, SubdomainStatus::Inactive);
        assert!(ghost.ip.is_none());
        assert_eq!(find("api.example.com").ip.as_deref(), Some("192.0.2.10"));
        assert!(stored.subdomains.iter().filter(|s| s.status == SubdomainStatus::Active).all(|s| s.ip.is_some()));
        assert_eq!(probes.subdomain_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subdomain_only_scan_skips_port_sweep() {
        let db = Database::in_memory().unwrap();
        let probes = Arc::new(Probes::default());
        let coord = coordinator_with(&db, probes.clone(), Vec::new());
        let job = enqueue(&db, &[ScanType::SubdomainEnum]);

        coord.run(&job, None).await.unwrap();

        assert_eq!(probes.port_calls.load(Ordering::SeqCst), 0);
        assert_eq!(probes.subdomain_calls.load(Ordering::SeqCst), 1);
        let stored = db.get_scan_result(&job.scan_id).unwrap().unwrap();
        assert_eq!(stored.subdomains[0].subdomain, "www.example.com");
        assert!(stored.ports.is_empty());
    }

    #[tokio::test]
    async fn test_progress_events_increase() {
        let db = Database::in_memory().unwrap();
        let coord = coordinator(&db, Arc::new(Probes::default()), Arc::new(AtomicUsize::new(0)));
        let job = enqueue(&db, &[ScanType::PortScan, ScanType::DirectoryScan, ScanType::RiskCalc]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        coord.run(&job, Some(&tx)).await.unwrap();
        drop(tx);

        let mut percents = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ScanEvent::Progress { percent } = event {
                percents.push(percent);
            }
        }
        assert_eq!(percents, milestones(&job.types));
    }

    #[tokio::test]
    async fn test_terminal_scan_is_skipped() {
        let db = Database::in_memory().unwrap();
        let coord = coordinator(&db, Arc::new(Probes::default()), Arc::new(AtomicUsize::new(0)));
        let job = enqueue(&db, &[ScanType::SslCheck]);

        coord.run(&job, None).await.unwrap();
        let again = coord.run(&job, None).await.unwrap();
        assert!(matches!(again, ScanOutcome::Skipped(ScanStatus::Completed)));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_scan() {
        let db = Database::in_memory().unwrap();
        let coord = coordinator(&db, Arc::new(Probes::default()), Arc::new(AtomicUsize::new(0)))
            .with_notifier(Arc::new(FailingNotifier));
        let job = enqueue(&db, &[ScanType::SslCheck]);

        let outcome = coord.run(&job, None).await.unwrap();
        assert_eq!(outcome.label(), "completed");
    }

    #[tokio::test]
    async fn test_missing_scan_is_infrastructure_error() {
        let db = Database::in_memory().unwrap();
        let coord = coordinator(&db, Arc::new(Probes::default()), Arc::new(AtomicUsize::new(0)));
        let mut job = enqueue(&db, &[ScanType::SslCheck]);
        job.scan_id = "does-not-exist".into();

        assert!(coord.run(&job, None).await.is_err());
    }
}
