//! Publishing in dependency order

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::PublishConfig;
use crate::traits::RegistryPublisher;
use crate::types::Access;

use super::changes::DirtySet;
use super::discovery::Package;
use super::graph::DependencyGraph;

/// Options passed to the registry for every package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryOptions {
    /// Distribution tag
    pub tag: Option<String>,
    /// One-time password
    pub otp: Option<String>,
    /// Access level
    pub access: Option<Access>,
}

impl RegistryOptions {
    /// Build from configuration plus a per-run one-time password. Access
    /// levels other than `public` and `private` are dropped.
    pub fn from_config(config: &PublishConfig, otp: Option<String>) -> Self {
        let access = config.access.as_deref().and_then(|value| {
            let parsed = Access::parse(value);
            if parsed.is_none() {
                warn!(access = value, "ignoring unrecognised access level");
            }
            parsed
        });

        Self {
            tag: config.tag.clone(),
            otp,
            access,
        }
    }
}

/// Outcome for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStatus {
    /// Published successfully
    Published,
    /// Private, never published
    SkippedPrivate,
    /// Not attempted because an earlier publish failed
    NotReached,
    /// The publish command failed
    Failed(String),
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Published => write!(f, "published"),
            Self::SkippedPrivate => write!(f, "skipped (private)"),
            Self::NotReached => write!(f, "not reached"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of publishing a single package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePublishResult {
    /// Package name
    pub package: String,
    /// Version published (or that would have been)
    pub version: String,
    /// Outcome
    pub status: PublishStatus,
    /// Time taken to publish
    pub duration: Duration,
}

/// Overall result of a publish run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishResult {
    /// Planned packages in publish order, then skipped private packages
    pub packages: Vec<PackagePublishResult>,
    /// Total duration
    pub total_duration: Duration,
    /// Whether no publish failed
    pub success: bool,
}

impl PublishResult {
    /// Names of packages with the given status kind
    fn with<F: Fn(&PublishStatus) -> bool>(&self, pred: F) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|p| pred(&p.status))
            .map(|p| p.package.as_str())
            .collect()
    }

    /// Successfully published packages, in publish order
    pub fn published(&self) -> Vec<&str> {
        self.with(|s| *s == PublishStatus::Published)
    }

    /// Packages that failed
    pub fn failed(&self) -> Vec<&str> {
        self.with(|s| matches!(s, PublishStatus::Failed(_)))
    }

    /// Packages never attempted
    pub fn not_reached(&self) -> Vec<&str> {
        self.with(|s| *s == PublishStatus::NotReached)
    }

    /// Private packages left out
    pub fn skipped_private(&self) -> Vec<&str> {
        self.with(|s| *s == PublishStatus::SkippedPrivate)
    }
}

/// A package planned for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPublish {
    /// Package name
    pub name: String,
    /// Package directory
    pub path: PathBuf,
    /// Version to publish
    pub version: String,
    /// Planned packages that must be published first
    pub dependencies: Vec<String>,
    /// Publish order (0 = first)
    pub order: usize,
}

/// Ordered publish plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishPlan {
    /// Packages to publish, dependencies first
    pub packages: Vec<PlannedPublish>,
    /// Private packages left out, in discovery order
    pub skipped_private: Vec<String>,
}

impl PublishPlan {
    /// Names in publish order
    pub fn names(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Whether nothing will be published
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Callback for publish events
pub trait PublishCallback: Send + Sync {
    /// Called before publishing a package
    fn on_publish_start(&self, package: &str, version: &str);

    /// Called after publishing a package
    fn on_publish_complete(&self, result: &PackagePublishResult);
}

/// Default no-op callback
pub struct NoOpCallback;

impl PublishCallback for NoOpCallback {
    fn on_publish_start(&self, _package: &str, _version: &str) {}
    fn on_publish_complete(&self, _result: &PackagePublishResult) {}
}

/// Orders dirty, non-private packages and drives the registry publisher
pub struct PublishSequencer {
    options: RegistryOptions,
    concurrency: usize,
    publish_all: bool,
}

impl PublishSequencer {
    /// Create a sequencer
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            concurrency: 1,
            publish_all: false,
        }
    }

    /// Maximum number of independent packages published at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Consider every package, dirty or not
    pub fn with_publish_all(mut self, publish_all: bool) -> Self {
        self.publish_all = publish_all;
        self
    }

    /// Concurrency limit
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Plan the publish sequence.
    ///
    /// Dirty packages get `version` when one is given; everything else is
    /// published at its manifest version.
    pub fn create_plan(
        &self,
        graph: &DependencyGraph,
        packages: &[Package],
        dirty: &DirtySet,
        version: Option<&str>,
    ) -> PublishPlan {
        let by_name: HashMap<&str, &Package> =
            packages.iter().map(|p| (p.name.as_str(), p)).collect();

        let candidates: Vec<&Package> = packages
            .iter()
            .filter(|p| self.publish_all || dirty.contains(&p.name))
            .collect();

        let skipped_private: Vec<String> = candidates
            .iter()
            .filter(|p| p.private)
            .map(|p| p.name.clone())
            .collect();

        let publishable: Vec<String> = candidates
            .iter()
            .filter(|p| !p.private)
            .map(|p| p.name.clone())
            .collect();
        let planned_set: HashSet<&str> = publishable.iter().map(String::as_str).collect();

        let planned: Vec<PlannedPublish> = graph
            .order(&publishable)
            .into_iter()
            .enumerate()
            .filter_map(|(order, name)| {
                let pkg = by_name.get(name.as_str())?;
                let version = match version {
                    Some(v) if dirty.contains(&name) => v.to_string(),
                    _ => pkg.version.clone(),
                };
                let dependencies = graph
                    .dependencies(&name)
                    .iter()
                    .filter(|d| planned_set.contains(d.as_str()))
                    .cloned()
                    .collect();
                Some(PlannedPublish {
                    path: pkg.path.clone(),
                    name,
                    version,
                    dependencies,
                    order,
                })
            })
            .collect();

        info!(
            to_publish = planned.len(),
            skipped_private = skipped_private.len(),
            "publish plan created"
        );
        PublishPlan {
            packages: planned,
            skipped_private,
        }
    }

    /// Publish one package at a time, stopping at the first failure
    pub fn execute(
        &self,
        plan: &PublishPlan,
        publisher: &dyn RegistryPublisher,
        callback: &dyn PublishCallback,
    ) -> PublishResult {
        info!(packages = plan.packages.len(), "executing publish plan");
        let start = Instant::now();
        let mut results = Vec::new();
        let mut halted = false;

        for planned in &plan.packages {
            if halted {
                results.push(not_reached(planned));
                continue;
            }

            callback.on_publish_start(&planned.name, &planned.version);
            let result = publish_one(publisher, planned, &self.options);
            callback.on_publish_complete(&result);

            if let PublishStatus::Failed(reason) = &result.status {
                warn!(package = %planned.name, error = %reason, "publish failed, halting");
                halted = true;
            }
            results.push(result);
        }

        finish(plan, results, start)
    }

    /// Publish in dependency waves with at most `concurrency` packages in
    /// flight. A failure lets the current wave drain; later waves are not
    /// reached.
    pub async fn execute_concurrent(
        &self,
        plan: &PublishPlan,
        graph: &DependencyGraph,
        publisher: Arc<dyn RegistryPublisher>,
        callback: Arc<dyn PublishCallback>,
    ) -> PublishResult {
        info!(
            packages = plan.packages.len(),
            concurrency = self.concurrency,
            "executing publish plan concurrently"
        );
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let by_name: HashMap<&str, &PlannedPublish> =
            plan.packages.iter().map(|p| (p.name.as_str(), p)).collect();
        let mut results: HashMap<String, PackagePublishResult> = HashMap::new();
        let mut halted = false;

        for (wave_idx, wave) in graph.waves(&plan.names()).iter().enumerate() {
            let planned: Vec<PlannedPublish> = wave
                .iter()
                .filter_map(|name| by_name.get(name.as_str()).map(|p| (*p).clone()))
                .collect();

            if halted {
                for p in &planned {
                    results.insert(p.name.clone(), not_reached(p));
                }
                continue;
            }

            debug!(wave = wave_idx, packages = planned.len(), "publishing wave");
            let mut handles = Vec::new();

            for p in planned {
                let semaphore = semaphore.clone();
                let publisher = publisher.clone();
                let callback = callback.clone();
                let options = self.options.clone();
                let name = p.name.clone();
                let version = p.version.clone();

                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    callback.on_publish_start(&p.name, &p.version);
                    let result = tokio::task::spawn_blocking(move || {
                        publish_one(publisher.as_ref(), &p, &options)
                    })
                    .await;
                    let result = match result {
                        Ok(result) => result,
                        Err(e) => PackagePublishResult {
                            package: name,
                            version,
                            status: PublishStatus::Failed(format!("publish task panicked: {}", e)),
                            duration: Duration::ZERO,
                        },
                    };
                    callback.on_publish_complete(&result);
                    result
                });
                handles.push(handle);
            }

            for handle in handles {
                match handle.await {
                    Ok(result) => {
                        if let PublishStatus::Failed(reason) = &result.status {
                            warn!(package = %result.package, error = %reason, "publish failed, halting after this wave");
                            halted = true;
                        }
                        results.insert(result.package.clone(), result);
                    }
                    Err(e) => {
                        warn!(error = %e, "publish task failed to join");
                        halted = true;
                    }
                }
            }
        }

        let ordered = plan
            .packages
            .iter()
            .map(|p| results.remove(&p.name).unwrap_or_else(|| not_reached(p)))
            .collect();
        finish(plan, ordered, start)
    }
}

fn publish_one(
    publisher: &dyn RegistryPublisher,
    planned: &PlannedPublish,
    options: &RegistryOptions,
) -> PackagePublishResult {
    info!(package = %planned.name, version = %planned.version, "publishing package");
    let start = Instant::now();
    let status = match publisher.publish(&planned.path, options) {
        Ok(()) => {
            debug!(package = %planned.name, "package published");
            PublishStatus::Published
        }
        Err(e) => PublishStatus::Failed(e.to_string()),
    };

    PackagePublishResult {
        package: planned.name.clone(),
        version: planned.version.clone(),
        status,
        duration: start.elapsed(),
    }
}

fn not_reached(planned: &PlannedPublish) -> PackagePublishResult {
    PackagePublishResult {
        package: planned.name.clone(),
        version: planned.version.clone(),
        status: PublishStatus::NotReached,
        duration: Duration::ZERO,
    }
}

fn finish(plan: &PublishPlan, mut results: Vec<PackagePublishResult>, start: Instant) -> PublishResult {
    results.extend(plan.skipped_private.iter().map(|name| PackagePublishResult {
        package: name.clone(),
        version: String::new(),
        status: PublishStatus::SkippedPrivate,
        duration: Duration::ZERO,
    }));

    let success = !results
        .iter()
        .any(|r| matches!(r.status, PublishStatus::Failed(_)));
    let total_duration = start.elapsed();

    info!(
        success,
        published = results.iter().filter(|r| r.status == PublishStatus::Published).count(),
        duration_ms = total_duration.as_millis() as u64,
        "publish complete"
    );

    PublishResult {
        packages: results,
        total_duration,
        success,
    }
}
