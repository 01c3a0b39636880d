//! Sync service - orchestrates one firewall sync run
//!
//! Steps run strictly in order and stop at the first failure:
//! fetch policy → resolve public IP → rewrite policy → push policy →
//! update primary NSG rule → update management NSG rule.
//!
//! Nothing is rolled back. A failure after the push leaves the policy file and
//! the security rules pointing at different addresses until the next run.

use std::time::Instant;

use reqwest::Client;
use tracing::{debug, info, info_span, Instrument};

use crate::config::{NsgTarget, OciProfile, Settings};
use crate::domain::{NetworkPolicy, PublicIp};
use crate::error::{OciError, SyncError};
use crate::infrastructure::{ContentsLocation, GitHubClient, NsgClient, PublicIpResolver};

/// Remote endpoints a run talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEndpoints {
    pub github_api: String,
    pub public_ip: String,
    /// Overrides the regional OCI Core Services endpoint for both targets
    pub oci: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compute the new policy but write nothing
    pub dry_run: bool,
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub public_ip: PublicIp,
    pub previous_cidr: Option<String>,
    pub new_cidr: String,
    /// Commit created by the policy push; `None` on a dry run
    pub commit_url: Option<String>,
    /// Labels of the security rules that were replaced, in order
    pub updated_rules: Vec<String>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn policy_changed(&self) -> bool {
        self.previous_cidr.as_deref() != Some(self.new_cidr.as_str())
    }
}

/// Service for running firewall syncs
pub struct SyncService {
    client: Client,
    endpoints: SyncEndpoints,
}

impl SyncService {
    pub fn new(client: Client, endpoints: SyncEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Load settings through `lookup`, then run
    ///
    /// A missing variable fails here, before any request is sent.
    pub async fn run_with_lookup<F>(
        &self,
        lookup: F,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings::from_lookup(lookup)?;
        self.run(&settings, options).await
    }

    /// Execute the full sync
    pub async fn run(
        &self,
        settings: &Settings,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let github = GitHubClient::new(
            self.client.clone(),
            &self.endpoints.github_api,
            &settings.github.token,
        );
        let location = ContentsLocation::new(
            &settings.github.owner,
            &settings.github.repo,
            &settings.github.file_path,
        );

        info!("📥 Fetching the current Gateway API Network Policy...");
        info!(
            "   {}/{}:{} ({})",
            location.owner, location.repo, location.path, settings.github.branch
        );
        let file = github.fetch(&location, &settings.github.branch).await?;
        let mut policy = NetworkPolicy::parse(&file.decode_content()?)?;
        info!("   Allowed CIDR: {}", policy.source_cidr().unwrap_or("(unset)"));

        info!("🌐 Fetching the current public IP address...");
        let ip = PublicIpResolver::new(self.client.clone(), &self.endpoints.public_ip)
            .resolve()
            .await?;
        info!("   Public IP address: {}", ip);

        info!("✏️  Updating the allowed IP addresses in the Gateway API Network Policy...");
        let previous_cidr = policy.set_source_cidr(&ip)?;
        let new_cidr = ip.host_cidr();
        match &previous_cidr {
            Some(previous) if *previous == new_cidr => {
                info!("   {} is already allowed", new_cidr)
            }
            Some(previous) => info!("   {} → {}", previous, new_cidr),
            None => info!("   (unset) → {}", new_cidr),
        }
        let rendered = policy.to_yaml()?;

        if options.dry_run {
            info!("🔍 Dry run: skipping policy push and security rule updates");
            info!("   Rendered policy:\n{}", rendered);
            return Ok(SyncReport {
                public_ip: ip,
                previous_cidr,
                new_cidr,
                commit_url: None,
                updated_rules: Vec::new(),
                dry_run: true,
            });
        }

        info!("📤 Pushing the updated Gateway API Network Policy to GitHub...");
        let commit = github
            .push(&location, &rendered, &file.sha, &settings.github.branch)
            .await?;
        info!(
            "✅ Gateway API Network Policy updated successfully: {} ({})",
            commit.html_url, commit.sha
        );

        let mut updated_rules = Vec::new();
        for target in settings.nsg_targets() {
            self.update_nsg(target, &ip).await?;
            updated_rules.push(target.label.clone());
        }

        info!("Sync completed in {:.1}s", start.elapsed().as_secs_f64());

        Ok(SyncReport {
            public_ip: ip,
            previous_cidr,
            new_cidr,
            commit_url: Some(commit.html_url),
            updated_rules,
            dry_run: false,
        })
    }

    /// Replace one target's security rule with an ingress rule from `ip`
    async fn update_nsg(&self, target: &NsgTarget, ip: &PublicIp) -> Result<(), SyncError> {
        let span = info_span!("nsg", rule = %target.label);
        async {
            info!("🔒 Updating the {} OCI Network Security Group Rules...", target.label);

            let wrap = |source: OciError| SyncError::Nsg {
                target: target.label.clone(),
                source,
            };

            let profile = OciProfile::load(&target.oci_config, &target.profile).map_err(wrap)?;
            let client =
                NsgClient::from_profile(self.client.clone(), &profile, self.endpoints.oci.as_deref())
                    .map_err(wrap)?;
            let rules = client
                .update_ingress_rule(&target.nsg_id, &target.rule_id, ip)
                .await
                .map_err(wrap)?;
            for rule in &rules {
                debug!("   rule {} source {}", rule.id, rule.source.as_deref().unwrap_or("-"));
            }

            info!("✅ {} OCI Network Security Group updated successfully", target.label);
            Ok::<(), SyncError>(())
        }
        .instrument(span)
        .await
    }
}
