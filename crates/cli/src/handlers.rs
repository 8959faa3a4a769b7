//! Command handlers for sitepilot CLI

use anyhow::{bail, Result};
use clap::Command;
use clap_complete::{generate, Shell as ClapShell};
use console::style;
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sitepilot_core::{
    get_config_path, render_config, validate_config, AliasRecord, BucketSummary, CdnSetup,
    CdnState, ConfigFile, Context, Error, ObjectSummary, SyncReport,
};
use std::path::Path;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;

/// Handle list-buckets
pub async fn handle_list_buckets(ctx: &Context, long: bool) -> Result<()> {
    let buckets: Vec<BucketSummary> = ctx.buckets.all_buckets().try_collect().await?;

    if long {
        #[derive(Tabled)]
        struct BucketRow {
            name: String,
            created: String,
        }

        let rows: Vec<BucketRow> = buckets
            .iter()
            .map(|b| BucketRow {
                name: b.name.clone(),
                created: b
                    .creation_date
                    .as_ref()
                    .map(|d| format_timestamp(d.secs()))
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();

        println!("{}", Table::new(rows));
    } else {
        for bucket in &buckets {
            println!("{}", bucket.name);
        }
    }

    Ok(())
}

/// Handle list-bucket-objects
pub async fn handle_list_bucket_objects(ctx: &Context, bucket: &str, long: bool) -> Result<()> {
    let mut objects = ctx.buckets.all_objects(bucket);

    if !long {
        while let Some(object) = objects.try_next().await? {
            println!("{}", object.key);
        }
        return Ok(());
    }

    #[derive(Tabled)]
    struct ObjectRow {
        key: String,
        size: String,
        modified: String,
    }

    let objects: Vec<ObjectSummary> = objects.try_collect().await?;
    let rows: Vec<ObjectRow> = objects
        .iter()
        .map(|o| ObjectRow {
            key: o.key.clone(),
            size: format_bytes(o.size),
            modified: o
                .last_modified
                .as_ref()
                .map(|d| format_timestamp(d.secs()))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

/// Create, open up and website-enable a bucket. Returns its website URL.
pub async fn setup_bucket(ctx: &Context, name: &str) -> Result<String> {
    let bucket = ctx.buckets.init_bucket(name).await?;
    ctx.buckets.set_policy(&bucket).await?;
    ctx.buckets.configure_website(&bucket).await?;

    Ok(ctx.buckets.get_bucket_url(&bucket.name).await?)
}

/// Handle setup-bucket
pub async fn handle_setup_bucket(ctx: &Context, name: &str) -> Result<()> {
    let url = setup_bucket(ctx, name).await?;
    println!("Bucket {} ready: {}", name, url);
    Ok(())
}

/// Fail early when the sync source is not a directory
pub fn ensure_site_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("Directory not found: {}", path.display());
    }
    Ok(())
}

/// Upload the tree below `path`, advancing `progress` per file
pub async fn sync_site(
    ctx: &Context,
    path: &Path,
    bucket: &str,
    progress: &ProgressBar,
) -> Result<SyncReport> {
    ensure_site_dir(path)?;

    let sync = ctx.buckets.storage_sync();
    let uploads = sync.plan(path, bucket)?;
    progress.set_length(uploads.len() as u64);

    let report = sync
        .upload_all(&uploads, |upload| {
            progress.set_message(upload.key.clone());
            progress.inc(1);
        })
        .await?;

    tracing::info!("Uploaded {} files ({})", report.uploaded, format_bytes(report.bytes as i64));
    Ok(report)
}

/// Handle sync
pub async fn handle_sync(ctx: &Context, path: &Path, bucket: &str) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let result = sync_site(ctx, path, bucket, &pb).await;
    pb.finish_and_clear();
    result?;

    println!("{}", ctx.buckets.get_bucket_url(bucket).await?);
    Ok(())
}

/// Point `domain` at the website endpoint of the bucket named after it
pub async fn setup_domain(ctx: &Context, domain: &str) -> Result<AliasRecord> {
    let endpoint = ctx.buckets.get_bucket_endpoint(domain).await?;
    let zone = ctx.domains.find_or_create_hosted_zone(domain).await?;

    Ok(ctx.domains.create_s3_domain_record(&zone, domain, &endpoint).await?)
}

/// Handle setup-domain
pub async fn handle_setup_domain(ctx: &Context, domain: &str) -> Result<()> {
    setup_domain(ctx, domain).await?;
    print_configured("http", domain);
    Ok(())
}

/// Handle find-cert
pub async fn handle_find_cert(ctx: &Context, domain: &str) -> Result<()> {
    match ctx.certificates.find_matching_cert(domain).await? {
        Some(cert) => println!("{}", cert.arn),
        None => println!("No matching cert found."),
    }
    Ok(())
}

/// Drive the CDN setup, reporting each stage on stderr
pub async fn setup_cdn(
    ctx: &Context,
    domain: &str,
    bucket: &str,
    cancel: CancellationToken,
) -> Result<()> {
    let mut setup = CdnSetup::new(ctx, domain, bucket).with_cancel(cancel);

    loop {
        match setup.step().await? {
            CdnState::FindCertificate => {
                eprintln!("No distribution serves {}, looking for a certificate...", domain)
            }
            CdnState::AwaitDeploy(dist) => {
                eprintln!("Waiting for distribution {} to deploy...", dist.id)
            }
            CdnState::Live(outcome) => {
                tracing::info!(
                    "{} served by {} through zone {}",
                    domain,
                    outcome.distribution.domain_name,
                    outcome.zone.name
                );
                return Ok(());
            }
            CdnState::MissingCertificate => bail!(Error::MissingCertificate(domain.to_string())),
            _ => {}
        }
    }
}

/// Handle setup-cdn
pub async fn handle_setup_cdn(ctx: &Context, domain: &str, bucket: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match setup_cdn(ctx, domain, bucket, cancel).await {
        Ok(()) => {
            print_configured("https", domain);
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::MissingCertificate(_))) => {
            bail!("No matching cert found.")
        }
        Err(e) => Err(e),
    }
}

fn print_configured(scheme: &str, domain: &str) {
    println!(
        "{} {}",
        style("Domain configured:").green().bold(),
        format_args!("{}://{}", scheme, domain)
    );
}

/// Handle config commands
pub fn handle_config(action: &str, path: Option<&Path>, config: &ConfigFile) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    match action {
        "show" => {
            println!("# {}", path.display());
            if !path.exists() {
                println!("# (file not found, showing defaults)");
            }
            println!("{}", render_config(config)?);
            Ok(())
        }
        "validate" => {
            validate_config(config)?;
            println!("  ✅ Configuration valid");
            Ok(())
        }
        "path" => {
            println!("{}", path.display());
            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: show, validate, path");
            Ok(())
        }
    }
}

/// Format a unix timestamp for table output
fn format_timestamp(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => secs.to_string(),
    }
}

/// Format bytes to human-readable size
fn format_bytes(bytes: i64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Handle shell completion generation
pub fn handle_completion(shell: &str, cmd: &mut Command) -> Result<()> {
    use std::io;

    let clap_shell = match shell {
        "bash" => ClapShell::Bash,
        "zsh" => ClapShell::Zsh,
        "fish" => ClapShell::Fish,
        "elvish" => ClapShell::Elvish,
        "powershell" | "pwsh" => ClapShell::PowerShell,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell: {}\nSupported shells: bash, zsh, fish, elvish, powershell",
                shell
            ));
        }
    };

    generate(clap_shell, cmd, "sitepilot", &mut io::stdout());

    // Instructions go to stderr so the script can be piped
    match shell {
        "bash" => eprintln!("# Add to ~/.bashrc: source <(sitepilot completion bash)"),
        "zsh" => eprintln!("# Add to ~/.zshrc: source <(sitepilot completion zsh)"),
        "fish" => eprintln!(
            "# sitepilot completion fish > ~/.config/fish/completions/sitepilot.fish"
        ),
        "elvish" => eprintln!("# sitepilot completion elvish > ~/.elvish/lib/sitepilot.elv"),
        _ => eprintln!("# sitepilot completion powershell | Out-String | Invoke-Expression"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_core::testing::{MemoryCdn, MemoryCertificates, MemoryDns, MemoryStorage};
    use sitepilot_core::{Backends, DeployWait};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fakes {
        storage: Arc<MemoryStorage>,
        dns: Arc<MemoryDns>,
        cdn: Arc<MemoryCdn>,
        ctx: Context,
    }

    fn fakes(storage: MemoryStorage, certs: MemoryCertificates) -> Fakes {
        let storage = Arc::new(storage);
        let dns = Arc::new(MemoryDns::new());
        let cdn = Arc::new(MemoryCdn::new().deploy_after_polls(1));

        let backends = Backends {
            storage: storage.clone(),
            dns: dns.clone(),
            certificates: Arc::new(certs),
            cdn: cdn.clone(),
        };
        let mut ctx = Context::new(backends, "eu-west-1", &ConfigFile::default());
        ctx.deploy_wait = DeployWait {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };

        Fakes { storage, dns, cdn, ctx }
    }

    #[tokio::test]
    async fn test_setup_bucket_configures_website() {
        let f = fakes(MemoryStorage::new(), MemoryCertificates::new());

        let url = setup_bucket(&f.ctx, "example.com").await.unwrap();

        assert_eq!(url, "http://example.com.s3-website-eu-west-1.amazonaws.com");
        assert!(f.storage.policy("example.com").is_some());
        assert!(f.storage.website("example.com").is_some());

        // Running it again converges
        setup_bucket(&f.ctx, "example.com").await.unwrap();
        assert_eq!(f.storage.bucket_names().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_site_counts_uploads() {
        let f = fakes(MemoryStorage::new().with_bucket("site", "eu-west-1"), MemoryCertificates::new());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();

        let pb = ProgressBar::hidden();
        let report = sync_site(&f.ctx, dir.path(), "site", &pb).await.unwrap();

        assert_eq!(report.uploaded, 2);
        assert_eq!(pb.position(), 2);
        assert_eq!(f.storage.objects("site").len(), 2);
    }

    #[tokio::test]
    async fn test_sync_site_missing_dir() {
        let f = fakes(MemoryStorage::new(), MemoryCertificates::new());
        let dir = tempfile::tempdir().unwrap();

        let result = sync_site(&f.ctx, &dir.path().join("missing"), "site", &ProgressBar::hidden()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_setup_domain_creates_zone_and_record() {
        let f = fakes(
            MemoryStorage::new().with_bucket("www.example.com", "eu-west-1"),
            MemoryCertificates::new(),
        );

        let record = setup_domain(&f.ctx, "www.example.com").await.unwrap();

        assert_eq!(record.target.dns_name, "s3-website-eu-west-1.amazonaws.com");
        let zones = f.dns.zones();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "example.com.");
        assert_eq!(f.dns.records(&zones[0].id).len(), 1);
    }

    #[tokio::test]
    async fn test_setup_cdn_without_certificate() {
        let f = fakes(
            MemoryStorage::new().with_bucket("site", "eu-west-1"),
            MemoryCertificates::new(),
        );

        let err = setup_cdn(&f.ctx, "www.example.com", "site", CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MissingCertificate(_))));
        assert!(f.cdn.distributions().is_empty());
    }

    #[tokio::test]
    async fn test_setup_cdn_goes_live() {
        let f = fakes(
            MemoryStorage::new().with_bucket("site", "eu-west-1"),
            MemoryCertificates::new().with_certificate("arn:site", "ISSUED", &["*.example.com"]),
        );

        setup_cdn(&f.ctx, "www.example.com", "site", CancellationToken::new())
            .await
            .unwrap();

        let dists = f.cdn.distributions();
        assert_eq!(dists.len(), 1);
        let zone = &f.dns.zones()[0];
        assert_eq!(f.dns.records(&zone.id)[0].target.dns_name, dists[0].domain_name);
    }

    #[tokio::test]
    async fn test_handle_setup_cdn_reports_missing_cert() {
        let f = fakes(
            MemoryStorage::new().with_bucket("site", "eu-west-1"),
            MemoryCertificates::new().with_certificate("arn:other", "ISSUED", &["other.org"]),
        );

        let err = handle_setup_cdn(&f.ctx, "www.example.com", "site")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No matching cert found.");
        assert!(f.cdn.distributions().is_empty());
    }

    #[tokio::test]
    async fn test_handle_setup_cdn_succeeds() {
        let f = fakes(
            MemoryStorage::new().with_bucket("site", "eu-west-1"),
            MemoryCertificates::new().with_certificate("arn:site", "ISSUED", &["www.example.com"]),
        );

        handle_setup_cdn(&f.ctx, "www.example.com", "site").await.unwrap();
        assert_eq!(f.cdn.distributions().len(), 1);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13");
    }
}
