use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use warden_core::{
    ActivityItem, Analytics, Bucket, CaptureMethod, DateRange, EnrollmentRequest, InmateHistory,
    InmateRecord, LegalStatus, LogPage, LogQuery, VerificationResult,
};
use warden_core::types::TIMESTAMP_FORMAT;
use zbus::proxy;

#[proxy(
    interface = "org.freedesktop.Warden1",
    default_service = "org.freedesktop.Warden1",
    default_path = "/org/freedesktop/Warden1"
)]
trait Warden {
    fn verify(&self, method: &str, location: &str) -> zbus::Result<String>;
    fn enroll(&self, request: &str) -> zbus::Result<String>;
    fn list_inmates(&self) -> zbus::Result<String>;
    fn logs(&self, query: &str) -> zbus::Result<String>;
    fn history(&self, inmate_id: &str) -> zbus::Result<String>;
    fn activity(&self) -> zbus::Result<String>;
    fn analytics(&self) -> zbus::Result<String>;
    fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "warden", about = "Warden inmate verification CLI")]
struct Cli {
    /// Print raw JSON from the daemon
    #[arg(long, global = true)]
    json: bool,

    /// Talk to wardend on the system bus instead of the session bus
    #[arg(long, global = true)]
    system: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Live,
    Upload,
}

#[derive(Clone, Copy, ValueEnum)]
enum RangeArg {
    All,
    Today,
    Week,
    Month,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify an inmate's identity
    Verify {
        /// Capture method
        #[arg(short, long, value_enum, default_value_t = MethodArg::Live)]
        method: MethodArg,
        /// Image to upload (required with --method upload)
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Checkpoint location (defaults to the daemon's configured location)
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Enroll a new inmate
    Enroll {
        #[arg(long)]
        name: String,
        /// Inmate ID (e.g., "INM-2024-101")
        #[arg(long)]
        id: String,
        #[arg(long)]
        age: Option<u32>,
        /// Crime details and charges
        #[arg(long, default_value = "")]
        crime: String,
        /// One of: awaiting-trial, convicted, sentenced, parole, probation
        #[arg(long)]
        legal_status: LegalStatus,
        /// Sentence duration (e.g., "5 years", "Life", "18 months")
        #[arg(long, default_value = "")]
        sentence: String,
        /// Prison or facility name
        #[arg(long)]
        prison: String,
        /// Facial image file
        #[arg(long)]
        image: PathBuf,
    },
    /// List inmates on the roster
    Inmates,
    /// Browse the verification log
    Logs {
        /// Inmate ID or name
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        prison: Option<String>,
        #[arg(short, long, value_enum, default_value_t = RangeArg::All)]
        range: RangeArg,
        /// Start of a custom date range (YYYY-MM-DD); requires --to
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// End of a custom date range (YYYY-MM-DD), inclusive
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show an inmate's profile and verification history
    History {
        /// Inmate ID
        id: String,
    },
    /// Show recent activity
    Activity,
    /// Show roster and verification distributions
    Analytics,
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let connection = if cli.system {
        zbus::Connection::system().await
    } else {
        zbus::Connection::session().await
    }
    .context("failed to connect to D-Bus")?;
    let proxy = WardenProxy::new(&connection)
        .await
        .context("wardend is not reachable")?;

    match cli.command {
        Commands::Verify {
            method,
            image,
            location,
        } => {
            let method = match method {
                MethodArg::Live => CaptureMethod::LiveCamera,
                MethodArg::Upload => CaptureMethod::Upload,
            };
            match (&method, &image) {
                (CaptureMethod::Upload, None) => bail!("--method upload requires --image"),
                (_, Some(path)) if !path.is_file() => {
                    bail!("image not found: {}", path.display())
                }
                (CaptureMethod::LiveCamera, Some(_)) => {
                    tracing::warn!("--image is ignored for live camera capture")
                }
                _ => {}
            }

            if !cli.json {
                println!("Processing facial recognition...");
            }
            let raw = proxy
                .verify(method.as_str(), location.as_deref().unwrap_or(""))
                .await?;
            if cli.json {
                println!("{raw}");
            } else {
                let result: VerificationResult = serde_json::from_str(&raw)?;
                print_verification(&result);
            }
        }
        Commands::Enroll {
            name,
            id,
            age,
            crime,
            legal_status,
            sentence,
            prison,
            image,
        } => {
            let image = image
                .canonicalize()
                .with_context(|| format!("image not found: {}", image.display()))?;
            let request = EnrollmentRequest {
                name,
                inmate_id: id,
                age,
                crime,
                legal_status,
                sentence,
                prison,
                image: image.to_string_lossy().into_owned(),
            };
            request.validate()?;

            if !cli.json {
                println!("Enrolling...");
            }
            let raw = proxy.enroll(&serde_json::to_string(&request)?).await?;
            if cli.json {
                println!("{raw}");
            } else {
                let record: InmateRecord = serde_json::from_str(&raw)?;
                println!("Inmate enrolled successfully!");
                let age = record.age.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
                println!("  {} (Age: {age})", record.name);
                println!("  Inmate ID: {}", record.inmate_id);
                if let Some(at) = record.enrolled_at {
                    println!("  Enrolled at: {}", at.format(TIMESTAMP_FORMAT));
                }
            }
        }
        Commands::Inmates => {
            let raw = proxy.list_inmates().await?;
            if cli.json {
                println!("{raw}");
            } else {
                let inmates: Vec<InmateRecord> = serde_json::from_str(&raw)?;
                println!(
                    "{:<14} {:<20} {:<16} {:<12} PRISON",
                    "ID", "NAME", "STATUS", "SENTENCE"
                );
                for i in &inmates {
                    println!(
                        "{:<14} {:<20} {:<16} {:<12} {}",
                        i.inmate_id, i.name, i.legal_status.to_string(), i.sentence, i.prison
                    );
                }
            }
        }
        Commands::Logs {
            search,
            prison,
            range,
            from,
            to,
            page,
        } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => DateRange::Between { from, to },
                _ => match range {
                    RangeArg::All => DateRange::All,
                    RangeArg::Today => DateRange::Today,
                    RangeArg::Week => DateRange::Week,
                    RangeArg::Month => DateRange::Month,
                },
            };
            let query = LogQuery {
                search,
                prison,
                range,
                page,
            };
            let raw = proxy.logs(&serde_json::to_string(&query)?).await?;
            if cli.json {
                println!("{raw}");
            } else {
                let page: LogPage = serde_json::from_str(&raw)?;
                print_logs(&page);
            }
        }
        Commands::History { id } => {
            let raw = proxy.history(&id).await?;
            if cli.json {
                println!("{raw}");
            } else {
                let history: InmateHistory = serde_json::from_str(&raw)?;
                print_history(&history);
            }
        }
        Commands::Activity => {
            let raw = proxy.activity().await?;
            if cli.json {
                println!("{raw}");
            } else {
                let items: Vec<ActivityItem> = serde_json::from_str(&raw)?;
                if items.is_empty() {
                    println!("No recent activity");
                }
                for item in &items {
                    let status = format!("{:?}", item.status).to_lowercase();
                    println!("{}  {status:<8} {}", item.time_label(), item.message);
                }
            }
        }
        Commands::Analytics => {
            let raw = proxy.analytics().await?;
            if cli.json {
                println!("{raw}");
            } else {
                let analytics: Analytics = serde_json::from_str(&raw)?;
                print_analytics(&analytics);
            }
        }
        Commands::Status => {
            let raw = proxy.status().await?;
            if cli.json {
                println!("{raw}");
            } else {
                let status: serde_json::Value = serde_json::from_str(&raw)?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        }
    }

    Ok(())
}

fn print_verification(result: &VerificationResult) {
    let status = if result.success {
        "MATCH FOUND"
    } else {
        "NO MATCH FOUND"
    };
    println!("Match Status:      {status}");
    println!("Cosine Similarity: {:.3}", result.cosine_similarity);
    println!(
        "Confidence Score:  {}% ({:?})",
        result.confidence,
        result.band()
    );
    if result.used_fallback {
        println!("! {}", VerificationResult::FALLBACK_NOTICE);
    }

    if result.success {
        println!();
        println!("Inmate ID:     {}", result.inmate_id);
        println!("Name:          {}", result.name);
        println!("Crime:         {}", result.crime);
        println!("Legal Status:  {}", result.legal_status);
        println!("Sentence:      {}", result.sentence);
        println!("Last Verified: {}", result.last_verified);
    } else {
        println!();
        println!("No matching inmate found in database");
        println!("Please try with a different image or contact administrator");
    }
}

fn print_logs(page: &LogPage) {
    if page.total_records == 0 {
        println!("No verification records");
        return;
    }
    println!(
        "Showing {}-{} of {} records",
        page.start, page.end, page.total_records
    );
    println!(
        "{:<14} {:<16} {:<18} {:<16} {:<12} {:>5} {:<8} TIME",
        "ID", "NAME", "OFFICER", "LOCATION", "METHOD", "CONF", "RESULT"
    );
    for e in &page.entries {
        let id = if e.inmate_id.is_empty() { "-" } else { &e.inmate_id };
        println!(
            "{:<14} {:<16} {:<18} {:<16} {:<12} {:>4}% {:<8} {}",
            id,
            e.inmate_name,
            e.officer,
            e.location,
            e.method.to_string(),
            e.confidence,
            e.result_label(),
            e.timestamp.format(TIMESTAMP_FORMAT)
        );
    }
    println!("Page {} of {}", page.page, page.total_pages);
}

fn print_history(history: &InmateHistory) {
    let inmate = &history.inmate;
    println!("Inmate ID:    {}", inmate.inmate_id);
    println!("Name:         {}", inmate.name);
    println!("Crime:        {}", inmate.crime);
    println!("Legal Status: {}", inmate.legal_status);
    println!("Sentence:     {}", inmate.sentence);
    println!("Prison:       {}", inmate.prison);
    if let Some(at) = inmate.enrolled_at {
        println!("Enrolled:     {}", at.format("%Y-%m-%d"));
    }
    println!(
        "Verifications: {} ({:.1}% successful)",
        history.total_verifications, history.success_rate
    );
    match history.last_verified {
        Some(at) => println!("Last Verified: {}", at.format(TIMESTAMP_FORMAT)),
        None => println!("Last Verified: never"),
    }

    if history.entries.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<20} {:<18} {:<12} {:<16} {:>5} RESULT",
        "TIMESTAMP", "OFFICER", "METHOD", "LOCATION", "CONF"
    );
    for e in &history.entries {
        println!(
            "{:<20} {:<18} {:<12} {:<16} {:>4}% {}",
            e.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            e.officer,
            e.method.to_string(),
            e.location,
            e.confidence,
            e.result_label()
        );
    }
}

fn print_analytics(analytics: &Analytics) {
    let sections: [(&str, &[Bucket]); 6] = [
        ("Legal status", &analytics.legal_status),
        ("Age", &analytics.age),
        ("Crime", &analytics.crimes),
        ("Sentence", &analytics.sentences),
        ("Verifications by prison", &analytics.prisons),
        ("Verifications by month", &analytics.monthly),
    ];
    for (i, (title, buckets)) in sections.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{title}");
        if buckets.is_empty() {
            println!("  (none)");
        }
        for b in buckets.iter() {
            println!("  {:<24} {:>5}", b.name, b.value);
        }
    }
}
