use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use physio_billing::config::{database, identity::therapist_identity, settings};
use physio_billing::core::calendar::PracticeCalendar;
use physio_billing::errors::Result;
use physio_billing::practice::Practice;
use physio_billing::render::format::{format_currency, format_period_short};
use physio_billing::render::pdf::PdfRenderer;
use physio_billing::store::Stores;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "physio-billing", about = "Attendance and invoicing for a physiotherapy practice")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every invoice, newest first
    Invoices,
    /// List patients with their codes
    Patients,
    /// Render a stored invoice into the output directory
    Render {
        /// Invoice id as shown by `invoices`
        invoice_id: i64,
    },
    /// Attendance overview across all patients
    Analytics,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    let cli = Cli::parse();

    // 3. Settings and practice calendar
    let settings = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let calendar = PracticeCalendar::system(settings.offset()?);

    // 4. Backend, chosen once
    let stores = match settings.backend {
        settings::Backend::Memory => {
            warn!("Running against in-memory stores; nothing will be kept.");
            Stores::in_memory()
        }
        settings::Backend::Database => {
            let db = database::init_database()
                .await
                .inspect(|_| info!("Database initialized successfully."))
                .inspect_err(|e| error!("Failed to initialize database: {}", e))?;
            Stores::database(db)
        }
    };

    let practice = Practice::new(
        stores,
        calendar.clone(),
        therapist_identity(&settings.therapist),
        Arc::new(PdfRenderer::new(calendar)),
        settings.output_dir.clone(),
    );

    match cli.command {
        Commands::Invoices => {
            let listing = practice.all_invoices().await;
            if let Some(banner) = listing.banner {
                println!("{banner}");
            }
            for invoice in listing.items {
                println!(
                    "{:>4}  {}  {:<24} {:<22} {:>14}  {}",
                    invoice.id,
                    invoice.invoice_number,
                    invoice.patient_full_name,
                    format_period_short(&invoice.date_range),
                    format_currency(invoice.total_amount),
                    if invoice.is_paid { "paid" } else { "unpaid" }
                );
            }
        }
        Commands::Patients => {
            let listing = practice.patients().await;
            if let Some(banner) = listing.banner {
                println!("{banner}");
            }
            for patient in listing.items {
                println!("{:>4}  {}  {}", patient.id, patient.patient_code, patient.name);
            }
        }
        Commands::Render { invoice_id } => match practice.regenerate_document(invoice_id).await {
            Ok(path) => println!("Wrote {}", path.display()),
            Err(e) => {
                error!("Render of invoice {} failed: {}", invoice_id, e);
                println!("{}", e.user_message());
            }
        },
        Commands::Analytics => {
            let report = practice.practice_attendance(None).await;
            if let Some(banner) = report.banner {
                println!("{banner}");
            }
            let overview = report.value;
            for row in &overview.patients {
                println!(
                    "{:<24} {:>3}%  {:>3} present  {:>3} absent",
                    row.patient_name,
                    row.summary.attendance_rate,
                    row.summary.present_count,
                    row.summary.absent_count
                );
            }
            println!(
                "Overall: {}% over {} sessions",
                overview.overall.attendance_rate, overview.overall.total_sessions
            );
        }
    }

    Ok(())
}
