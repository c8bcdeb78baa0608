use clap::{Args, Parser, Subcommand};
use common::model::email::EmailMessage;
use log::{error, info, warn};
use odyssey_toolkit::config::{self, AppConfig};
use odyssey_toolkit::logging;
use odyssey_toolkit::services::attendance::{write_attendance_sheet, AttendanceList};
use odyssey_toolkit::services::forms::{
    create_form_from_template, create_practice_form, export_form_json, FormsApiClient,
    FormsApiConfig,
};
use odyssey_toolkit::services::mail::{
    EmailClient, HtmlEmailTemplate, PlainTextTemplate, SmtpConfig,
};
use odyssey_toolkit::services::qr::{QrCodeConfig, QrCodeGenerator};
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const DEFAULT_SUBJECT: &str = "[Odyssey Management] Today's Attendance";

#[derive(Parser)]
#[command(name = "odyssey")]
#[command(about = "Attendance QR codes, forms, sheets and emails for the Odyssey troupe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signed attendance QR code for the current session
    Qr(QrArgs),

    /// Email the attendance sheet to every recipient
    SendMail {
        /// Recipient address (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,
        /// File to attach (repeatable)
        #[arg(long)]
        attachment: Vec<PathBuf>,
        /// Session name used in the message body
        #[arg(long, default_value = "today's session")]
        session: String,
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,
    },

    /// Create or export Google Forms
    Forms {
        #[command(subcommand)]
        command: FormsCommands,
    },

    /// Convert an attendance CSV export
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },
}

#[derive(Args)]
struct QrArgs {
    /// Attendance form URL [env: BASE_URL]
    #[arg(long)]
    base_url: Option<String>,
    /// Signing secret [env: SECRET_KEY]
    #[arg(long)]
    secret_key: Option<String>,
    /// Logo drawn in the middle of the code [env: QR_LOGO_PATH]
    #[arg(long, conflicts_with = "no_logo")]
    logo: Option<PathBuf>,
    /// Render a plain code without a logo
    #[arg(long)]
    no_logo: bool,
    /// Side length of the PNG in pixels (1 to 4096)
    #[arg(long)]
    size: Option<u32>,
    /// IANA timezone used for the event identifier
    #[arg(long)]
    timezone: Option<String>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Subcommand)]
enum FormsCommands {
    /// Create a form, from a template file or the empty practice form
    Create {
        /// Template document with title_header and form_body
        #[arg(long)]
        template: Option<PathBuf>,
        /// Key the template is nested under in the document
        #[arg(long, requires = "template")]
        key: Option<String>,
        #[arg(long, default_value = "out_created_form")]
        out: PathBuf,
    },

    /// Write the JSON of an existing form to a file
    Get {
        form_id: String,
        #[arg(long, default_value = "output_imported_form_json")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum AttendanceCommands {
    /// Print (or write) the export as a JSON array of rows
    Json {
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render the export as a printable PDF sheet
    Sheet {
        csv: PathBuf,
        #[arg(long)]
        session: String,
        #[arg(long, default_value = "./fonts")]
        fonts_dir: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Runs synchronous work off the runtime thread.
async fn run_blocking<T, F>(job: F) -> Result<T, Box<dyn Error>>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(job).await??)
}

async fn generate_qr(config: &AppConfig, args: QrArgs) -> Result<(), Box<dyn Error>> {
    let mut builder = QrCodeConfig::builder(
        args.base_url.unwrap_or_else(|| config.qr_base_url.clone()),
        args.secret_key.unwrap_or_else(|| config.qr_secret_key.clone()),
    )
    .output_dir(args.out_dir);
    builder = if args.no_logo {
        builder.without_logo()
    } else {
        builder.logo_path(args.logo.unwrap_or_else(|| config.logo_path.clone()))
    };
    if let Some(size) = args.size {
        builder = builder.qr_size(size);
    }
    if let Some(timezone) = args.timezone {
        builder = builder.timezone(timezone);
    }
    let generator = QrCodeGenerator::new(builder.build()?);

    let generated = run_blocking(move || generator.generate().map_err(|e| e.to_string())).await?;
    println!("{}", generated.path.display());
    Ok(())
}

async fn send_mail(
    config: &AppConfig,
    recipients: Vec<String>,
    attachments: Vec<PathBuf>,
    session: String,
    subject: String,
) -> Result<(), Box<dyn Error>> {
    let values = HashMap::from([("session".to_string(), session)]);
    let html_body = HtmlEmailTemplate::AttendanceAutomatedSend.render(&values)?;
    let plain_text_body = PlainTextTemplate::AttendanceAutomatedSend.render(&values)?;
    let client = EmailClient::new(SmtpConfig::from_app_config(config)?)?;
    let total = recipients.len();

    let failed = run_blocking(move || {
        let mut failed = 0;
        for recipient in recipients {
            let contents = EmailMessage {
                destination_email_address: recipient.clone(),
                subject: subject.clone(),
                plain_text_body: plain_text_body.clone(),
                html_body: html_body.clone(),
                attachments: attachments.clone(),
            };
            match client.send_email(&contents) {
                Ok(true) => info!("PASS {}", recipient),
                Ok(false) => {
                    failed += 1;
                    error!("FAIL {}", recipient);
                }
                Err(err) => {
                    failed += 1;
                    error!("FAIL {}: {}", recipient, err);
                }
            }
        }
        Ok(failed)
    })
    .await?;

    if failed > 0 {
        return Err(format!("{} of {} emails were not sent", failed, total).into());
    }
    Ok(())
}

async fn run_forms(config: &AppConfig, command: FormsCommands) -> Result<(), Box<dyn Error>> {
    let client = FormsApiClient::new(FormsApiConfig::from_app_config(config));
    match command {
        FormsCommands::Create { template, key, out } => {
            let form = match template {
                Some(template) => {
                    create_form_from_template(client, &template, key.as_deref(), &out).await?
                }
                None => create_practice_form(client).await?,
            };
            println!("title: {}", form.template.title);
            println!("formId: {}", form.form_id.as_deref().unwrap_or_default());
            println!(
                "responderUri: {}",
                form.responder_uri.as_deref().unwrap_or_default()
            );
        }
        FormsCommands::Get { form_id, out } => {
            export_form_json(&client, &form_id, &out).await?;
            println!("{}", out.display());
        }
    }
    Ok(())
}

async fn run_attendance(command: AttendanceCommands) -> Result<(), Box<dyn Error>> {
    match command {
        AttendanceCommands::Json { csv, out } => {
            let list = run_blocking(move || {
                AttendanceList::from_path(&csv).map_err(|e| e.to_string())
            })
            .await?;
            let json = serde_json::to_string_pretty(&list.to_json())?;
            match out {
                Some(path) => {
                    fs::write(&path, json)?;
                    info!("Wrote {} rows to {}", list.len(), path.display());
                }
                None => println!("{}", json),
            }
        }
        AttendanceCommands::Sheet {
            csv,
            session,
            fonts_dir,
            out_dir,
        } => {
            let path = run_blocking(move || {
                let list = AttendanceList::from_path(&csv).map_err(|e| e.to_string())?;
                write_attendance_sheet(&list, &session, &fonts_dir, &out_dir)
                    .map_err(|e| e.to_string())
            })
            .await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Qr(args) => generate_qr(&config, args).await,
        Commands::SendMail {
            recipients,
            attachment,
            session,
            subject,
        } => send_mail(&config, recipients, attachment, session, subject).await,
        Commands::Forms { command } => run_forms(&config, command).await,
        Commands::Attendance { command } => run_attendance(command).await,
    }
}

#[actix_web::main]
async fn main() {
    let cli = Cli::parse();
    // .env may carry RUST_LOG, so it is loaded before the logger is built
    let dotenv_error = config::load_dotenv();
    if let Err(err) = logging::init(logging::DEFAULT_FILTER) {
        eprintln!("Logger already initialized: {}", err);
    }
    if let Some(err) = dotenv_error {
        warn!("Ignoring unreadable .env file: {}", err);
    }
    let config = AppConfig::from_process_env();

    if let Err(err) = run(cli, config).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
