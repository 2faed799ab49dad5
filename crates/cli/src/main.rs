use clap::{Parser, Subcommand};
use hrc_core::forms::{LoginForm, NewAccountForm, NewPatientForm};
use hrc_core::{
    AssessmentFlow, ConsoleConfig, FileStorage, Patient, Service, SessionStore,
};
use hrc_gateway::auth::{self, LoginOutcome};
use hrc_gateway::{assessment, Gateway, HealthPoller, ServiceStatus};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hrc")]
#[command(about = "Health-record console CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login { email: String, password: String },
    /// Forget the session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Show your doctor record (doctor)
    Profile,
    /// Check every dashboard service
    Health,
    /// Manage accounts (admin)
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Manage your patients (doctor)
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// List decision datasets
    Datasets,
    /// Show the patient form option lists
    Enums,
    /// Show dashboard counters
    Widgets,
    /// Run a risk assessment
    Assess(AssessArgs),
}

#[derive(Subcommand)]
enum AccountCommands {
    /// List every account except yours
    List,
    /// Create an account
    Create {
        email: String,
        username: String,
        password: String,
        /// doctor or admin
        #[arg(long, default_value = "doctor")]
        role: String,
    },
    /// Delete an account by id
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List your patients
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        filter: Option<String>,
    },
    /// Create a patient
    Create {
        name: String,
        age: String,
        email: String,
        /// Image as a data:image/...;base64, URL
        #[arg(long)]
        image: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
}

#[derive(clap::Args)]
struct AssessArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone_number: String,
    #[arg(long, default_value = "")]
    age: String,
    #[arg(long, default_value = "")]
    blood_pressure: String,
    #[arg(long, default_value = "")]
    blood_sugar: String,
    #[arg(long, default_value = "")]
    procedure_count: String,
    #[arg(long, default_value = "")]
    infections_reported: String,
    #[arg(long, default_value = "")]
    body_temperature: String,
    #[arg(long, default_value = "")]
    heart_rate: String,
    #[arg(long, default_value = "")]
    operative_procedure: String,
    #[arg(long, default_value = "")]
    feelings_and_urge: String,
    #[arg(long, default_value = "")]
    disease: String,
    #[arg(long, default_value = "")]
    critical_feelings: String,
    #[arg(long, default_value_t = 1)]
    disease_rating: i64,
    #[arg(long, default_value_t = 1)]
    ckd_rating: i64,
    #[arg(long, default_value_t = 1)]
    sir_rating: i64,
    #[arg(long, default_value_t = 1)]
    ma_rating: i64,
}

impl AssessArgs {
    fn patient(&self) -> Patient {
        Patient {
            name: self.name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            age: self.age.clone(),
            blood_pressure: self.blood_pressure.clone(),
            blood_sugar: self.blood_sugar.clone(),
            procedure_count: self.procedure_count.clone(),
            infections_reported: self.infections_reported.clone(),
            body_temperature: self.body_temperature.clone(),
            heart_rate: self.heart_rate.clone(),
            operative_procedure: self.operative_procedure.clone(),
            feelings_and_urge: self.feelings_and_urge.clone(),
            disease: self.disease.clone(),
            critical_feelings: self.critical_feelings.clone(),
            ..Patient::blank()
        }
    }
}

fn require_user(session: &SessionStore) -> Result<i64, Box<dyn std::error::Error>> {
    session
        .id()
        .ok_or_else(|| "Not logged in. Run 'hrc login <email> <password>' first.".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hrc=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'hrc --help' for commands");
        return Ok(());
    };

    let config = ConsoleConfig::from_lookup(|key| std::env::var(key).ok())?;
    let session = SessionStore::open(Arc::new(FileStorage::open(config.session_file())?));
    let gateway = Gateway::new(config.endpoints().clone())?;

    match command {
        Commands::Login { email, password } => {
            let credentials = LoginForm { email, password }.validate()?;
            match auth::login(&gateway, &session, &credentials).await {
                LoginOutcome::Authenticated {
                    identity,
                    home_route,
                } => println!("Logged in as {} (home: {})", identity.name, home_route),
                LoginOutcome::Rejected(reason) => eprintln!("{reason}"),
            }
        }
        Commands::Logout => {
            session.logout()?;
            println!("Logged out");
        }
        Commands::Whoami => match session.current() {
            Some(user) => println!(
                "ID: {}, Name: {}, Role: {}, Navigation: {}",
                user.id,
                user.name,
                user.role.code(),
                user.role.navigation().join(", ")
            ),
            None => println!("Not logged in"),
        },
        Commands::Profile => {
            let user_id = require_user(&session)?;
            match gateway.doctor_profile(user_id).await? {
                Some(doctor) => println!(
                    "ID: {}, Name: {}, Email: {}, Rank: {}, Phone: {}, Patients: {}, Active: {}, Born: {}",
                    doctor.account.id,
                    doctor.account.name,
                    doctor.account.email,
                    doctor.rank,
                    doctor.phone_number,
                    doctor.number_of_patients,
                    doctor.active,
                    doctor.date_of_birth
                ),
                None => println!("No doctor record for user {user_id}."),
            }
        }
        Commands::Health => {
            let poller = HealthPoller::new(gateway, config.probe_timeout());
            let table = poller.poll(&Service::DASHBOARD).await;
            for report in table.rows() {
                match &report.error {
                    Some(error) => println!(
                        "{:<12} {:<12} {} ({error})",
                        report.service, report.status, report.checked_at
                    ),
                    None => println!(
                        "{:<12} {:<12} {}",
                        report.service, report.status, report.checked_at
                    ),
                }
            }
            println!(
                "{} operational, {} down",
                table.count(ServiceStatus::Operational),
                table.count(ServiceStatus::Down)
            );
        }
        Commands::Accounts { command } => {
            let user_id = require_user(&session)?;
            match command {
                AccountCommands::List => {
                    let accounts = gateway.list_accounts(user_id).await?;
                    if accounts.is_empty() {
                        println!("No accounts found.");
                    }
                    for account in accounts {
                        println!(
                            "ID: {}, Name: {}, Email: {}, Role: {}",
                            account.id,
                            account.name,
                            account.email,
                            account.role.code()
                        );
                    }
                }
                AccountCommands::Create {
                    email,
                    username,
                    password,
                    role,
                } => {
                    let account = NewAccountForm {
                        email,
                        username,
                        password,
                        role,
                    }
                    .validate()?;
                    let response = gateway.create_account(&account).await?;
                    println!("Created: {}", response.success);
                }
                AccountCommands::Delete { id } => {
                    let accounts = gateway.list_accounts(user_id).await?;
                    match accounts.iter().find(|account| account.id == id) {
                        Some(account) => {
                            let response = gateway.delete_account(account).await?;
                            println!("Deleted: {}", response.success);
                        }
                        None => eprintln!("Account {id} not found"),
                    }
                }
            }
        }
        Commands::Patients { command } => {
            let user_id = require_user(&session)?;
            match command {
                PatientCommands::List { filter } => {
                    let patients = gateway.list_patients(user_id).await?;
                    let filter = filter.unwrap_or_default();
                    let mut shown = 0;
                    for patient in patients.iter().filter(|p| p.matches_filter(&filter)) {
                        shown += 1;
                        println!(
                            "Name: {}, Age: {}, Email: {}, Phone: {}",
                            patient.name, patient.age, patient.email, patient.phone_number
                        );
                    }
                    if shown == 0 {
                        println!("No patients found.");
                    }
                }
                PatientCommands::Create {
                    name,
                    age,
                    email,
                    image,
                    phone,
                } => {
                    let patient = NewPatientForm {
                        name,
                        age,
                        email,
                        phone_number: phone,
                        image,
                    }
                    .validate(user_id)?;
                    let response = gateway.create_patient(&patient).await?;
                    println!("{}", response.message);
                }
            }
        }
        Commands::Datasets => {
            for dataset in gateway.list_datasets().await? {
                let models: Vec<&str> = dataset.models.iter().map(|m| m.name.as_str()).collect();
                println!(
                    "{}: {} ({} lines, weight {}) models: {}",
                    dataset.key,
                    dataset.name,
                    dataset.number_of_lines,
                    dataset.relative_weight,
                    models.join(", ")
                );
            }
        }
        Commands::Enums => {
            let enums = gateway.get_enums().await?;
            println!("Operative procedure: {}", enums.operative_procedure.join(", "));
            println!("Feelings and urge: {}", enums.feelings_and_urge.join(", "));
            println!("Disease: {}", enums.disease.join(", "));
            println!("Critical feelings: {}", enums.critical_feelings.join(", "));
        }
        Commands::Widgets => match gateway.widgets().await? {
            Some(widgets) => {
                println!("Total users: {}", widgets.total_users);
                println!("Active users: {}", widgets.active_users);
                println!("Non-active users: {}", widgets.non_active_users);
                println!("Admins: {}", widgets.total_admins);
                println!("Doctors: {}", widgets.total_doctors);
                println!("Patients: {}", widgets.total_patients);
                println!("Algorithms: {}", widgets.total_algorithms);
                println!("Rank of success: {}", widgets.rank_of_success);
                println!("Usages: {}", widgets.total_usages);
                println!("Labeled models: {}", widgets.labeled_models);
                println!("Unlabeled models: {}", widgets.unlabeled_models);
            }
            None => eprintln!("Widgets unavailable"),
        },
        Commands::Assess(args) => {
            let mut flow = AssessmentFlow::new();
            flow.select_patient(args.patient())?;
            flow.rate(
                args.disease_rating,
                args.ckd_rating,
                args.sir_rating,
                args.ma_rating,
            )?;
            let report = assessment::submit(&gateway, &mut flow).await?;
            println!("{}", report.assessment);
            for component in &report.components {
                println!("  [{:<12}] {}", component.tier, component.text);
            }
        }
    }

    Ok(())
}
