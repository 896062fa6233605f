use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use applytrack::config::Config;
use applytrack::models::{Application, Job, NewResponse, Profile, ResponseType, Resume, Stage};
use applytrack::theme::Theme;
use applytrack::{AppContext, logging};

#[derive(Parser)]
#[command(name = "applytrack")]
#[command(about = "Track job applications and tailored resumes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account
    Signup {
        name: String,

        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign in with a Google identity token
    Google {
        /// ID token from the Google sign-in flow
        #[arg(long)]
        token: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// View or replace your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Browse job postings
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },

    /// Track applications
    Apps {
        #[command(subcommand)]
        command: AppsCommands,
    },

    /// Work on the resume for an application
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Employer responses and reply drafts
    Replies {
        #[command(subcommand)]
        command: RepliesCommands,
    },

    /// Light/dark preference
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Print the profile
    Show,

    /// Replace the profile with the contents of a JSON file
    Save {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum JobsCommands {
    /// Search postings by title, company or description
    Search {
        query: Option<String>,
    },

    /// Show one posting
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum AppsCommands {
    /// List applications
    List,

    /// Apply to a job (promotes an existing draft)
    Apply {
        job_id: String,
    },

    /// Open the resume builder for a job, creating a draft if needed
    Build {
        job_id: String,
    },

    /// Move an application to another stage
    Stage {
        app_id: String,

        /// draft, applied, interview, offer, rejection, withdrawn
        stage: Stage,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Print the current resume
    Show { app_id: String },

    /// Generate the resume from your profile and the job
    Build { app_id: String },

    /// Run an ATS keyword scan
    Ats { app_id: String },

    /// Download the LaTeX source
    Latex { app_id: String },

    /// Download the PDF
    Pdf { app_id: String },
}

#[derive(Subcommand)]
enum RepliesCommands {
    /// List logged responses
    List {
        app_id: String,
    },

    /// Log a response from the employer
    Add {
        app_id: String,

        summary: String,

        /// email, call, interview, offer, rejection, note
        #[arg(short = 't', long = "type", default_value = "email")]
        response_type: ResponseType,

        #[arg(short, long)]
        details: Option<String>,

        #[arg(short, long)]
        contact: Option<String>,
    },

    /// Draft a reply
    Generate {
        app_id: String,

        /// Extra guidance for the draft
        #[arg(short, long)]
        context: Option<String>,
    },
}

#[derive(Subcommand)]
enum ThemeCommands {
    Show,
    Toggle,
    /// light or dark
    Set { theme: String },
}

fn require_session(ctx: &AppContext) -> Result<()> {
    if !ctx.session.is_authenticated() {
        bail!("Not signed in. Run `applytrack login <email> --password <password>` first.");
    }
    Ok(())
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!("{:<6} {:<30} {:<20} {:<18} {:>22}", "ID", "TITLE", "COMPANY", "LOCATION", "SALARY");
    println!("{}", "-".repeat(100));
    for job in jobs {
        println!(
            "{:<6} {:<30} {:<20} {:<18} {:>22}",
            truncate(&job.id, 6),
            truncate(&job.title, 28),
            truncate(&job.company, 18),
            truncate(&job.location, 16),
            job.salary.as_deref().unwrap_or("-")
        );
    }
}

fn print_applications(apps: &[Application]) {
    if apps.is_empty() {
        println!("No applications yet.");
        return;
    }
    println!("{:<16} {:<10} {:<30} {:<20} {:<12}", "ID", "STAGE", "JOB", "COMPANY", "APPLIED");
    println!("{}", "-".repeat(92));
    for app in apps {
        let (title, company) = match &app.job {
            Some(job) => (job.title.as_str(), job.company.as_str()),
            None => (app.job_id.as_str(), ""),
        };
        println!(
            "{:<16} {:<10} {:<30} {:<20} {:<12}",
            truncate(&app.id, 16),
            app.stage,
            truncate(title, 28),
            truncate(company, 18),
            app.date_applied.as_deref().unwrap_or("-")
        );
    }
}

fn print_resume(resume: &Resume) {
    println!("Resume for application #{}", resume.application_id);
    if !resume.header.is_empty() {
        println!("{}", resume.header);
    }
    if let Some(summary) = &resume.summary {
        println!("\n{}", summary);
    }
    if !resume.experience.is_empty() {
        println!("\nExperience:");
        for exp in &resume.experience {
            println!("  {} - {} ({} - {})", exp.position, exp.company, exp.start_date, exp.end_date);
            for line in &exp.description {
                println!("    * {}", line);
            }
        }
    }
    if !resume.projects.is_empty() {
        println!("\nProjects:");
        for project in &resume.projects {
            println!("  {}: {}", project.name, project.description);
        }
    }
    if !resume.education.is_empty() {
        println!("\nEducation:");
        for edu in &resume.education {
            println!("  {} {}, {}", edu.degree, edu.field, edu.school);
        }
    }
    if !resume.tech_stack.is_empty() {
        println!("\nTech: {}", resume.tech_stack.join(", "));
    }
    if let Some(updated) = &resume.last_updated {
        println!("\nLast updated: {}", updated);
    }
}

fn print_profile(profile: &Profile) {
    if profile.email.is_empty() && profile.name.is_empty() {
        println!("Profile is empty. Save one with `applytrack profile save <file.json>`.");
        return;
    }
    println!("{} <{}>", profile.name, profile.email);
    println!("Education:   {}", profile.education.len());
    println!("Experience:  {}", profile.experience.len());
    println!("Projects:    {}", profile.projects.len());
    if !profile.tech_stack.is_empty() {
        println!("Tech stack:  {}", profile.tech_stack.join(", "));
    }
    if !profile.programming_languages.is_empty() {
        println!("Languages:   {}", profile.programming_languages.join(", "));
    }
    for link in &profile.links {
        println!("{}: {}", link.label, link.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    logging::init(&config);
    let ctx = AppContext::from_config(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            let user = ctx.auth.login(&email, &password).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }

        Commands::Signup {
            name,
            email,
            password,
        } => {
            let user = ctx.auth.signup(&name, &email, &password).await?;
            println!("Account created. Signed in as {} <{}>", user.name, user.email);
        }

        Commands::Google { token } => {
            let user = ctx.auth.google(token.as_deref()).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }

        Commands::Logout => {
            ctx.auth.logout()?;
            println!("Signed out.");
        }

        Commands::Whoami => match ctx.session.user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                println!("User ID: {}", user.id);
            }
            None => println!("Not signed in."),
        },

        Commands::Profile { command } => {
            require_session(&ctx)?;
            match command {
                ProfileCommands::Show => {
                    let profile = ctx.profile.get().await?;
                    print_profile(&profile);
                }

                ProfileCommands::Save { file } => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read profile file: {}", file.display()))?;
                    let profile: Profile = serde_json::from_str(&raw)
                        .with_context(|| format!("Invalid profile JSON in {}", file.display()))?;
                    let saved = ctx.profile.save(&profile).await?;
                    println!("Saved profile for {}", saved.email);
                }
            }
        }

        Commands::Jobs { command } => {
            require_session(&ctx)?;
            match command {
                JobsCommands::Search { query } => {
                    let jobs = ctx.jobs.search(query.as_deref().unwrap_or("")).await?;
                    print_jobs(&jobs);
                }

                JobsCommands::Show { id } => {
                    let job = ctx.jobs.get(&id).await?;
                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    println!("Company: {}", job.company);
                    println!("Location: {}", job.location);
                    if let Some(salary) = &job.salary {
                        println!("Salary: {}", salary);
                    }
                    if !job.tags.is_empty() {
                        println!("Tags: {}", job.tags.join(", "));
                    }
                    if !job.posted_date.is_empty() {
                        println!("Posted: {}", job.posted_date);
                    }
                    println!("\n--- Description ---\n{}", job.description);
                }
            }
        }

        Commands::Apps { command } => {
            require_session(&ctx)?;
            match command {
                AppsCommands::List => {
                    let apps = ctx.reconciler.applications().await?;
                    print_applications(&apps);
                }

                AppsCommands::Apply { job_id } => {
                    let outcome = ctx.reconciler.apply(&job_id).await?;
                    match outcome.application() {
                        Some(app) => println!("{} (application #{})", outcome, app.id),
                        None => println!("{}", outcome),
                    }
                }

                AppsCommands::Build { job_id } => {
                    let target = ctx.reconciler.build_resume(&job_id).await?;
                    if target.created {
                        println!("Created draft application #{}", target.application_id);
                    }
                    println!("Opened resume builder at {}", target.route);
                }

                AppsCommands::Stage { app_id, stage } => {
                    let app = ctx.reconciler.set_stage(&app_id, stage).await?;
                    println!("Application #{} is now {}", app.id, app.stage);
                }
            }
        }

        Commands::Resume { command } => {
            require_session(&ctx)?;
            match command {
                ResumeCommands::Show { app_id } => {
                    print_resume(&ctx.resume.get(&app_id).await?);
                }

                ResumeCommands::Build { app_id } => {
                    println!("Building resume for application #{}...", app_id);
                    print_resume(&ctx.resume.build(&app_id).await?);
                }

                ResumeCommands::Ats { app_id } => {
                    let result = ctx.resume.ats_scan(&app_id).await?;
                    println!("ATS score: {:.0}", result.score);
                    if !result.matched_keywords.is_empty() {
                        println!("Matched:  {}", result.matched_keywords.join(", "));
                    }
                    if !result.missing_keywords.is_empty() {
                        println!("Missing:  {}", result.missing_keywords.join(", "));
                    }
                    for strength in &result.strengths {
                        println!("  + {}", strength);
                    }
                    for improvement in &result.improvements {
                        println!("  - {}", improvement);
                    }
                }

                ResumeCommands::Latex { app_id } => {
                    let path = ctx.resume.download_latex(&app_id).await?;
                    println!("Saved {}", path.display());
                }

                ResumeCommands::Pdf { app_id } => {
                    let path = ctx.resume.download_pdf(&app_id).await?;
                    println!("Saved {}", path.display());
                }
            }
        }

        Commands::Replies { command } => {
            require_session(&ctx)?;
            match command {
                RepliesCommands::List { app_id } => {
                    let responses = ctx.communications.list(&app_id).await?;
                    if responses.is_empty() {
                        println!("No responses logged for application #{}.", app_id);
                    } else {
                        println!("{:<16} {:<10} {:<26} {:<40}", "ID", "TYPE", "RECEIVED", "SUMMARY");
                        println!("{}", "-".repeat(95));
                        for response in responses {
                            println!(
                                "{:<16} {:<10} {:<26} {:<40}",
                                truncate(&response.id, 16),
                                response.response_type.as_str(),
                                truncate(&response.received_at, 25),
                                truncate(&response.summary, 40)
                            );
                        }
                    }
                }

                RepliesCommands::Add {
                    app_id,
                    summary,
                    response_type,
                    details,
                    contact,
                } => {
                    let response = ctx
                        .communications
                        .add(
                            &app_id,
                            &NewResponse {
                                response_type,
                                summary,
                                details,
                                contact,
                            },
                        )
                        .await?;
                    println!("Logged response #{} for application #{}", response.id, app_id);
                }

                RepliesCommands::Generate { app_id, context } => {
                    let reply = ctx
                        .communications
                        .generate_reply(&app_id, context.as_deref())
                        .await?;
                    println!("{}", reply);
                }
            }
        }

        Commands::Theme { command } => match command {
            ThemeCommands::Show => println!("{}", ctx.theme.theme().as_str()),
            ThemeCommands::Toggle => {
                let theme = ctx.theme.toggle()?;
                println!("Theme set to {}", theme.as_str());
            }
            ThemeCommands::Set { theme } => {
                let parsed = Theme::parse(&theme.to_lowercase())
                    .ok_or_else(|| anyhow!("Unknown theme '{}' (expected light or dark)", theme))?;
                ctx.theme.set(parsed)?;
                println!("Theme set to {}", parsed.as_str());
            }
        },
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
