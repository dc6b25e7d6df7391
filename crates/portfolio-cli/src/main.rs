//! Portfolio CLI - project health and risk analysis

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use portfolio_core::analysis::Analyzer;
use portfolio_core::commands::{
    DashboardStats, HistoryRepository, ProjectFilters, ProjectRepository, TaskFilters,
    TaskRepository, get_dashboard_stats,
};
use portfolio_core::config::Config;
use portfolio_core::domain::{
    AiAnalysis, NewHistoryEntry, NewProject, NewTask, Priority, Project, ProjectPatch,
    ProjectStatus, Task, TaskPatch, TaskStatus,
};
use portfolio_core::risk::{ProjectRiskLevel, TaskRiskAssessment, TaskRiskLevel};
use portfolio_core::storage::Database;
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "portfolio")]
#[command(author, version, about = "Project portfolio health and risk analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Database file (overrides database.path from the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Portfolio-wide counters
    Dashboard,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(clap::Args, Default)]
struct ProjectFields {
    #[arg(long)]
    description: Option<String>,
    /// Status (planning, in_progress, completed, on_hold, cancelled)
    #[arg(long)]
    status: Option<String>,
    /// Priority (low, medium, high, critical)
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Total budget
    #[arg(long)]
    budget: Option<f64>,
    /// Budget consumed so far
    #[arg(long)]
    consumed: Option<f64>,
    /// Actual progress, 0-100
    #[arg(long)]
    progress: Option<f64>,
    /// Project leader
    #[arg(long)]
    leader: Option<String>,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects
    List {
        /// Code contains
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// Projects still running on or after this date
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Projects started on or before this date
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Risk tier (green, yellow, red)
        #[arg(long, value_parser = parse_project_risk)]
        risk: Option<ProjectRiskLevel>,
    },
    /// Show project details with tasks and history
    Show { id: i64 },
    /// Create a project
    Create {
        name: String,
        /// Explicit code; generated when omitted
        #[arg(long)]
        code: Option<String>,
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Update a project
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProjectFields,
        /// Author recorded in the history
        #[arg(long)]
        changed_by: Option<String>,
    },
    /// Delete a project with its tasks and history
    Delete {
        id: i64,
        #[arg(long)]
        force: bool,
    },
    /// Show the AI analysis, running one when none is stored
    Analyze {
        id: i64,
        /// Run a new analysis even when one is stored
        #[arg(long)]
        refresh: bool,
    },
    /// Show the change history, or add a note to it
    History {
        id: i64,
        /// Record a note instead of listing
        #[arg(long)]
        note: Option<String>,
        /// Author of the note
        #[arg(long)]
        by: Option<String>,
    },
}

#[derive(clap::Args, Default)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    stage: Option<String>,
    #[arg(long)]
    milestone: Option<String>,
    /// Status (Pendiente, En Progreso, Completada, Bloqueada, Cancelada)
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    responsible: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Actual progress, 0-100
    #[arg(long)]
    progress: Option<f64>,
}

#[derive(Subcommand)]
enum TaskAction {
    /// List a project's tasks
    List {
        project_id: i64,
        /// Task code contains
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        milestone: Option<String>,
        /// Responsible contains
        #[arg(long)]
        responsible: Option<String>,
        /// Risk level (low, medium, high, critical, unknown)
        #[arg(long, value_parser = parse_task_risk)]
        risk: Option<TaskRiskLevel>,
    },
    /// Show a task
    Show { code: String },
    /// Create a task under a project
    Create {
        project_id: i64,
        name: String,
        /// Explicit code; generated from the project code when omitted
        #[arg(long)]
        code: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Update a task
    Update {
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    Delete { code: String },
    /// Score a task's risk
    Score { code: String },
    /// Task statistics for a project
    Stats { project_id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority '{s}'"))
}

fn parse_project_risk(s: &str) -> Result<ProjectRiskLevel, String> {
    ProjectRiskLevel::parse(s).ok_or_else(|| format!("unknown risk tier '{s}'"))
}

fn parse_task_risk(s: &str) -> Result<TaskRiskLevel, String> {
    TaskRiskLevel::parse(s).ok_or_else(|| format!("unknown risk level '{s}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_directive = if cli.quiet {
        "portfolio=warn"
    } else {
        "portfolio=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print an error with its code and suggestion when it comes from the core
fn report(error: &anyhow::Error) {
    match error.downcast_ref::<portfolio_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Config { action } => cmd_config(action, out),
        Commands::Doctor => cmd_doctor(cli.db, out).await,
        command => {
            let config = Config::load()?;
            let db = open_database(&config, cli.db).await?;
            let result = match command {
                Commands::Projects { action } => cmd_projects(&db, &config, action, out).await,
                Commands::Tasks { action } => cmd_tasks(&db, action, out).await,
                Commands::Dashboard => cmd_dashboard(&db, out).await,
                Commands::Config { .. } | Commands::Doctor => Ok(()),
            };
            db.close().await;
            result
        }
    }
}

async fn open_database(config: &Config, path: Option<PathBuf>) -> anyhow::Result<Database> {
    let path = path.unwrap_or_else(|| config.database_path());
    debug!(path = %path.display(), "Opening database");
    Database::open(path).await
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    /// JSON output bypasses the text renderer and ignores `--quiet`
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(value),
        }
        Ok(())
    }

    /// One-line confirmation, silenced by `--quiet`
    fn done(&self, message: impl std::fmt::Display) {
        if !self.quiet && self.format == OutputFormat::Text {
            println!("{}", message);
        }
    }
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_project_line(p: &Project) {
    println!(
        "  {:>4}  {:<18} {:<32} {:<17} {:>5.1}%  {}",
        p.id,
        p.code,
        p.name,
        p.status_label,
        p.actual_progress,
        p.ai_risk_level.map(|r| r.as_str()).unwrap_or("unknown")
    );
}

fn print_task_line(t: &Task) {
    println!(
        "  {:<22} {:<32} {:<12} {:>5.1}%  {:<8} {}",
        t.task_code,
        t.name,
        t.status,
        t.actual_progress,
        t.ai_risk_level.map(|r| r.as_str()).unwrap_or("unknown"),
        t.responsible.as_deref().unwrap_or("-")
    );
}

fn print_project(p: &Project) {
    println!("Project: {} ({})", p.name, p.code);
    println!("  ID: {}", p.id);
    println!("  Status: {}", p.status_label);
    println!("  Priority: {}", p.priority.as_str());
    println!("  Leader: {}", p.leader);
    if let Some(desc) = &p.description {
        println!("  Description: {}", desc);
    }
    println!("  Dates: {} -> {}", date(p.start_date), date(p.end_date));
    println!(
        "  Progress: {:.1}% actual / {:.1}% planned ({:+.1} pts)",
        p.actual_progress,
        p.planned_progress,
        p.schedule_deviation()
    );
    println!(
        "  Budget: {:.2} consumed of {:.2}",
        p.budget_consumed, p.budget_total
    );
    match (&p.ai_analysis, p.ai_risk_level) {
        (Some(analysis), Some(risk)) => println!(
            "  Health: {:.0}/100 ({}){}",
            analysis.health_score,
            risk,
            if analysis.synthetic { " [local]" } else { "" }
        ),
        _ => println!("  Health: not analyzed"),
    }

    if !p.tasks.is_empty() {
        println!();
        println!("Tasks:");
        for task in &p.tasks {
            print_task_line(task);
        }
    }
    if !p.history.is_empty() {
        println!();
        println!("History:");
        for entry in &p.history {
            println!(
                "  {}  {}",
                entry
                    .change_date
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                entry.summary()
            );
        }
    }
}

fn print_analysis(a: &AiAnalysis) {
    println!("Analysis: {}", a.status);
    println!("  Health score: {:.0}/100", a.health_score);
    println!("  Confidence: {:.0}%", a.confidence_level);
    println!("  Predicted completion: {}", a.predicted_completion_date);
    println!(
        "  SPI {:.2}  CPI {:.2}  Tasks done {:.1}%  Critical issues {}",
        a.key_metrics.schedule_performance_index,
        a.key_metrics.cost_performance_index,
        a.key_metrics.task_completion_rate,
        a.key_metrics.critical_issues_count
    );
    if a.synthetic {
        println!("  (synthesized locally)");
    }
    println!();
    println!("Risks:");
    for risk in &a.risks {
        println!("  [{}] {}: {}", risk.severity, risk.category, risk.description);
        println!("      Mitigation: {}", risk.mitigation);
    }
    println!();
    println!("Recommendations:");
    for rec in &a.recommendations {
        println!("  [{}] {} ({})", rec.priority, rec.action, rec.timeframe);
    }
    if !a.insights.is_empty() {
        println!();
        println!("Insights:");
        for insight in &a.insights {
            println!("  - {}", insight);
        }
    }
}

fn print_task(t: &Task) {
    println!("Task: {} ({})", t.name, t.task_code);
    println!("  Project: {}", t.project_id);
    println!("  Status: {}", t.status);
    println!("  Progress: {:.1}%", t.actual_progress);
    println!("  Responsible: {}", t.responsible.as_deref().unwrap_or("-"));
    if let Some(stage) = &t.stage {
        println!("  Stage: {}", stage);
    }
    if let Some(milestone) = &t.milestone {
        println!("  Milestone: {}", milestone);
    }
    println!("  Dates: {} -> {}", date(t.start_date), date(t.end_date));
    println!(
        "  Risk: {}",
        t.ai_risk_level.map(|r| r.as_str()).unwrap_or("unknown")
    );
    for reason in &t.ai_risk_reasons {
        println!("    - {}", reason);
    }
}

fn print_assessment(a: &TaskRiskAssessment) {
    println!("Risk: {} (score {})", a.risk_level, a.risk_score);
    for factor in &a.factors {
        println!("  +{:<3} {}: {}", factor.points, factor.factor, factor.description);
    }
    if !a.recommendations.is_empty() {
        println!("Recommendations:");
        for rec in &a.recommendations {
            println!("  - {}", rec.action);
        }
    }
}

fn print_dashboard(stats: &DashboardStats) {
    let o = &stats.overview;
    println!("Portfolio Dashboard");
    println!("===================");
    println!("  Projects: {}", o.total_projects);
    println!("  Tasks: {} ({} completed, {:.2}%)", o.total_tasks, stats.tasks.completed, o.completion_rate);
    println!("  Total budget: {:.2}", o.total_budget);
    println!("  Average budget: {:.2}", o.avg_budget);

    let sections = [
        ("Projects by status", &stats.projects.by_status),
        ("Projects by priority", &stats.projects.by_priority),
        ("Projects by risk", &stats.projects.by_risk),
        ("Tasks by status", &stats.tasks.by_status),
    ];
    for (title, counts) in sections {
        if counts.is_empty() {
            continue;
        }
        println!();
        println!("{}:", title);
        for (key, count) in counts {
            println!("  {:<20} {}", key, count);
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_projects(
    db: &Database,
    config: &Config,
    action: ProjectAction,
    out: Output,
) -> anyhow::Result<()> {
    let repo = ProjectRepository::new(db);
    match action {
        ProjectAction::List {
            code,
            status,
            from,
            to,
            risk,
        } => {
            let filters = ProjectFilters {
                code,
                status: status.map(|s| ProjectStatus::parse(&s)),
                start_date: from,
                end_date: to,
                risk_level: risk,
            };
            let projects = repo.list(&filters).await?;
            out.emit(&projects, |projects| {
                if projects.is_empty() {
                    if !out.quiet {
                        println!("No projects found.");
                        println!("\nCreate one with: portfolio projects create <name>");
                    }
                    return;
                }
                if !out.quiet {
                    println!("Projects:");
                }
                for p in projects {
                    print_project_line(p);
                }
            })?;
        }
        ProjectAction::Show { id } => {
            let project = repo.get(id).await?;
            out.emit(&project, print_project)?;
        }
        ProjectAction::Create { name, code, fields } => {
            let new = NewProject {
                name,
                code,
                description: fields.description,
                status: fields.status.map(|s| ProjectStatus::parse(&s)),
                priority: fields.priority,
                start_date: fields.start,
                end_date: fields.end,
                budget_total: fields.budget,
                budget_consumed: fields.consumed,
                actual_progress: fields.progress,
                leader: fields.leader,
            };
            let analyzer = Analyzer::from_config(config)?;
            let project = repo.create(new, &analyzer).await?;
            out.emit(&project, |p| {
                if out.quiet {
                    println!("{}", p.id);
                } else {
                    println!("Project created successfully!");
                    println!("  ID: {}", p.id);
                    println!("  Code: {}", p.code);
                    println!("  Name: {}", p.name);
                    if let Some(analysis) = &p.ai_analysis {
                        println!("  Health score: {:.0}/100", analysis.health_score);
                    }
                    println!("\nNext: portfolio tasks create {} <name>", p.id);
                }
            })?;
        }
        ProjectAction::Update {
            id,
            name,
            fields,
            changed_by,
        } => {
            let patch = ProjectPatch {
                name,
                description: fields.description,
                status: fields.status.map(|s| ProjectStatus::parse(&s)),
                priority: fields.priority,
                start_date: fields.start,
                end_date: fields.end,
                budget_total: fields.budget,
                budget_consumed: fields.consumed,
                actual_progress: fields.progress,
                leader: fields.leader,
                changed_by,
            };
            let project = repo.update(id, patch).await?;
            out.emit(&project, |p| {
                if !out.quiet {
                    println!("Project '{}' updated.", p.code);
                }
            })?;
        }
        ProjectAction::Delete { id, force } => {
            if !force {
                if !out.quiet {
                    println!(
                        "Warning: This will permanently delete project {} with its tasks and history.",
                        id
                    );
                    println!("Use --force to confirm deletion.");
                }
                return Ok(());
            }
            repo.delete(id).await?;
            out.done(format!("Project {} deleted.", id));
        }
        ProjectAction::Analyze { id, refresh } => {
            let analyzer = Analyzer::from_config(config)?;
            let analysis = repo.analysis(id, refresh, &analyzer).await?;
            out.emit(&analysis, print_analysis)?;
        }
        ProjectAction::History { id, note, by } => {
            let history = HistoryRepository::new(db);
            match note {
                Some(note) => {
                    let entry = NewHistoryEntry {
                        change_type: "note".to_string(),
                        changed_by: by,
                        description: Some(note),
                        ..Default::default()
                    };
                    let entry = history.add(id, entry).await?;
                    out.emit(&entry, |_| {
                        if !out.quiet {
                            println!("Note recorded on project {}.", id);
                        }
                    })?;
                }
                None => {
                    let entries = history.list(id).await?;
                    out.emit(&entries, |entries| {
                        if entries.is_empty() {
                            if !out.quiet {
                                println!("No history for project {}.", id);
                            }
                            return;
                        }
                        for entry in entries {
                            println!(
                                "  {}  {:<12} {}",
                                entry
                                    .change_date
                                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                                    .unwrap_or_else(|| "-".to_string()),
                                entry.changed_by.as_deref().unwrap_or("-"),
                                entry.summary()
                            );
                        }
                    })?;
                }
            }
        }
    }
    Ok(())
}

async fn cmd_tasks(db: &Database, action: TaskAction, out: Output) -> anyhow::Result<()> {
    let repo = TaskRepository::new(db);
    match action {
        TaskAction::List {
            project_id,
            code,
            stage,
            status,
            milestone,
            responsible,
            risk,
        } => {
            let filters = TaskFilters {
                task_code: code,
                stage,
                status: status.map(|s| TaskStatus::parse(&s)),
                milestone,
                responsible,
                risk_level: risk,
            };
            let tasks = repo.list_by_project(project_id, &filters).await?;
            out.emit(&tasks, |tasks| {
                if tasks.is_empty() {
                    if !out.quiet {
                        println!("No tasks found.");
                        println!(
                            "\nCreate one with: portfolio tasks create {} <name>",
                            project_id
                        );
                    }
                    return;
                }
                if !out.quiet {
                    println!("Tasks:");
                }
                for t in tasks {
                    print_task_line(t);
                }
            })?;
        }
        TaskAction::Show { code } => {
            let task = repo.get_by_code(&code).await?;
            out.emit(&task, print_task)?;
        }
        TaskAction::Create {
            project_id,
            name,
            code,
            fields,
        } => {
            let new = NewTask {
                name,
                task_code: code,
                description: fields.description,
                stage: fields.stage,
                milestone: fields.milestone,
                status: fields.status.map(|s| TaskStatus::parse(&s)),
                responsible: fields.responsible,
                start_date: fields.start,
                end_date: fields.end,
                actual_progress: fields.progress,
            };
            let task = repo.create(project_id, new).await?;
            out.emit(&task, |t| {
                if out.quiet {
                    println!("{}", t.task_code);
                } else {
                    println!("Task created: {}", t.task_code);
                    println!(
                        "  Risk: {}",
                        t.ai_risk_level.map(|r| r.as_str()).unwrap_or("unknown")
                    );
                }
            })?;
        }
        TaskAction::Update { code, name, fields } => {
            let patch = TaskPatch {
                name,
                description: fields.description,
                stage: fields.stage,
                milestone: fields.milestone,
                status: fields.status.map(|s| TaskStatus::parse(&s)),
                responsible: fields.responsible,
                start_date: fields.start,
                end_date: fields.end,
                actual_progress: fields.progress,
            };
            let task = repo.update(&code, patch).await?;
            out.emit(&task, |t| {
                if !out.quiet {
                    println!("Task '{}' updated.", t.task_code);
                }
            })?;
        }
        TaskAction::Delete { code } => {
            repo.delete(&code).await?;
            out.done(format!("Task '{}' deleted.", code));
        }
        TaskAction::Score { code } => {
            let assessment = repo.score(&code).await?;
            out.emit(&assessment, print_assessment)?;
        }
        TaskAction::Stats { project_id } => {
            let stats = repo.statistics(project_id).await?;
            out.emit(&stats, |s| {
                println!("Task Statistics (project {}):", project_id);
                println!("  Total: {}", s.total);
                println!("  Average progress: {}%", s.average_progress);
                println!("  Completion rate: {}%", s.completion_rate);
                println!("  By status:");
                for (status, count) in &s.by_status {
                    println!("    {:<14} {}", status, count);
                }
                println!("  By risk level:");
                for (level, count) in &s.by_risk_level {
                    println!("    {:<14} {}", level, count);
                }
            })?;
        }
    }
    Ok(())
}

async fn cmd_dashboard(db: &Database, out: Output) -> anyhow::Result<()> {
    let stats = get_dashboard_stats(db).await?;
    out.emit(&stats, print_dashboard)
}

fn cmd_config(action: ConfigAction, out: Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            out.done(format!("Set {} = {}", key, config.get(&key)?));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let entries = config.list()?;
            match out.format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = entries
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Text => {
                    for (key, value) in entries {
                        println!("{} = {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            out.done("Configuration reset to defaults.");
        }
    }
    Ok(())
}

async fn cmd_doctor(db_path: Option<PathBuf>, out: Output) -> anyhow::Result<()> {
    let quiet = out.quiet;
    if !quiet {
        println!("Portfolio Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            Config::default()
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    if config.llm.mock_mode {
        if !quiet {
            println!("[--] LLM: Mock mode (analyses are synthesized locally)");
        }
    } else {
        if config.llm.base_url.is_none() || config.llm.token.url.is_none() {
            all_ok = false;
            if !quiet {
                println!("[!!] LLM: llm.base_url and llm.token.url must be set");
            }
        } else if !quiet {
            println!(
                "[OK] LLM: {} ({})",
                config.llm.base_url.as_deref().unwrap_or_default(),
                config.llm.model
            );
        }
        match config.llm.token.redacted_auth() {
            Ok(Some(redacted)) => {
                if !quiet {
                    println!("[OK] Token credentials: Configured ({})", redacted);
                }
            }
            Ok(None) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Token credentials: Not configured");
                    println!(
                        "     Set the {} environment variable",
                        portfolio_core::config::TOKEN_AUTH_ENV
                    );
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Token credentials: Error - {}", e);
                }
            }
        }
    }

    match open_database(&config, db_path).await {
        Ok(db) => {
            match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: Connected");
                        println!("     Path: {}", db.path().display());
                    }
                    match db.migration_status().await {
                        Ok(status) if status.needs_migration => {
                            all_ok = false;
                            if !quiet {
                                println!(
                                    "[!!] Database: Migrations pending (v{} -> v{})",
                                    status.current_version, status.target_version
                                );
                            }
                        }
                        Ok(status) => {
                            if !quiet {
                                println!("[OK] Database: Schema v{}", status.current_version);
                            }
                        }
                        Err(e) => {
                            all_ok = false;
                            if !quiet {
                                println!("[!!] Database: Migration check failed - {}", e);
                            }
                        }
                    }
                    if !quiet {
                        let projects = ProjectRepository::new(&db)
                            .list(&ProjectFilters::default())
                            .await
                            .map(|p| p.len())
                            .unwrap_or_default();
                        println!("     Projects: {}", projects);
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: Health check failed - {}", e);
                    }
                }
            }
            db.close().await;
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {:#}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
