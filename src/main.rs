use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use studybank::{
    config::Config,
    hierarchy::Level,
    import::UploadFormat,
    models::{AnswerTag, NewAttempt, NewQuestion, SubmoduleMeta},
    services::Upload,
    App,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,

    AddSubject {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    UpdateSubject {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    AddModule {
        #[arg(long)]
        subject: i64,
        #[arg(long)]
        name: String,
    },

    AddSubmodule {
        #[arg(long)]
        module: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        difficulty: String,
        #[arg(long)]
        pro: bool,
    },

    /// Add one question, read as JSON from a file.
    AddQuestion {
        #[arg(long)]
        submodule: i64,
        file: PathBuf,
    },

    UpdateQuestion {
        id: i64,
        file: PathBuf,
    },

    DeleteQuestion {
        id: i64,
    },

    /// Create a submodule from a JSON, CSV or spreadsheet file of questions.
    Import {
        #[arg(long)]
        module: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        difficulty: String,
        #[arg(long)]
        pro: bool,
        /// Declared MIME type; inferred from the file extension when absent.
        #[arg(long)]
        content_type: Option<String>,
        file: PathBuf,
    },

    /// Enable or disable an entity and everything below it.
    Toggle {
        level: Level,
        id: i64,
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },

    /// Soft delete an entity and everything below it.
    Delete {
        level: Level,
        id: i64,
    },

    Show {
        level: Level,
        id: i64,
        /// For submodules, include the questions.
        #[arg(long)]
        questions: bool,
    },

    List {
        what: Listing,
        /// Parent id; required for everything but subjects.
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        include_disabled: bool,
    },

    /// A subject, looked up by name, with its modules and submodules.
    Tree {
        name: String,
        #[arg(long)]
        include_disabled: bool,
    },

    /// One page of a submodule's questions.
    Page {
        submodule: i64,
        /// Id of the last question of the previous page.
        #[arg(long)]
        after: Option<i64>,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long)]
        include_disabled: bool,
    },

    /// Record a quiz attempt, read as JSON from a file.
    RecordAttempt {
        file: PathBuf,
    },

    Annotate {
        #[arg(long)]
        user: String,
        #[arg(long)]
        submodule: i64,
        #[arg(long)]
        question: i64,
        #[arg(long)]
        tag: Option<AnswerTag>,
        #[arg(long)]
        notes: Option<String>,
    },

    Attempted {
        #[arg(long)]
        user: String,
        #[arg(long)]
        subject: i64,
    },

    Summary {
        #[arg(long)]
        user: String,
        #[arg(long)]
        submodule: Option<i64>,
    },

    Reset {
        #[arg(long)]
        user: String,
        #[arg(long)]
        submodule: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Listing {
    Subjects,
    Modules,
    Submodules,
    Questions,
}

fn print(value: &impl Serialize) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> color_eyre::Result<T> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parent(parent: Option<i64>, what: &str) -> color_eyre::Result<i64> {
    parent.ok_or_else(|| color_eyre::eyre::eyre!("--parent is required when listing {what}"))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "studybank=debug,sqlx=warn".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let app = App::from_config(&args.config).await?;
    let db = &app.db;

    match args.command {
        Command::Migrate => tracing::info!("database is up to date"),
        Command::AddSubject { name, description } => {
            print(&db.create_subject(&name, description.as_deref()).await?)?
        }
        Command::UpdateSubject {
            id,
            name,
            description,
        } => print(&db.update_subject(id, &name, description.as_deref()).await?)?,
        Command::AddModule { subject, name } => print(&db.create_module(subject, &name).await?)?,
        Command::AddSubmodule {
            module,
            name,
            difficulty,
            pro,
        } => {
            let meta = SubmoduleMeta {
                name,
                module_id: module,
                difficulty,
                is_pro: pro,
            };
            print(&db.create_submodule(&meta).await?)?
        }
        Command::AddQuestion { submodule, file } => {
            let question: NewQuestion = read_json(&file).await?;
            print(&db.add_question(submodule, &question).await?)?
        }
        Command::UpdateQuestion { id, file } => {
            let question: NewQuestion = read_json(&file).await?;
            print(&db.update_question(id, &question).await?)?
        }
        Command::DeleteQuestion { id } => {
            app.hierarchy().hard_delete_question(id).await?;
            tracing::info!("question {id} deleted");
        }
        Command::Import {
            module,
            name,
            difficulty,
            pro,
            content_type,
            file,
        } => {
            let content_type = match content_type {
                Some(ct) => ct,
                None => UploadFormat::from_path(&file)?.content_type().to_string(),
            };
            let upload = Upload {
                file_name: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                content_type,
                bytes: tokio::fs::read(&file).await?,
            };
            let meta = SubmoduleMeta {
                name,
                module_id: module,
                difficulty,
                is_pro: pro,
            };
            print(&app.importer().import_questions(meta, upload).await?)?
        }
        Command::Toggle { level, id, active } => {
            print(&app.hierarchy().toggle_active(level, id, active).await?)?
        }
        Command::Delete { level, id } => print(&app.hierarchy().soft_delete(level, id).await?)?,
        Command::Show {
            level: Level::Submodule,
            id,
            questions: true,
        } => print(&db.submodule_with_questions(id).await?)?,
        Command::Show { level, id, .. } => print(&db.node(level, id).await?)?,
        Command::List {
            what,
            parent: parent_id,
            search,
            include_disabled,
        } => match what {
            Listing::Subjects => print(&db.subjects(search.as_deref(), include_disabled).await?)?,
            Listing::Modules => {
                let subject = parent(parent_id, "modules")?;
                print(&db.modules(subject, include_disabled).await?)?
            }
            Listing::Submodules => {
                let module = parent(parent_id, "submodules")?;
                print(&db.submodules(module, include_disabled).await?)?
            }
            Listing::Questions => {
                let submodule = parent(parent_id, "questions")?;
                print(&db.questions(submodule, include_disabled).await?)?
            }
        },
        Command::Tree {
            name,
            include_disabled,
        } => print(&db.subject_tree(&name, include_disabled).await?)?,
        Command::Page {
            submodule,
            after,
            limit,
            include_disabled,
        } => print(
            &db.questions_page(submodule, after, limit, include_disabled)
                .await?,
        )?,
        Command::RecordAttempt { file } => {
            let attempt: NewAttempt = read_json(&file).await?;
            print(&app.analytics().record(&attempt).await?)?
        }
        Command::Annotate {
            user,
            submodule,
            question,
            tag,
            notes,
        } => print(
            &db.annotate_answer(&user, submodule, question, tag, notes)
                .await?,
        )?,
        Command::Attempted { user, subject } => {
            print(&db.attempted_submodules(&user, subject).await?)?
        }
        Command::Summary { user, submodule } => {
            print(&app.analytics().summary(&user, submodule).await?)?
        }
        Command::Reset { user, submodule } => {
            let deleted = app.analytics().reset(&user, submodule).await?;
            tracing::info!("{deleted} attempts removed");
        }
    }

    Ok(())
}
