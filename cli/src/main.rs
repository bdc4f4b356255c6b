use clap::{Parser, Subcommand};
use lms::auth::{generate_registration_number, hash_password};
use lms::model::entity::{Course, CourseCreate, UserEntity, UserEntityCreateUpdate};
use lms::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use lms::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the LMS database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// student, teacher or admin
        #[arg(long, default_value = "student")]
        role: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Email of the teaching teacher
        #[arg(long)]
        teacher_email: String,
    },
    Enroll {
        /// Course title to enroll into
        #[arg(long)]
        title: String,
        #[arg(long)]
        student_email: String,
    },
}

async fn find_user(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    email: &str,
) -> lms::error::AppResult<UserEntity> {
    UserEntity::find_by_email(mm, actor, email)
        .await?
        .ok_or_else(|| DatabaseError::SqlxError(sqlx::Error::RowNotFound).into())
}

#[tokio::main]
async fn main() -> lms::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_uri = match std::env::var("DATABASE_URL") {
        Ok(uri) => uri,
        Err(_) => lms::Config::get_or_init(true)
            .await
            .app()
            .database_uri()
            .to_string(),
    };
    let db_con = DbConnection::connect(&database_uri)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                name,
                email,
                password,
                role,
            } => {
                let role = UserRole::from(role.as_str());
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        name,
                        email: email.trim().to_lowercase(),
                        registration_number: generate_registration_number(&role),
                        password_hash: hash_password(&password)?,
                        role,
                    },
                )
                .await?;
                println!(
                    "User created: {} ({})",
                    user.email(),
                    user.registration_number()
                );
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                title,
                description,
                teacher_email,
            } => {
                let teacher = find_user(&mm, &actor, &teacher_email).await?;
                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        title,
                        description,
                        teacher_id: teacher.id(),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }

            CourseCommands::Enroll {
                title,
                student_email,
            } => {
                let course = Course::find_by_title(&mm, &actor, &title)
                    .await?
                    .ok_or(DatabaseError::SqlxError(sqlx::Error::RowNotFound))?;
                let student = find_user(&mm, &actor, &student_email).await?;
                if student.role() != UserRole::Student {
                    return Err(DatabaseError::SqlxError(sqlx::Error::RowNotFound).into());
                }
                course.add_student(&mm, &actor, student.id()).await?;
                println!("Enrolled {} into {}", student.email(), course.title());
            }
        },
    }

    Ok(())
}
