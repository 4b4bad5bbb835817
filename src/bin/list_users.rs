//! Operator utility: prints every registered account to stdout.
//!
//! Reads DATABASE_URL from the environment (or .env) like the server does.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    age: Option<i32>,
    marital_status: String,
    children: i32,
    education: Option<String>,
    address: Option<String>,
    has_picture: bool,
    created_at: OffsetDateTime,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connect to database")?;

    let users = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, email, phone, age, marital_status::text AS marital_status,
               children, education, address,
               profile_picture IS NOT NULL AS has_picture, created_at
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(&db)
    .await?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("Total users: {}", users.len());
    println!();
    for (index, user) in users.iter().enumerate() {
        println!("{}. {} <{}>", index + 1, user.name, user.email);
        println!("   id: {}", user.id);
        if let Some(phone) = &user.phone {
            println!("   phone: {phone}");
        }
        if let Some(age) = user.age {
            println!("   age: {age}");
        }
        println!("   marital status: {}", user.marital_status);
        println!("   children: {}", user.children);
        if let Some(education) = &user.education {
            println!("   education: {education}");
        }
        if let Some(address) = &user.address {
            println!("   address: {address}");
        }
        println!(
            "   profile picture: {}",
            if user.has_picture { "yes" } else { "no" }
        );
        println!("   created: {}", user.created_at);
        println!();
    }

    Ok(())
}
