//! Seed data for a fresh Refurb Ops database.
//!
//! Run with: cargo run --bin seed-data -- --admin-email admin@example.com
//!
//! This creates:
//! - one ADMIN account
//! - a starter set of spare parts with minimum stock levels

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use refurb_ops::{
    config, db,
    entities::UserRole,
    errors::ServiceError,
    events::EventSender,
    services::{
        spares::{CreateSparePartInput, SparesService},
        users::{CreateUserInput, UserService},
    },
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Create the first admin and demo spare parts")]
struct Cli {
    #[arg(long, env = "SEED_ADMIN_EMAIL", default_value = "admin@refurb.local")]
    admin_email: String,

    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    admin_password: String,

    #[arg(long, default_value = "Floor Admin")]
    admin_name: String,

    /// Skip the demo spare parts
    #[arg(long)]
    no_spares: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;

    let pool = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?,
    );
    db::run_migrations(&pool).await?;

    let (tx, _rx) = mpsc::channel(64);
    let events = Arc::new(EventSender::new(tx));

    let users = UserService::new(pool.clone());
    let admin = match users
        .create_user(CreateUserInput {
            email: cli.admin_email.clone(),
            name: cli.admin_name,
            password: cli.admin_password,
            role: UserRole::Admin,
        })
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "admin created");
            user.id
        }
        Err(ServiceError::Conflict(_)) => {
            warn!(email = %cli.admin_email, "admin already exists; leaving it untouched");
            Uuid::nil()
        }
        Err(e) => return Err(e.into()),
    };

    if cli.no_spares {
        return Ok(());
    }

    let spares = SparesService::new(pool, events);
    let parts = [
        ("BAT-DL-7490", "Battery 4-cell 60Wh (Latitude 7480/7490)", "Battery", 10, 3, dec!(38.50)),
        ("LCD-14-FHD", "14\" FHD IPS panel, 30-pin eDP", "Display", 6, 2, dec!(52.00)),
        ("KB-DL-7490-US", "Keyboard US backlit (Latitude 7490)", "Keyboard", 12, 4, dec!(18.75)),
        ("SSD-256-NVME", "256GB NVMe M.2 2280", "Storage", 20, 5, dec!(24.00)),
        ("RAM-8G-DDR4", "8GB DDR4-2666 SODIMM", "Memory", 25, 8, dec!(14.20)),
        ("CHG-65W-USBC", "65W USB-C charger", "Accessory", 15, 5, dec!(11.90)),
        ("HNG-TP-T480", "Hinge pair (ThinkPad T480)", "Chassis", 4, 2, dec!(9.60)),
    ];

    let mut created = 0;
    for (code, name, category, stock, min, cost) in parts {
        let result = spares
            .create_part(
                CreateSparePartInput {
                    part_code: code.to_string(),
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    compatible_models: None,
                    initial_stock: stock,
                    min_stock_level: min,
                    rack_location: Some("SP-A1".to_string()),
                    unit_cost: Some(cost),
                },
                admin,
            )
            .await;
        match result {
            Ok(_) => created += 1,
            Err(ServiceError::Conflict(_)) => info!(part_code = code, "already present"),
            Err(e) => return Err(e.into()),
        }
    }
    info!(created, "spare parts seeded");

    Ok(())
}
