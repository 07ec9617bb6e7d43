//! # Demo Data Seeder
//!
//! Fills a database with a small, realistic shift: catalogs, a registered
//! till, tickets in every sync status, queue tokens and kitchen tickets.
//!
//! ## Usage
//! ```bash
//! # Seed 20 tickets (default)
//! cargo run -p till-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p till-db --bin seed -- --tickets 200 --db ./data/till.db
//! ```
//!
//! Refuses to run against a database that already has a device profile.

use std::env;

use till_core::{
    CatalogItem, CatalogKind, DeviceRole, NewDeviceProfile, NewKitchenTicket, NewQueueToken,
    NewTicket, Payload, SyncStatus,
};
use till_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

const LOCATION: &str = "store-1";

/// (id, name) per catalog.
const CATALOGS: &[(CatalogKind, &[(&str, &str)])] = &[
    (
        CatalogKind::Categories,
        &[("cat-burgers", "Burgers"), ("cat-drinks", "Drinks"), ("cat-sides", "Sides")],
    ),
    (CatalogKind::Locations, &[(LOCATION, "Main Street")]),
    (
        CatalogKind::PaymentMethods,
        &[("pm-cash", "Cash"), ("pm-card", "Card")],
    ),
    (
        CatalogKind::ProductGroups,
        &[("pg-hot", "Hot Kitchen"), ("pg-bar", "Bar")],
    ),
    (
        CatalogKind::TransactionTypes,
        &[("tt-sale", "Sale"), ("tt-refund", "Refund")],
    ),
];

const ORDER_MODES: &[&str] = &["dine-in", "takeaway", "delivery"];

const MENU: &[(&str, &str)] = &[
    ("Cheeseburger", "8.50"),
    ("Fries", "3.25"),
    ("Cola", "2.00"),
    ("Veggie Wrap", "7.75"),
    ("Milkshake", "4.50"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,till=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tickets" | "-t" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tickets <N>  Number of tickets to create (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Demo Data Seeder");
    println!("========================");
    println!("Database: {}", db_path);
    println!("Tickets:  {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if let Some(device) = db.devices().get_active().await? {
        println!("⚠ Database already belongs to device '{}'", device.name);
        println!("  Skipping seed to avoid mixing data.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Catalogs
    for (kind, entries) in CATALOGS {
        let items: Vec<CatalogItem> = entries
            .iter()
            .enumerate()
            .map(|(position, (id, name))| catalog_item(id, name, position as i64))
            .collect::<Result<_, _>>()?;
        db.catalog(*kind).save(&items).await?;
        println!("✓ {}: {} entries", kind, items.len());
    }

    // Device
    let device = db
        .devices()
        .register(NewDeviceProfile {
            name: "Till-1".to_string(),
            role: DeviceRole::Pos,
            config: Payload::parse("config", r#"{"printer":"front","drawer":true}"#)?,
        })
        .await?;
    db.devices().mark_synced(&device.id).await?;
    println!("✓ Registered device {}", device.name);

    // Tickets, tokens and kitchen tickets
    let tickets = db.tickets();
    let queue = db.queue_tokens();
    let kitchen = db.kitchen_tickets();

    for n in 0..count {
        let (item_name, price) = MENU[n % MENU.len()];
        let quantity = n % 3 + 1;
        let order_mode = ORDER_MODES[n % ORDER_MODES.len()];
        let ticket_number = format!("A-{}", 100 + n);

        let payload = Payload::parse(
            "ticket_data",
            serde_json::json!({
                "ticket": { "ticket_amount": price, "number": ticket_number },
                "orders": vec![serde_json::json!({ "name": item_name }); quantity],
            })
            .to_string(),
        )?;

        let ticket = tickets
            .create(NewTicket {
                payload,
                location_id: LOCATION.to_string(),
                order_mode_name: order_mode.to_string(),
                queue_number: None,
                ticket_number: Some(100 + n as i64),
            })
            .await?;

        // Spread tickets over every sync status
        match n % 4 {
            1 => {
                tickets.mark_syncing(&ticket.id).await?;
            }
            2 => {
                tickets.mark_syncing(&ticket.id).await?;
                tickets.mark_synced(&ticket.id).await?;
            }
            3 => {
                tickets.mark_syncing(&ticket.id).await?;
                tickets.mark_failed(&ticket.id, "server unreachable").await?;
            }
            _ => {}
        }

        let token = queue
            .issue(NewQueueToken {
                ticket_id: ticket.id.clone(),
                ticket_number: ticket_number.clone(),
                location_id: LOCATION.to_string(),
                order_mode: order_mode.to_string(),
                source: DeviceRole::Pos,
            })
            .await?;

        let kitchen_ticket = kitchen
            .create(NewKitchenTicket {
                ticket_number,
                order_id: Some(ticket.id.clone()),
                location_id: LOCATION.to_string(),
                order_mode_name: order_mode.to_string(),
                items: Payload::parse(
                    "items",
                    serde_json::json!([{ "name": item_name, "qty": quantity }]).to_string(),
                )?,
                total_amount_cents: ticket.amount_cents,
                token_number: Some(token.token_number),
            })
            .await?;

        // The older half of the shift is further along
        if n < count / 2 {
            queue.call_by_number(token.token_number, LOCATION).await?;
            kitchen.advance(&kitchen_ticket.id).await?;
            if n < count / 4 {
                queue.serve_by_number(token.token_number, LOCATION).await?;
                kitchen.advance(&kitchen_ticket.id).await?;
            }
        }
    }

    let stats = tickets.sync_stats().await?;
    let elapsed = start.elapsed();

    println!();
    println!("✓ Created {} tickets in {:.2?}", count, elapsed);
    for status in SyncStatus::ALL {
        let n = match status {
            SyncStatus::Pending => stats.pending,
            SyncStatus::Syncing => stats.syncing,
            SyncStatus::Synced => stats.synced,
            SyncStatus::Failed => stats.failed,
        };
        println!("  {:<8} {}", status.as_str(), n);
    }
    println!("  active queue tokens:    {}", queue.list_active().await?.len());
    println!("  active kitchen tickets: {}", kitchen.list_active().await?.len());

    db.close().await;
    Ok(())
}

fn catalog_item(id: &str, name: &str, sort_order: i64) -> Result<CatalogItem, till_core::ValidationError> {
    Ok(CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        code: Some(id.to_uppercase()),
        active: true,
        sort_order,
        data: Payload::parse("data", serde_json::json!({ "id": id, "name": name }).to_string())?,
    })
}
