//! # Seed Data Generator
//!
//! Populates a database with a demo business for development.
//!
//! ## Usage
//! ```bash
//! # Default business, tiers, offers and 25 customers
//! cargo run -p loyalty-db --bin seed
//!
//! # More customers, custom file
//! cargo run -p loyalty-db --bin seed -- --customers 200 --db ./data/loyalty.db
//! ```
//!
//! ## Generated Data
//! - One business (`DEFAULT_BUSINESS_ID`): 1 pt/$, 100 pts = $1, minimum 500
//! - Tiers: Bronze 0 / 5%, Silver 500 / 10%, Gold 1000 / 15%
//! - Three offers (Happy Hour, Weekend Warrior, First Time Bonus)
//! - Customers with welcome bonuses, a few topped up into Silver and Gold
//! - One sample checkout with a redemption

use chrono::{NaiveDate, Utc};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use loyalty_core::{
    Business, LoyaltyConfig, MembershipTier, Money, Offer, OfferKind, Percentage, DEFAULT_BUSINESS_ID,
};
use loyalty_db::repository::generate_id;
use loyalty_db::{Database, DbConfig, NewCustomer};

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Mike", "Sarah", "Priya", "Omar", "Lena", "Chen", "Ava", "Diego",
];

const LAST_NAMES: &[&str] = &[
    "Doe", "Smith", "Johnson", "Williams", "Patel", "Haddad", "Novak", "Wei", "Brown", "Garcia",
];

/// (name, points_required, discount %, colour, benefits)
const TIERS: &[(&str, u64, u32, &str, &[&str])] = &[
    ("Bronze", 0, 5, "#CD7F32", &["5% off every purchase"]),
    ("Silver", 500, 10, "#C0C0C0", &["10% off every purchase", "Birthday bonus"]),
    (
        "Gold",
        1000,
        15,
        "#FFD700",
        &["15% off every purchase", "Birthday bonus", "Early access to offers"],
    ),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,loyalty=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut customers: usize = 25;
    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    customers = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Loyalty Hub Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --customers <N>  Number of customers to enrol (default: 25)");
                println!("  -d, --db <PATH>      Database file path (default: $LOYALTY_DB_PATH or ./loyalty.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %config.database_path.display(), customers, "Seeding");

    let db = Database::new(config).await?;

    if db.businesses().get_by_id(DEFAULT_BUSINESS_ID).await?.is_some() {
        warn!("Default business already exists; delete the database file to regenerate");
        return Ok(());
    }

    let now = Utc::now();
    db.businesses()
        .insert(&Business {
            id: DEFAULT_BUSINESS_ID.to_string(),
            name: "Corner Coffee Co.".to_string(),
            description: Some("Neighbourhood cafe and bakery".to_string()),
            email: Some("hello@cornercoffee.example".to_string()),
            phone: Some("+1 555 0100".to_string()),
            address: Some("12 Market Street".to_string()),
            website: None,
            loyalty: LoyaltyConfig::default(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    for (name, points_required, percent, color, benefits) in TIERS {
        db.tiers()
            .insert(&MembershipTier {
                id: generate_id(),
                business_id: DEFAULT_BUSINESS_ID.to_string(),
                name: name.to_string(),
                description: None,
                points_required: *points_required,
                discount: Percentage::from_percent(*percent),
                benefits: benefits.iter().map(|b| b.to_string()).collect(),
                color: Some(color.to_string()),
            })
            .await?;
    }

    for offer in sample_offers() {
        db.offers().insert(&offer).await?;
    }

    let mut enrolled = Vec::with_capacity(customers);
    for n in 0..customers {
        let first = FIRST_NAMES[n % FIRST_NAMES.len()];
        let last = LAST_NAMES[(n / FIRST_NAMES.len() + n) % LAST_NAMES.len()];
        let customer = db
            .customers()
            .insert(&NewCustomer {
                business_id: DEFAULT_BUSINESS_ID.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!("{}.{}{}@email.com", first.to_lowercase(), last.to_lowercase(), n),
                phone: None,
                birthday: NaiveDate::from_ymd_opt(1980 + (n % 25) as i32, (n % 12) as u32 + 1, 15),
            })
            .await?;
        enrolled.push(customer);
    }

    // top a few customers up into higher tiers
    for (n, customer) in enrolled.iter().enumerate().filter(|(n, _)| n % 3 == 0) {
        let top_up = 600 + (n as i64 * 37) % 900;
        db.customers()
            .adjust_points(DEFAULT_BUSINESS_ID, &customer.id, top_up, Some("seed"))
            .await?;
    }

    if let Some(first) = enrolled.first() {
        let receipt = db
            .checkout(DEFAULT_BUSINESS_ID, &first.id, Money::from_cents(10_000), 500)
            .await?;
        info!(
            customer = %receipt.customer.full_name(),
            total = %receipt.bill.total(),
            balance = %loyalty_core::format_points(receipt.customer.points),
            "Sample checkout"
        );
    }

    let count = db.customers().count(DEFAULT_BUSINESS_ID).await?;
    info!(customers = count, "Seed complete");

    Ok(())
}

fn sample_offers() -> Vec<Offer> {
    let from = NaiveDate::from_ymd_opt(2024, 1, 1);
    let until = NaiveDate::from_ymd_opt(2030, 12, 31);
    let (Some(valid_from), Some(valid_until)) = (from, until) else {
        return Vec::new();
    };

    let offer = |title: &str, description: &str, kind, min_cents, max_uses| Offer {
        id: generate_id(),
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        kind,
        min_purchase: Money::from_cents(min_cents),
        max_uses: Some(max_uses),
        valid_from,
        valid_until,
        is_active: true,
        used_count: 0,
    };

    vec![
        offer(
            "Happy Hour Special",
            "Buy 2 get 1 free on all beverages",
            OfferKind::Percentage(Percentage::from_percent(33)),
            1_500,
            100,
        ),
        offer(
            "Weekend Warrior",
            "25% off all pastries on weekends",
            OfferKind::Percentage(Percentage::from_percent(25)),
            500,
            200,
        ),
        offer(
            "First Time Bonus",
            "$10 off your first order",
            OfferKind::FixedAmount(Money::from_cents(1_000)),
            2_500,
            50,
        ),
    ]
}
