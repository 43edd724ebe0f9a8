//! # Seed Data Generator
//!
//! Populates a database with a demo menu and dining room for development.
//!
//! ## Usage
//! ```bash
//! # 10 tables (default)
//! cargo run -p mesa-db --bin seed
//!
//! # Custom table count and database path
//! cargo run -p mesa-db --bin seed -- --tables 20 --db ./data/mesa.db
//! ```
//!
//! ## Generated Data
//! - Unit-priced dishes and drinks (`PRATO-*`, `BEB-*`)
//! - Weighable buffet items priced per kilogram (`KG-*`)
//! - Tables `Mesa 1..N`, capacity 4, split between the main room and the
//!   terrace

use chrono::Utc;
use std::env;

use mesa_core::{Product, Table, TableStatus};
use mesa_db::repository::product::generate_product_id;
use mesa_db::repository::table::generate_table_id;
use mesa_db::{Database, DbConfig};

/// (code, name, unit price in cents)
const UNIT_PRODUCTS: &[(&str, &str, i64)] = &[
    ("PRATO-FEIJOADA", "Feijoada Completa", 4590),
    ("PRATO-PF", "Prato Feito", 2490),
    ("PRATO-PICANHA", "Picanha na Chapa", 6990),
    ("PRATO-PARMEGIANA", "Filé à Parmegiana", 5490),
    ("BEB-REFRI", "Refrigerante Lata", 650),
    ("BEB-SUCO", "Suco de Laranja", 900),
    ("BEB-AGUA", "Água Mineral", 450),
    ("BEB-CERVEJA", "Cerveja 600ml", 1490),
    ("SOB-PUDIM", "Pudim", 1200),
];

/// (code, name, price per kilogram in cents)
const WEIGHABLE_PRODUCTS: &[(&str, &str, i64)] = &[
    ("KG-BUFFET", "Buffet por Quilo", 7990),
    ("KG-CHURRASCO", "Churrasco por Quilo", 9990),
    ("KG-SALADA", "Salada por Quilo", 4990),
];

const LOCATIONS: &[&str] = &["Área Principal", "Varanda"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut table_count: i64 = 10;
    let mut db_path = String::from("./mesa_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tables" | "-t" => {
                if i + 1 < args.len() {
                    table_count = args[i + 1].parse().unwrap_or(10);
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
                println!("Mesa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tables <N>   Number of tables to create (default: 10)");
                println!("  -d, --db <PATH>    Database file path (default: ./mesa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mesa POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Tables:   {}", table_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating menu...");

    let now = Utc::now();
    let unit = UNIT_PRODUCTS.iter().map(|(code, name, cents)| Product {
        id: generate_product_id(),
        code: code.to_string(),
        name: name.to_string(),
        is_weighable: false,
        unit_price_cents: Some(*cents),
        price_per_gram_millicents: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    });
    // Cents per kilogram and millicents per gram are the same number.
    let weighable = WEIGHABLE_PRODUCTS.iter().map(|(code, name, per_kg)| Product {
        id: generate_product_id(),
        code: code.to_string(),
        name: name.to_string(),
        is_weighable: true,
        unit_price_cents: None,
        price_per_gram_millicents: Some(*per_kg),
        is_active: true,
        created_at: now,
        updated_at: now,
    });

    let mut products = 0;
    for product in unit.chain(weighable) {
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.code, e);
            continue;
        }
        products += 1;
    }
    println!("✓ Created {} products", products);

    println!();
    println!("Creating tables...");

    let mut tables = 0;
    for number in 1..=table_count {
        let table = Table {
            id: generate_table_id(),
            number,
            name: format!("Mesa {}", number),
            capacity: 4,
            status: TableStatus::Free,
            location: Some(LOCATIONS[(number as usize - 1) % LOCATIONS.len()].to_string()),
            is_active: true,
            current_sale_id: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.tables().insert(&table).await {
            eprintln!("Failed to insert table {}: {}", number, e);
            continue;
        }
        tables += 1;
    }
    println!("✓ Created {} tables", tables);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
