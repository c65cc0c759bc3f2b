//! Reference data and the optional demo account.

use chrono::{Months, NaiveDate};
use sqlx::{Row, SqlitePool};

use super::Repository;
use crate::errors::AppError;
use crate::models::{CreateItemRequest, CreateVaultRequest, User, DEFAULT_CATEGORIES};

pub const DEMO_EMAIL: &str = "demo@warrantree.com";
pub const DEMO_PASSWORD: &str = "password123";
const DEMO_VAULT: &str = "My Family Vault";

/// Insert the default categories into an empty table.
pub(super) async fn seed_categories(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM categories")
        .fetch_one(pool)
        .await?;
    let existing: i64 = row.get("n");
    if existing > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (name, description, icon, reminder_days) in DEFAULT_CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, description, icon, reminder_days_default) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(*name)
        .bind(*description)
        .bind(*icon)
        .bind(*reminder_days)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());
    Ok(())
}

struct DemoItem {
    title: &'static str,
    category: &'static str,
    brand: &'static str,
    model: &'static str,
    months_ago: u32,
    price: f64,
    warranty_months: i32,
}

const DEMO_ITEMS: &[DemoItem] = &[
    DemoItem {
        title: "MacBook Pro 16\"",
        category: "Electronics",
        brand: "Apple",
        model: "MacBook Pro M2",
        months_ago: 6,
        price: 2499.0,
        warranty_months: 12,
    },
    DemoItem {
        title: "Samsung Refrigerator",
        category: "Appliances",
        brand: "Samsung",
        model: "RF28T5001SR",
        months_ago: 23,
        price: 1299.0,
        warranty_months: 24,
    },
    DemoItem {
        title: "Home Insurance Policy",
        category: "Insurance",
        brand: "State Farm",
        model: "Homeowners Premium",
        months_ago: 3,
        price: 1200.0,
        warranty_months: 12,
    },
    DemoItem {
        title: "iPhone 14 Pro",
        category: "Electronics",
        brand: "Apple",
        model: "iPhone 14 Pro",
        months_ago: 14,
        price: 999.0,
        warranty_months: 12,
    },
    DemoItem {
        title: "Dyson Vacuum",
        category: "Appliances",
        brand: "Dyson",
        model: "V15 Detect",
        months_ago: 11,
        price: 749.0,
        warranty_months: 24,
    },
];

/// Create the demo user with one vault of sample items. Does nothing if the
/// demo user already exists.
pub async fn seed_demo_data(
    repo: &Repository,
    password_hash: &str,
    today: NaiveDate,
) -> Result<Option<User>, AppError> {
    if repo.find_user_by_email(DEMO_EMAIL).await?.is_some() {
        tracing::debug!("Demo user already present, skipping seed");
        return Ok(None);
    }

    let user = repo.create_user("Demo User", DEMO_EMAIL, password_hash).await?;
    let vault = repo
        .create_vault(
            &user,
            &CreateVaultRequest {
                name: DEMO_VAULT.to_string(),
                description: Some("Warranties for the whole household".to_string()),
            },
        )
        .await?;

    for demo in DEMO_ITEMS {
        let category = repo.find_category_by_name(demo.category).await?;
        let purchase_date = today
            .checked_sub_months(Months::new(demo.months_ago))
            .unwrap_or(today);

        repo.create_item(&CreateItemRequest {
            vault_id: vault.vault.id.clone(),
            title: demo.title.to_string(),
            category_id: category.map(|c| c.id),
            brand: Some(demo.brand.to_string()),
            model: Some(demo.model.to_string()),
            serial_number: None,
            purchase_date,
            price: Some(demo.price),
            warranty_months: Some(demo.warranty_months),
            state: None,
            notes: None,
        })
        .await?;
    }

    tracing::info!(
        "Seeded demo user {} with {} items",
        DEMO_EMAIL,
        DEMO_ITEMS.len()
    );
    Ok(Some(user))
}
