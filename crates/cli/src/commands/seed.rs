//! Seed the database with demo catalog, blog, and account data.
//!
//! Inserts a small but representative data set: shared categories, products
//! with dietary flags and vendor offers, two staff accounts, and a handful
//! of blog posts including a featured one. Everything goes through the same
//! services the API uses, so the seeded rows obey the application rules.
//!
//! The command refuses to run against a database that already has products
//! unless `--clear` is passed; accounts are never deleted.

use sqlx::SqlitePool;
use tracing::info;

use verdant_core::{Email, IngredientList, Price, Role};
use verdant_server::db::{self, UserRepository};
use verdant_server::models::{
    NewCategory, NewPost, NewProduct, NewVendor, ProductFeatures, User,
};
use verdant_server::services::{AuthService, CatalogService, ContentService};

/// Seed the database with demo content.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database already
/// holds products (without `--clear`), or any insert fails.
pub async fn run(clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url =
        crate::commands::database_url().ok_or("VERDANT_DATABASE_URL not set")?;

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear {
        clear_content(&pool).await?;
        info!("Cleared existing catalog and blog data");
    } else {
        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await?;
        if products > 0 {
            return Err(
                "database already contains products; run with --clear to replace seeded content"
                    .into(),
            );
        }
    }

    let editor = ensure_account(
        &pool,
        "verdant-editor",
        "editor@verdantmarket.dev",
        "grow-your-own-greens",
        Role::Editor,
    )
    .await?;
    ensure_account(
        &pool,
        "verdant-admin",
        "admin@verdantmarket.dev",
        "rotate-this-password",
        Role::Admin,
    )
    .await?;

    let catalog = CatalogService::new(&pool);
    let content = ContentService::new(&pool);

    // Shared taxonomy
    let pantry = catalog.create_category(named("Pantry")).await?;
    let snacks = catalog.create_category(named("Snacks")).await?;
    let beverages = catalog.create_category(named("Beverages")).await?;
    let wellness = catalog.create_category(named("Wellness")).await?;
    info!("Created 4 categories");

    // Catalog
    let oats = catalog
        .create(NewProduct {
            name: "Organic Rolled Oats".to_string(),
            description: "Stone-rolled whole grain oats from a single harvest.".to_string(),
            price: Price::from_cents(499),
            category_id: Some(pantry.id),
            image: Some("/images/products/rolled-oats.jpg".to_string()),
            features: ProductFeatures {
                organic: true,
                vegan: true,
                nut_free: true,
                soy_free: true,
                ..ProductFeatures::default()
            },
            recommendation: "Soak overnight with oat milk and top with fruit.".to_string(),
            ingredients: IngredientList::new(vec!["rolled oats".to_string()]),
            affiliate_url: None,
        })
        .await?;

    let chocolate = catalog
        .create(NewProduct {
            name: "Dark Chocolate Bar 85%".to_string(),
            description: "Single-origin dark chocolate with a firm snap.".to_string(),
            price: Price::from_cents(299),
            category_id: Some(snacks.id),
            image: Some("/images/products/dark-chocolate.jpg".to_string()),
            features: ProductFeatures {
                organic: true,
                gluten_free: true,
                fair_trade: true,
                ..ProductFeatures::default()
            },
            recommendation: "Pair a square with an evening chamomile tea.".to_string(),
            ingredients: IngredientList::new(vec![
                "cocoa mass".to_string(),
                "cocoa butter".to_string(),
                "raw cane sugar".to_string(),
            ]),
            affiliate_url: None,
        })
        .await?;

    catalog
        .create(NewProduct {
            name: "Almond Butter".to_string(),
            description: "Slow-roasted almonds ground to a smooth spread.".to_string(),
            price: Price::from_cents(1150),
            category_id: Some(pantry.id),
            image: Some("/images/products/almond-butter.jpg".to_string()),
            features: ProductFeatures {
                organic: true,
                vegan: true,
                gluten_free: true,
                ..ProductFeatures::default()
            },
            recommendation: "Stir a spoonful into warm porridge.".to_string(),
            ingredients: IngredientList::new(vec![
                "almonds".to_string(),
                "sea salt".to_string(),
            ]),
            affiliate_url: None,
        })
        .await?;

    catalog
        .create(NewProduct {
            name: "Sea Salt Lentil Chips".to_string(),
            description: "Crunchy baked chips made from red lentil flour.".to_string(),
            price: Price::from_cents(375),
            category_id: Some(snacks.id),
            image: Some("/images/products/lentil-chips.jpg".to_string()),
            features: ProductFeatures {
                vegan: true,
                gluten_free: true,
                nut_free: true,
                ..ProductFeatures::default()
            },
            recommendation: "Serve with a white bean dip.".to_string(),
            ingredients: IngredientList::new(vec![
                "red lentil flour".to_string(),
                "sunflower oil".to_string(),
                "sea salt".to_string(),
            ]),
            affiliate_url: None,
        })
        .await?;

    catalog
        .create(NewProduct {
            name: "Cold-Pressed Green Juice".to_string(),
            description: "Kale, cucumber, apple and lemon, pressed daily.".to_string(),
            price: Price::from_cents(625),
            category_id: Some(beverages.id),
            image: Some("/images/products/green-juice.jpg".to_string()),
            features: ProductFeatures {
                organic: true,
                vegan: true,
                gluten_free: true,
                ..ProductFeatures::default()
            },
            recommendation: "Drink chilled within three days of pressing.".to_string(),
            ingredients: IngredientList::new(vec![
                "kale".to_string(),
                "cucumber".to_string(),
                "apple".to_string(),
                "lemon".to_string(),
            ]),
            affiliate_url: None,
        })
        .await?;

    catalog
        .create(NewProduct {
            name: "Chamomile Tea".to_string(),
            description: "Loose whole chamomile flowers for a calm evening cup.".to_string(),
            price: Price::from_cents(540),
            category_id: Some(wellness.id),
            image: Some("/images/products/chamomile-tea.jpg".to_string()),
            features: ProductFeatures {
                organic: true,
                vegan: true,
                sugar_free: true,
                ..ProductFeatures::default()
            },
            recommendation: "Steep for five minutes, no longer.".to_string(),
            ingredients: IngredientList::new(vec!["chamomile flowers".to_string()]),
            affiliate_url: None,
        })
        .await?;
    info!("Created 6 products");

    // Vendor offers, cheapest first for the oats
    catalog
        .add_vendor(NewVendor {
            product_id: oats.id,
            name: "Hilltop Grocers".to_string(),
            url: "https://hilltop.example/organic-rolled-oats".to_string(),
            price: Price::from_cents(479),
        })
        .await?;
    catalog
        .add_vendor(NewVendor {
            product_id: oats.id,
            name: "Granary Direct".to_string(),
            url: "https://granary.example/oats-1kg".to_string(),
            price: Price::from_cents(510),
        })
        .await?;
    catalog
        .add_vendor(NewVendor {
            product_id: chocolate.id,
            name: "Cacao Collective".to_string(),
            url: "https://cacao.example/85-percent-bar".to_string(),
            price: Price::from_cents(289),
        })
        .await?;
    info!("Created 3 vendor offers");

    // Blog content
    let labels = content
        .create(
            editor.id,
            NewPost {
                title: "A Beginner's Guide to Reading Ingredient Labels".to_string(),
                slug: None,
                content: "The shortest ingredient list usually wins. Start at the top: \
                          ingredients are ordered by weight, so the first three tell you \
                          most of what you need to know."
                    .to_string(),
                excerpt: "What the order of an ingredient list actually tells you."
                    .to_string(),
                featured_image: Some("/images/blog/labels.jpg".to_string()),
                published: true,
                category_ids: vec![pantry.id, wellness.id],
            },
        )
        .await?;
    content.set_featured(labels.id).await?;

    content
        .create(
            editor.id,
            NewPost {
                title: "Five Pantry Staples Worth Buying Organic".to_string(),
                slug: None,
                content: "Not everything needs the organic label, but oats, nut butters \
                          and olive oil reward the upgrade."
                    .to_string(),
                excerpt: "Where the organic label makes a real difference.".to_string(),
                featured_image: None,
                published: true,
                category_ids: vec![pantry.id],
            },
        )
        .await?;

    content
        .create(
            editor.id,
            NewPost {
                title: "Seasonal Produce Planner".to_string(),
                slug: None,
                content: "Draft: month-by-month guide to what's worth buying fresh."
                    .to_string(),
                excerpt: "A work-in-progress guide to seasonal shopping.".to_string(),
                featured_image: None,
                published: false,
                category_ids: vec![wellness.id],
            },
        )
        .await?;
    info!("Created 3 blog posts (1 featured, 1 draft)");

    info!("Seeding complete!");
    Ok(())
}

/// Shorthand for a category payload with a derived slug.
fn named(name: &str) -> NewCategory {
    NewCategory {
        name: name.to_string(),
        slug: None,
    }
}

/// Fetch an account by email or create it with the given role.
async fn ensure_account(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, Box<dyn std::error::Error>> {
    let users = UserRepository::new(pool);
    let parsed = Email::parse(email)?;

    if let Some(existing) = users.get_by_email(&parsed).await? {
        info!("Account {} already exists, keeping it", email);
        return Ok(existing);
    }

    let user = AuthService::new(pool).register(username, email, password).await?;
    if role != Role::User {
        users.set_role(user.id, role).await?;
    }

    info!("Created {} account {} (password: {})", role, email, password);
    Ok(user)
}

/// Delete seeded catalog and blog rows, children first. Accounts stay.
async fn clear_content(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM blog_post_categories")
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM blog_posts").execute(pool).await?;
    sqlx::query("DELETE FROM vendors").execute(pool).await?;
    sqlx::query("DELETE FROM products").execute(pool).await?;
    sqlx::query("DELETE FROM categories").execute(pool).await?;
    Ok(())
}
