use std::{env, fs, path::Path};

use salesdash::{telemetry::init_tracing, Dashboard, DashboardConfig, FilterSet};

fn bootstrap_duckdb(path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(path)?;
    conn.execute_batch(
        "
        CREATE TABLE orders (
            order_id INTEGER,
            order_date DATE,
            customer_name VARCHAR,
            store_name VARCHAR,
            product_name VARCHAR,
            category_name VARCHAR,
            total_price DECIMAL(10, 2),
            discount DECIMAL(4, 2)
        );
        INSERT INTO orders VALUES
            (1, '2016-01-01', 'Johnathan Velazquez', 'Santa Cruz Bikes', 'Trek 820 - 2016', 'Mountain Bikes', 379.99, 0.20),
            (1, '2016-01-01', 'Johnathan Velazquez', 'Santa Cruz Bikes', 'Surly Straggler - 2016', 'Road Bikes', 1549.00, 0.07),
            (2, '2016-01-01', 'Jaqueline Cummings', 'Baldwin Bikes', 'Trek 820 - 2016', 'Mountain Bikes', 379.99, 0.05),
            (3, '2016-01-02', 'Daryl O''Neil', 'Baldwin Bikes', 'Trek Kid''s Dual Sport - 2018', 'Children Bicycles', 599.98, 0.10),
            (4, '2016-01-03', 'Debra Burks', 'Rowlett Bikes', 'Surly Straggler - 2016', 'Road Bikes', 1549.00, 0.00);
        CREATE VIEW order_details AS SELECT * FROM orders;
        ",
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut config = DashboardConfig::load_default();
    if !Path::new(&config.database.path).exists() {
        config.database.path = "demos/demo.duckdb".to_string();
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if db_path.exists() {
            fs::remove_file(db_path)?;
        }
        bootstrap_duckdb(db_path)?;
    }

    let filters: FilterSet = match env::args().nth(1) {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => FilterSet::default(),
    };

    let dashboard = Dashboard::duckdb(&config);
    let view = dashboard.render(&filters).await?;
    println!("{}", view.sql);
    println!(
        "stores: {:?}",
        view.options.store_choices(dashboard.all_stores())
    );

    if let Some(error) = &view.error {
        eprintln!("{error}");
        return Ok(());
    }
    let Some(analytics) = view.analytics else {
        println!("No data for the selected filters.");
        return Ok(());
    };
    println!("rows: {}", analytics.derived.rows.len());
    for row in &analytics.aggregates.product_ranks.rows {
        println!("{}", serde_json::Value::Object(row.clone()));
    }
    for row in &analytics.aggregates.sales_by_store.rows {
        println!("{}", serde_json::Value::Object(row.clone()));
    }
    Ok(())
}
