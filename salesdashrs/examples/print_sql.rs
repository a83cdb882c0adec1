use std::{env, fs, path::PathBuf};

use salesdash::{
    build_predicates, dialect::DuckDbDialect, query_builder::render_predicates,
    telemetry::init_tracing, DashboardConfig, FilterSet, OrderQueryBuilder,
};

fn usage() {
    eprintln!("Usage: print_sql [filters_json]");
    eprintln!("Example: cargo run --example print_sql -- demos/filters/oneil_january.json");
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() > 1 {
        usage();
        std::process::exit(1);
    }

    let filters: FilterSet = match args.first() {
        Some(path) => serde_json::from_str(&fs::read_to_string(PathBuf::from(path))?)?,
        None => FilterSet::default(),
    };

    let config = DashboardConfig::load_default();
    let builder = OrderQueryBuilder::new(config.database.view.clone());
    let predicates = build_predicates(&filters, &config.filters.all_stores);

    for condition in render_predicates(&predicates, &DuckDbDialect) {
        println!("-- {condition}");
    }
    let bound = builder.assemble(&predicates, &DuckDbDialect);
    println!("{}", bound.sql);
    println!("-- params: {}", serde_json::Value::Array(bound.params));
    println!("{}", builder.assemble_inline(&predicates, &DuckDbDialect));
    Ok(())
}
